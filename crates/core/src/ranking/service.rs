use crate::analysis::indicators::IndicatorEngine;
use crate::analysis::{assess_bars, assess_quote, Assessment};
use crate::config::Settings;
use crate::domain::bar::{validate_series, Bar, Quote};
use crate::domain::error::RankError;
use crate::domain::market::{normalize_ticker, CapBucket, Exchange};
use crate::domain::recommendation::{Recommendation, ScoringBasis};
use crate::ingest::provider::{MarketDataProvider, YahooChartProvider};
use crate::ingest::universe::{cap_of, UniverseResolver};
use crate::ranking::cache::{RankingCache, TtlPolicy};
use crate::ranking::page::{PageRequest, MAX_RANKED};
use crate::time::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Outcome of scoring one symbol in a ranking pass.
pub type SymbolOutcome = Result<Recommendation, RankError>;

const MAX_LOGGED_FAILURES: usize = 5;

#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub min_bars: usize,
    pub concurrency: usize,
    pub provider_timeout: Duration,
    pub ttl: TtlPolicy,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl ServiceOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            min_bars: settings.min_bars,
            concurrency: settings.concurrency.max(1),
            provider_timeout: settings.provider_budget(),
            ttl: TtlPolicy {
                all: Duration::from_secs(settings.cache_ttl_all_secs),
                cap: Duration::from_secs(settings.cache_ttl_cap_secs),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct RankedList {
    pub produced_at: DateTime<Utc>,
    pub items: Arc<Vec<Recommendation>>,
    pub from_cache: bool,
}

#[derive(Debug, Clone)]
pub struct TopPage {
    pub produced_at: DateTime<Utc>,
    pub items: Vec<Recommendation>,
    pub page: usize,
    pub page_size: usize,
    pub cap: CapBucket,
    pub total_available: usize,
}

#[derive(Debug, Clone)]
pub struct OneResult {
    pub ticker: String,
    pub recommendation: Option<Recommendation>,
    pub note: Option<String>,
}

pub struct RecommendationService {
    provider: Arc<dyn MarketDataProvider>,
    universe: Arc<UniverseResolver>,
    cache: RankingCache,
    clock: Arc<dyn Clock>,
    engine: IndicatorEngine,
    concurrency: usize,
    provider_timeout: Duration,
}

impl RecommendationService {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        universe: Arc<UniverseResolver>,
        clock: Arc<dyn Clock>,
        opts: ServiceOptions,
    ) -> Self {
        Self {
            provider,
            universe,
            cache: RankingCache::new(clock.clone(), opts.ttl),
            clock,
            engine: IndicatorEngine::new(opts.min_bars),
            concurrency: opts.concurrency.max(1),
            provider_timeout: opts.provider_timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let provider = YahooChartProvider::from_settings(settings)?;
        let universe = UniverseResolver::from_settings(settings)?;
        Ok(Self::new(
            Arc::new(provider),
            Arc::new(universe),
            Arc::new(SystemClock),
            ServiceOptions::from_settings(settings),
        ))
    }

    pub fn universe(&self) -> &UniverseResolver {
        &self.universe
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Top of the ranking for `cap`: cached if fresh, otherwise recomputed,
    /// sorted by composite score (stable) and truncated.
    pub async fn rank(&self, cap: CapBucket) -> RankedList {
        let (entry, hit) = self
            .cache
            .get_or_compute(cap.as_str(), || self.compute(cap))
            .await;
        if hit {
            tracing::debug!(%cap, produced_at = %entry.produced_at, "ranking cache hit");
        }
        RankedList {
            produced_at: entry.produced_at,
            items: entry.items,
            from_cache: hit,
        }
    }

    pub async fn top(&self, cap: CapBucket, page: PageRequest) -> TopPage {
        let ranked = self.rank(cap).await;
        TopPage {
            produced_at: ranked.produced_at,
            items: page.slice(&ranked.items).to_vec(),
            page: page.page,
            page_size: page.page_size,
            cap,
            total_available: ranked.items.len(),
        }
    }

    /// Scores a single ticker without touching the cache.
    pub async fn rank_one(&self, ticker: &str, exchange: Exchange) -> OneResult {
        let symbol = normalize_ticker(ticker, exchange);
        if symbol.is_empty() {
            return OneResult {
                ticker: symbol,
                recommendation: None,
                note: Some("ticker is required".to_string()),
            };
        }

        let label = cap_of(&symbol).unwrap_or(CapBucket::All);
        match self.evaluate(&symbol, label).await {
            Ok(rec) => {
                let note = (rec.basis == ScoringBasis::QuoteOnly).then(|| {
                    "Limited price history; showing a quote-only snapshot.".to_string()
                });
                OneResult {
                    ticker: symbol,
                    recommendation: Some(rec),
                    note,
                }
            }
            Err(err) => {
                tracing::info!(%symbol, reason = err.code(), error = %err, "no recommendation for ticker");
                OneResult {
                    note: Some(format!("No usable market data for {symbol} ({err}).")),
                    ticker: symbol,
                    recommendation: None,
                }
            }
        }
    }

    fn compute(&self, cap: CapBucket) -> impl Future<Output = Vec<Recommendation>> + '_ {
        let span = tracing::info_span!("rank_pass", run_id = %uuid::Uuid::new_v4(), %cap);
        async move {
            let started = Instant::now();
            let symbols = self.universe.resolve(cap).await;

            let pending: Vec<_> = symbols
                .iter()
                .map(|symbol| async move {
                    let label = match cap {
                        CapBucket::All => cap_of(symbol).unwrap_or(CapBucket::All),
                        bucket => bucket,
                    };
                    (symbol, self.evaluate(symbol, label).await)
                })
                .collect();
            let outcomes: Vec<(&String, SymbolOutcome)> = futures_util::stream::iter(pending)
                .buffered(self.concurrency)
                .collect()
                .await;

            let mut items = Vec::with_capacity(outcomes.len());
            let mut failures = BTreeMap::<&'static str, usize>::new();
            let mut degraded = 0usize;
            for (symbol, outcome) in outcomes {
                match outcome {
                    Ok(rec) => {
                        if rec.basis == ScoringBasis::QuoteOnly {
                            degraded += 1;
                        }
                        items.push(rec);
                    }
                    Err(err) => {
                        let total: usize = failures.values().sum();
                        *failures.entry(err.code()).or_default() += 1;
                        if total < MAX_LOGGED_FAILURES {
                            tracing::warn!(%symbol, reason = err.code(), error = %err, "symbol excluded from ranking");
                        } else {
                            tracing::debug!(%symbol, reason = err.code(), error = %err, "symbol excluded from ranking");
                        }
                    }
                }
            }

            // sort_by is stable: equal scores keep fetch order.
            items.sort_by(|a, b| {
                b.composite_score
                    .partial_cmp(&a.composite_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let ranked = items.len();
            items.truncate(MAX_RANKED);

            tracing::info!(
                symbols = symbols.len(),
                ranked,
                degraded,
                failed = failures.values().sum::<usize>(),
                ?failures,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "ranking pass complete"
            );
            items
        }
        .instrument(span)
    }

    /// Full indicator path first; on any failure there, the quote-only path.
    /// A symbol with neither is reported with the full-path failure.
    async fn evaluate(&self, symbol: &str, cap: CapBucket) -> SymbolOutcome {
        let (full_err, bars) = match self.timed(self.provider.fetch_daily_bars(symbol)).await {
            Ok(bars) => match assess_bars(&self.engine, &bars) {
                Ok(assessment) => return Ok(self.label(symbol, cap, assessment)),
                Err(err) => (err, bars),
            },
            Err(err) => (err, Vec::new()),
        };

        tracing::debug!(%symbol, reason = full_err.code(), "full path unavailable; trying quote");

        let quote = match self.timed(self.provider.fetch_quote(symbol)).await {
            Ok(Some(q)) => Some(q),
            Ok(None) => None,
            Err(err) => {
                tracing::debug!(%symbol, error = %err, "quote lookup failed");
                None
            }
        };

        match quote.or_else(|| series_quote(&bars)) {
            Some(q) => match assess_quote(&q) {
                Ok(assessment) => Ok(self.label(symbol, cap, assessment)),
                Err(_) => Err(full_err),
            },
            None => Err(full_err),
        }
    }

    async fn timed<T, F>(&self, fut: F) -> Result<T, RankError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.provider_timeout, fut).await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(err)) => Err(RankError::ProviderUnavailable(format!("{err:#}"))),
            Err(_) => Err(RankError::Timeout(self.provider_timeout)),
        }
    }

    fn label(&self, symbol: &str, cap: CapBucket, a: Assessment) -> Recommendation {
        let mut evidence = a.evidence;
        evidence.push(format!("source:{}", self.provider.provider_name()));
        Recommendation {
            ticker: symbol.to_string(),
            cap: cap.as_str().to_string(),
            composite_score: a.composite,
            classification: a.classification,
            holding_duration: a.classification.holding_duration(),
            confidence: a.confidence,
            rationale: a.rationale.to_string(),
            stop_loss: a.stop_loss,
            target_band: a.target_band,
            evidence,
            basis: a.basis,
            timestamp: self.clock.now(),
        }
    }
}

/// Quote derived from already-fetched bars, if they are well formed.
fn series_quote(bars: &[Bar]) -> Option<Quote> {
    validate_series(bars).ok()?;
    Quote::from_bars(bars)
}
