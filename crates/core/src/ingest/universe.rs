use crate::config::Settings;
use crate::domain::error::RankError;
use crate::domain::market::{normalize_ticker, CapBucket, Exchange};
use anyhow::Context;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

pub const LARGE_CAP: &[&str] = &[
    "RELIANCE.NS",
    "TCS.NS",
    "HDFCBANK.NS",
    "INFY.NS",
    "ICICIBANK.NS",
    "HINDUNILVR.NS",
    "ITC.NS",
    "SBIN.NS",
    "BHARTIARTL.NS",
    "LT.NS",
    "KOTAKBANK.NS",
    "AXISBANK.NS",
];

pub const MID_CAP: &[&str] = &[
    "PERSISTENT.NS",
    "TRENT.NS",
    "INDHOTEL.NS",
    "VOLTAS.NS",
    "MPHASIS.NS",
    "AUBANK.NS",
    "COFORGE.NS",
    "PAGEIND.NS",
    "GODREJPROP.NS",
    "ASTRAL.NS",
];

pub const SMALL_CAP: &[&str] = &[
    "SONATSOFTW.NS",
    "RADICO.NS",
    "KEI.NS",
    "CAMS.NS",
    "ROUTE.NS",
    "HAPPSTMNDS.NS",
    "NAZARA.NS",
    "TANLA.NS",
    "FINEORG.NS",
    "CERA.NS",
];

/// Resolves a cap bucket to its symbol list.
///
/// The "all" list is loaded at most once per process (remote CSV, then local
/// CSV, then the union of the static buckets) until `invalidate_all` is called.
#[derive(Debug)]
pub struct UniverseResolver {
    http: reqwest::Client,
    csv_url: Option<String>,
    csv_path: Option<PathBuf>,
    all: tokio::sync::Mutex<Option<Arc<Vec<String>>>>,
}

impl UniverseResolver {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.provider_timeout())
            .build()
            .context("failed to build universe http client")?;

        Ok(Self {
            http,
            csv_url: settings.all_symbols_csv_url.clone(),
            csv_path: Some(PathBuf::from(&settings.all_symbols_csv_path)),
            all: tokio::sync::Mutex::new(None),
        })
    }

    /// Resolver backed only by the hardcoded buckets.
    pub fn static_only() -> Self {
        Self {
            http: reqwest::Client::new(),
            csv_url: None,
            csv_path: None,
            all: tokio::sync::Mutex::new(None),
        }
    }

    pub fn with_csv_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.csv_path = Some(path.into());
        self
    }

    pub async fn resolve(&self, cap: CapBucket) -> Arc<Vec<String>> {
        match cap {
            CapBucket::Small => Arc::new(owned(SMALL_CAP)),
            CapBucket::Mid => Arc::new(owned(MID_CAP)),
            CapBucket::Large => Arc::new(owned(LARGE_CAP)),
            CapBucket::All => self.resolve_all().await,
        }
    }

    pub async fn invalidate_all(&self) {
        *self.all.lock().await = None;
    }

    async fn resolve_all(&self) -> Arc<Vec<String>> {
        let mut guard = self.all.lock().await;
        if let Some(cached) = guard.as_ref() {
            return cached.clone();
        }
        let symbols = Arc::new(self.load_all().await);
        *guard = Some(symbols.clone());
        symbols
    }

    async fn load_all(&self) -> Vec<String> {
        let mut failures = Vec::new();

        if let Some(url) = self.csv_url.as_deref() {
            match self.load_from_url(url).await {
                Ok(symbols) => {
                    tracing::info!(source = "url", count = symbols.len(), "loaded all-universe symbols");
                    return symbols;
                }
                Err(err) => {
                    tracing::warn!(%url, error = %err, "all-universe url load failed; trying local csv");
                    failures.push(err);
                }
            }
        }

        if let Some(path) = self.csv_path.as_ref() {
            match load_from_file(path).await {
                Ok(symbols) => {
                    tracing::info!(source = "file", path = %path.display(), count = symbols.len(), "loaded all-universe symbols");
                    return symbols;
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "all-universe csv load failed");
                    failures.push(err);
                }
            }
        }

        let symbols = static_union();
        if let Some(err) = exhaustion_error(&failures) {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(count = symbols.len(), error = %err, "all-universe sources exhausted; using static buckets");
        }
        symbols
    }

    async fn load_from_url(&self, url: &str) -> Result<Vec<String>, RankError> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| RankError::UniverseLoadFailure(format!("request failed: {e}")))?;
        let status = res.status();
        if !status.is_success() {
            return Err(RankError::UniverseLoadFailure(format!("HTTP {status}")));
        }
        let text = res
            .text()
            .await
            .map_err(|e| RankError::UniverseLoadFailure(format!("read body failed: {e}")))?;
        non_empty(parse_symbol_csv(&text))
    }
}

/// First static bucket containing `symbol`.
pub fn cap_of(symbol: &str) -> Option<CapBucket> {
    [
        (CapBucket::Large, LARGE_CAP),
        (CapBucket::Mid, MID_CAP),
        (CapBucket::Small, SMALL_CAP),
    ]
    .into_iter()
    .find(|(_, list)| list.contains(&symbol))
    .map(|(cap, _)| cap)
}

/// First column of each row; optional `SYMBOL` header; de-duplicated in
/// first-seen order.
pub fn parse_symbol_csv(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let first = line.split(',').next().unwrap_or("");
        let cell = first.trim_start_matches('\u{feff}').trim().trim_matches('"').trim();
        if cell.is_empty() {
            continue;
        }
        if idx == 0 && cell.eq_ignore_ascii_case("SYMBOL") {
            continue;
        }
        let symbol = normalize_ticker(cell, Exchange::Nse);
        if seen.insert(symbol.clone()) {
            out.push(symbol);
        }
    }

    out
}

async fn load_from_file(path: &std::path::Path) -> Result<Vec<String>, RankError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RankError::UniverseLoadFailure(format!("read failed: {e}")))?;
    non_empty(parse_symbol_csv(&text))
}

/// Error summarising every failed "all" source; `None` when none was tried.
fn exhaustion_error(failures: &[RankError]) -> Option<anyhow::Error> {
    if failures.is_empty() {
        return None;
    }
    let reasons: Vec<String> = failures.iter().map(|e| e.to_string()).collect();
    Some(anyhow::anyhow!(
        "all-universe sources exhausted: {}",
        reasons.join("; ")
    ))
}

fn non_empty(symbols: Vec<String>) -> Result<Vec<String>, RankError> {
    if symbols.is_empty() {
        return Err(RankError::UniverseLoadFailure(
            "csv contained no symbols".to_string(),
        ));
    }
    Ok(symbols)
}

fn static_union() -> Vec<String> {
    let mut seen = HashSet::new();
    LARGE_CAP
        .iter()
        .chain(MID_CAP)
        .chain(SMALL_CAP)
        .filter(|s| seen.insert(**s))
        .map(|s| s.to_string())
        .collect()
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
