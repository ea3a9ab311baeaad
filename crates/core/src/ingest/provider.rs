use crate::config::Settings;
use crate::domain::bar::{Bar, Quote};
use crate::ingest::types::{ChartResponse, ChartResult};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate};
use reqwest::StatusCode;
use std::collections::BTreeMap;
use std::time::Duration;

const QUOTE_RANGE: &str = "5d";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; stock-advisor/0.1)";

/// Source of daily bars and last/previous close for a symbol.
#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Date-ordered daily bars. An empty vector means the provider knows the
    /// symbol but has no history for it.
    async fn fetch_daily_bars(&self, symbol: &str) -> Result<Vec<Bar>>;

    /// Lightweight quote lookup; `Ok(None)` when no price is available.
    async fn fetch_quote(&self, symbol: &str) -> Result<Option<Quote>>;
}

#[derive(Debug, Clone)]
pub struct YahooChartProvider {
    http: reqwest::Client,
    base_url: String,
    history_range: String,
    retries: u32,
}

impl YahooChartProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.provider_timeout())
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build market data http client")?;

        Ok(Self {
            http,
            base_url: settings.market_data_base_url.clone(),
            history_range: settings.market_data_history_range.clone(),
            retries: settings.market_data_retries.max(1),
        })
    }

    fn url(&self, symbol: &str) -> String {
        format!(
            "{}/v8/finance/chart/{}",
            self.base_url.trim_end_matches('/'),
            symbol
        )
    }

    async fn fetch_once(&self, symbol: &str, range: &str) -> Result<FetchOutcome> {
        let res = self
            .http
            .get(self.url(symbol))
            .query(&[
                ("range", range),
                ("interval", "1d"),
                ("includePrePost", "false"),
            ])
            .send()
            .await
            .context("market data request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read market data response")?;

        if !status.is_success() {
            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            return Ok(FetchOutcome::HttpError {
                status,
                retryable,
                body: text,
            });
        }

        let parsed = serde_json::from_str::<ChartResponse>(&text)
            .context("failed to parse chart response")?;
        Ok(FetchOutcome::Chart(parsed))
    }

    async fn fetch_chart(&self, symbol: &str, range: &str) -> Result<ChartResult> {
        let mut attempt: u32 = 0;
        let resp = loop {
            attempt += 1;
            let err = match self.fetch_once(symbol, range).await {
                Ok(FetchOutcome::Chart(resp)) => break resp,
                Ok(FetchOutcome::HttpError {
                    status,
                    retryable,
                    body,
                }) => {
                    let err = anyhow::anyhow!("market data HTTP {status}: {body}");
                    if !retryable {
                        return Err(err);
                    }
                    err
                }
                Err(err) => err,
            };

            if attempt >= self.retries {
                return Err(err);
            }
            let backoff = Duration::from_secs(1 << (attempt - 1));
            tracing::warn!(attempt, ?backoff, %symbol, error = %err, "market data fetch failed; retrying");
            tokio::time::sleep(backoff).await;
        };

        first_result(resp)
    }
}

enum FetchOutcome {
    Chart(ChartResponse),
    HttpError {
        status: StatusCode,
        retryable: bool,
        body: String,
    },
}

#[async_trait::async_trait]
impl MarketDataProvider for YahooChartProvider {
    fn provider_name(&self) -> &'static str {
        "yahoo_chart"
    }

    async fn fetch_daily_bars(&self, symbol: &str) -> Result<Vec<Bar>> {
        let result = self.fetch_chart(symbol, &self.history_range).await?;
        Ok(bars_from_chart(&result))
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Option<Quote>> {
        let result = self.fetch_chart(symbol, QUOTE_RANGE).await?;
        Ok(quote_from_chart(&result))
    }
}

fn first_result(resp: ChartResponse) -> Result<ChartResult> {
    if let Some(err) = resp.chart.error {
        anyhow::bail!("chart error {}: {}", err.code, err.description);
    }
    resp.chart
        .result
        .and_then(|r| r.into_iter().next())
        .context("chart response has no result")
}

/// Rows without a positive close are dropped; missing open/high/low fall back
/// to the close and missing volume to zero. One bar per exchange-local date,
/// last row wins.
pub fn bars_from_chart(result: &ChartResult) -> Vec<Bar> {
    let Some(timestamps) = result.timestamp.as_ref() else {
        return Vec::new();
    };
    let Some(q) = result.indicators.quote.first() else {
        return Vec::new();
    };
    let offset = result.meta.gmtoffset.unwrap_or(0);
    let at = |v: &Vec<Option<f64>>, i: usize| v.get(i).copied().flatten();

    let mut by_date = BTreeMap::<NaiveDate, Bar>::new();
    for (i, &ts) in timestamps.iter().enumerate() {
        let Some(close) = at(&q.close, i).filter(|c| c.is_finite() && *c > 0.0) else {
            continue;
        };
        let Some(dt) = DateTime::from_timestamp(ts + offset, 0) else {
            continue;
        };
        let date = dt.date_naive();
        by_date.insert(
            date,
            Bar {
                date,
                open: at(&q.open, i).unwrap_or(close),
                high: at(&q.high, i).unwrap_or(close),
                low: at(&q.low, i).unwrap_or(close),
                close,
                volume: at(&q.volume, i).unwrap_or(0.0),
            },
        );
    }
    by_date.into_values().collect()
}

/// Last price from `regularMarketPrice`, else the last row close. The previous
/// close is `previousClose`, else the second-to-last row close.
///
/// `chartPreviousClose` is ignored: on a multi-day range it is the close before
/// the whole window, not the day before the last price.
pub fn quote_from_chart(result: &ChartResult) -> Option<Quote> {
    let meta = &result.meta;
    let rows = Quote::from_bars(&bars_from_chart(result));
    let prev = meta
        .previous_close
        .filter(|p| p.is_finite() && *p > 0.0)
        .or_else(|| rows.and_then(|q| q.prev));
    match meta.regular_market_price.filter(|p| p.is_finite() && *p > 0.0) {
        Some(last) => Some(Quote { last, prev }),
        None => rows.map(|q| Quote { prev, ..q }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chart(v: serde_json::Value) -> ChartResult {
        let resp: ChartResponse = serde_json::from_value(v).unwrap();
        first_result(resp).unwrap()
    }

    #[test]
    fn parses_bars_skipping_null_closes_and_deduplicating_dates() {
        let result = chart(json!({
            "chart": {
                "result": [{
                    "meta": {"symbol": "TCS.NS", "gmtoffset": 19800},
                    "timestamp": [1767585600, 1767672000, 1767675000, 1767758400],
                    "indicators": {"quote": [{
                        "open":   [10.0, 11.0, 11.1, null],
                        "high":   [10.5, 11.5, 11.6, 12.5],
                        "low":    [9.5, 10.5, 10.6, 11.5],
                        "close":  [10.2, 11.2, 11.3, null],
                        "volume": [100.0, 200.0, 300.0, 400.0]
                    }]}
                }],
                "error": null
            }
        }));

        let bars = bars_from_chart(&result);
        assert_eq!(bars.len(), 2);
        assert!(bars[0].date < bars[1].date);
        assert_eq!(bars[1].close, 11.3);
        assert_eq!(bars[1].volume, 300.0);
    }

    #[test]
    fn quote_prefers_meta_prices() {
        let result = chart(json!({
            "chart": {"result": [{
                "meta": {"regularMarketPrice": 101.5, "previousClose": 100.0},
                "timestamp": [],
                "indicators": {"quote": [{}]}
            }]}
        }));
        assert_eq!(
            quote_from_chart(&result),
            Some(Quote {
                last: 101.5,
                prev: Some(100.0)
            })
        );
    }

    #[test]
    fn quote_previous_close_is_the_day_before_not_the_window_start() {
        let result = chart(json!({
            "chart": {"result": [{
                "meta": {"regularMarketPrice": 110.0, "chartPreviousClose": 80.0, "gmtoffset": 19800},
                "timestamp": [1767585600, 1767672000, 1767758400, 1767844800, 1767931200],
                "indicators": {"quote": [{"close": [100.0, 102.0, 104.0, 106.0, 110.0]}]}
            }]}
        }));
        assert_eq!(
            quote_from_chart(&result),
            Some(Quote {
                last: 110.0,
                prev: Some(106.0)
            })
        );
    }

    #[test]
    fn quote_falls_back_to_rows() {
        let result = chart(json!({
            "chart": {"result": [{
                "meta": {},
                "timestamp": [1767585600, 1767672000],
                "indicators": {"quote": [{"close": [50.0, 55.0]}]}
            }]}
        }));
        let q = quote_from_chart(&result).unwrap();
        assert_eq!(q.last, 55.0);
        assert_eq!(q.prev, Some(50.0));
    }

    #[test]
    fn chart_error_is_surfaced() {
        let resp: ChartResponse = serde_json::from_value(json!({
            "chart": {"result": null, "error": {"code": "Not Found", "description": "No data found"}}
        }))
        .unwrap();
        let err = first_result(resp).unwrap_err();
        assert!(err.to_string().contains("Not Found"));
    }
}
