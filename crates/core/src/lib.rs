pub mod analysis;
pub mod domain;
pub mod ingest;
pub mod ranking;
pub mod time;

pub const DISCLAIMER: &str = "This output is informational only; not financial advice.";

pub mod config {
    use std::time::Duration;

    const DEFAULT_ALL_SYMBOLS_CSV_PATH: &str = "data/all_symbols.csv";
    const DEFAULT_MARKET_DATA_BASE_URL: &str = "https://query1.finance.yahoo.com";
    const DEFAULT_HISTORY_RANGE: &str = "1y";
    const DEFAULT_TIMEOUT_SECS: u64 = 10;
    const DEFAULT_RETRIES: u32 = 2;
    const DEFAULT_MIN_BARS: usize = 60;
    const DEFAULT_CONCURRENCY: usize = 8;
    const DEFAULT_TTL_ALL_SECS: u64 = 900;
    const DEFAULT_TTL_CAP_SECS: u64 = 300;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub all_symbols_csv_url: Option<String>,
        pub all_symbols_csv_path: String,
        pub market_data_base_url: String,
        pub market_data_timeout_secs: u64,
        pub market_data_retries: u32,
        pub market_data_history_range: String,
        pub min_bars: usize,
        pub concurrency: usize,
        pub cache_ttl_all_secs: u64,
        pub cache_ttl_cap_secs: u64,
        pub sentry_dsn: Option<String>,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                all_symbols_csv_url: None,
                all_symbols_csv_path: DEFAULT_ALL_SYMBOLS_CSV_PATH.to_string(),
                market_data_base_url: DEFAULT_MARKET_DATA_BASE_URL.to_string(),
                market_data_timeout_secs: DEFAULT_TIMEOUT_SECS,
                market_data_retries: DEFAULT_RETRIES,
                market_data_history_range: DEFAULT_HISTORY_RANGE.to_string(),
                min_bars: DEFAULT_MIN_BARS,
                concurrency: DEFAULT_CONCURRENCY,
                cache_ttl_all_secs: DEFAULT_TTL_ALL_SECS,
                cache_ttl_cap_secs: DEFAULT_TTL_CAP_SECS,
                sentry_dsn: None,
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let d = Self::default();
            Ok(Self {
                all_symbols_csv_url: non_empty_var("ALL_SYMBOLS_CSV_URL"),
                all_symbols_csv_path: non_empty_var("ALL_SYMBOLS_CSV_PATH")
                    .unwrap_or(d.all_symbols_csv_path),
                market_data_base_url: non_empty_var("MARKET_DATA_BASE_URL")
                    .unwrap_or(d.market_data_base_url),
                market_data_timeout_secs: parsed_var("MARKET_DATA_TIMEOUT_SECS")
                    .unwrap_or(d.market_data_timeout_secs),
                market_data_retries: parsed_var("MARKET_DATA_RETRIES")
                    .unwrap_or(d.market_data_retries),
                market_data_history_range: non_empty_var("MARKET_DATA_HISTORY_RANGE")
                    .unwrap_or(d.market_data_history_range),
                min_bars: parsed_var("RANK_MIN_BARS").unwrap_or(d.min_bars),
                concurrency: parsed_var("RANK_CONCURRENCY").unwrap_or(d.concurrency),
                cache_ttl_all_secs: parsed_var("CACHE_TTL_ALL_SECS")
                    .unwrap_or(d.cache_ttl_all_secs),
                cache_ttl_cap_secs: parsed_var("CACHE_TTL_CAP_SECS")
                    .unwrap_or(d.cache_ttl_cap_secs),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }

        /// Per-request timeout handed to the HTTP client.
        pub fn provider_timeout(&self) -> Duration {
            Duration::from_secs(self.market_data_timeout_secs.max(1))
        }

        /// Upper bound for one provider call including every retry and the
        /// backoff sleeps between them (1s, 2s, 4s, ...).
        pub fn provider_budget(&self) -> Duration {
            let attempts = self.market_data_retries.max(1);
            let backoff_secs: u64 = (1..attempts).map(|a| 1u64 << (a - 1).min(30)).sum();
            self.provider_timeout() * attempts + Duration::from_secs(backoff_secs)
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn parsed_var<T: std::str::FromStr>(key: &str) -> Option<T> {
        non_empty_var(key).and_then(|s| s.parse::<T>().ok())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn provider_budget_covers_retries_and_backoff() {
            let s = Settings::default();
            assert_eq!(s.provider_timeout(), Duration::from_secs(10));
            assert_eq!(s.provider_budget(), Duration::from_secs(10 * 2 + 1));

            let s = Settings {
                market_data_timeout_secs: 5,
                market_data_retries: 3,
                ..Settings::default()
            };
            assert_eq!(s.provider_budget(), Duration::from_secs(5 * 3 + 1 + 2));

            let s = Settings {
                market_data_retries: 0,
                ..Settings::default()
            };
            assert_eq!(s.provider_budget(), s.provider_timeout());
        }
    }
}
