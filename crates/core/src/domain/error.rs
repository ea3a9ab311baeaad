use std::time::Duration;
use thiserror::Error;

/// Why a symbol produced no recommendation (or fell back to the quote-only path).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RankError {
    #[error("no data available from provider: {0}")]
    ProviderUnavailable(String),

    #[error("insufficient history: have {have} bars, need {need}")]
    InsufficientHistory { have: usize, need: usize },

    #[error("malformed data: {0}")]
    MalformedData(String),

    #[error("provider call timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("universe load failed: {0}")]
    UniverseLoadFailure(String),
}

impl RankError {
    /// Short stable code used in logs and failure counters.
    pub fn code(&self) -> &'static str {
        match self {
            RankError::ProviderUnavailable(_) => "provider_unavailable",
            RankError::InsufficientHistory { .. } => "insufficient_history",
            RankError::MalformedData(_) => "malformed_data",
            RankError::Timeout(_) => "timeout",
            RankError::UniverseLoadFailure(_) => "universe_load_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_second_timeout_keeps_its_duration() {
        let err = RankError::Timeout(Duration::from_millis(200));
        assert_eq!(err.to_string(), "provider call timed out after 200ms");
        assert_eq!(err.code(), "timeout");
    }
}
