use crate::domain::error::RankError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One trading day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Last and previous close from the provider's lightweight quote lookup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub last: f64,
    pub prev: Option<f64>,
}

impl Quote {
    /// Derives a quote from the tail of a series; `None` if there is no usable close.
    pub fn from_bars(bars: &[Bar]) -> Option<Self> {
        let last = bars.last()?.close;
        if !last.is_finite() || last <= 0.0 {
            return None;
        }
        let prev = bars
            .len()
            .checked_sub(2)
            .map(|i| bars[i].close)
            .filter(|p| p.is_finite());
        Some(Self { last, prev })
    }
}

/// Checks the series invariants: finite non-negative fields, `high >= low`,
/// strictly increasing dates and a positive final close.
///
/// Close outside `[low, high]` is accepted; adjusted closes routinely do that.
pub fn validate_series(bars: &[Bar]) -> Result<(), RankError> {
    for (i, bar) in bars.iter().enumerate() {
        let fields = [bar.open, bar.high, bar.low, bar.close, bar.volume];
        if fields.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(RankError::MalformedData(format!(
                "non-finite or negative value on {}",
                bar.date
            )));
        }
        if bar.high < bar.low {
            return Err(RankError::MalformedData(format!(
                "high below low on {}",
                bar.date
            )));
        }
        if i > 0 && bars[i - 1].date >= bar.date {
            return Err(RankError::MalformedData(format!(
                "dates not strictly increasing at {}",
                bar.date
            )));
        }
    }

    if let Some(last) = bars.last() {
        if last.close <= 0.0 {
            return Err(RankError::MalformedData(format!(
                "non-positive last close on {}",
                last.date
            )));
        }
    }

    Ok(())
}
