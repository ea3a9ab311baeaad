//! Indicator snapshot for the last bar of a daily series.
//!
//! All windows are trailing and use no look-ahead. Indicators that need more
//! history than the series has are `None`.

use crate::domain::bar::Bar;
use crate::domain::error::RankError;

pub const DEFAULT_MIN_BARS: usize = 60;

const EMA_SPAN: usize = 20;
const SMA_FAST: usize = 50;
const SMA_SLOW: usize = 200;
const RSI_PERIOD: usize = 14;
const RSI_EPSILON: f64 = 1e-9;
const ATR_PERIOD: usize = 14;
const VOLUME_WINDOW: usize = 20;
const BREAKOUT_WINDOW: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSnapshot {
    pub close: f64,
    pub ema20: f64,
    pub sma50: Option<f64>,
    pub sma200: Option<f64>,
    pub rsi14: Option<f64>,
    pub atr14: Option<f64>,
    pub vol_spike: Option<f64>,
    pub breakout50: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct IndicatorEngine {
    min_bars: usize,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_BARS)
    }
}

impl IndicatorEngine {
    /// `min_bars` below 1 is raised to 1; a snapshot always needs a last bar.
    pub fn new(min_bars: usize) -> Self {
        Self {
            min_bars: min_bars.max(1),
        }
    }

    pub fn min_bars(&self) -> usize {
        self.min_bars
    }

    pub fn compute(&self, bars: &[Bar]) -> Result<IndicatorSnapshot, RankError> {
        if bars.len() < self.min_bars {
            return Err(RankError::InsufficientHistory {
                have: bars.len(),
                need: self.min_bars,
            });
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();

        let last = bars[bars.len() - 1];

        let vol_spike = trailing_mean(&volumes, VOLUME_WINDOW)
            .filter(|v20| v20.is_finite() && *v20 != 0.0)
            .map(|v20| last.volume / v20);

        // The window includes the current bar, so a close equal to its own high
        // never registers as a breakout.
        let breakout50 = trailing_max(&highs, BREAKOUT_WINDOW)
            .map(|hh50| last.close > hh50)
            .unwrap_or(false);

        Ok(IndicatorSnapshot {
            close: last.close,
            ema20: ema(&closes, EMA_SPAN),
            sma50: trailing_mean(&closes, SMA_FAST),
            sma200: trailing_mean(&closes, SMA_SLOW),
            rsi14: wilder_rsi(&closes, RSI_PERIOD),
            atr14: trailing_mean(&true_ranges(bars), ATR_PERIOD),
            vol_spike,
            breakout50,
        })
    }
}

/// Recursive EMA with `alpha = 2 / (span + 1)`, seeded by the first value.
pub fn ema(values: &[f64], span: usize) -> f64 {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut iter = values.iter();
    let Some(&seed) = iter.next() else {
        return f64::NAN;
    };
    iter.fold(seed, |acc, &v| alpha * v + (1.0 - alpha) * acc)
}

pub fn trailing_mean(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    let tail = &values[values.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

pub fn trailing_max(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    values[values.len() - window..]
        .iter()
        .copied()
        .reduce(f64::max)
}

/// Wilder-smoothed RSI: gains and losses are smoothed with `alpha = 1 / period`,
/// seeded by the first day-over-day difference.
pub fn wilder_rsi(closes: &[f64], period: usize) -> Option<f64> {
    let alpha = 1.0 / period as f64;
    let mut diffs = closes.windows(2).map(|w| w[1] - w[0]);

    let first = diffs.next()?;
    let mut avg_gain = first.max(0.0);
    let mut avg_loss = (-first).max(0.0);

    for d in diffs {
        avg_gain = alpha * d.max(0.0) + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * (-d).max(0.0) + (1.0 - alpha) * avg_loss;
    }

    let rs = avg_gain / (avg_loss + RSI_EPSILON);
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// Per-bar true range; the first bar has no previous close and uses `high - low`.
pub fn true_ranges(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, b)| {
            let hl = b.high - b.low;
            match i.checked_sub(1).map(|p| bars[p].close) {
                Some(prev) => hl.max((b.high - prev).abs()).max((b.low - prev).abs()),
                None => hl,
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    pub(crate) fn series_from_closes(closes: &[f64], volume: f64) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                date: start + Duration::days(i as i64),
                open: c,
                high: c,
                low: c,
                close: c,
                volume,
            })
            .collect()
    }

    fn linear(from: f64, to: f64, n: usize) -> Vec<f64> {
        let step = (to - from) / (n as f64 - 1.0);
        (0..n).map(|i| from + step * i as f64).collect()
    }

    #[test]
    fn insufficient_history_is_reported() {
        let engine = IndicatorEngine::default();
        let bars = series_from_closes(&linear(10.0, 20.0, 59), 100.0);
        assert_eq!(
            engine.compute(&bars).unwrap_err(),
            RankError::InsufficientHistory { have: 59, need: 60 }
        );
        assert!(matches!(
            engine.compute(&[]),
            Err(RankError::InsufficientHistory { have: 0, need: 60 })
        ));
    }

    #[test]
    fn ema_is_seeded_by_first_value() {
        assert_eq!(ema(&[5.0], 20), 5.0);
        let alpha = 2.0 / 21.0;
        let expected = alpha * 10.0 + (1.0 - alpha) * 5.0;
        assert!((ema(&[5.0, 10.0], 20) - expected).abs() < 1e-12);
    }

    #[test]
    fn rsi_tracks_direction_and_stays_bounded() {
        let up = wilder_rsi(&linear(100.0, 200.0, 120), 14).unwrap();
        let down = wilder_rsi(&linear(200.0, 100.0, 120), 14).unwrap();
        assert!(up > 99.0, "rising series rsi={up}");
        assert!(down < 1.0, "falling series rsi={down}");

        let zigzag: Vec<f64> = (0..200)
            .map(|i| 100.0 + ((i * 37) % 11) as f64 - 5.0)
            .collect();
        let rsi = wilder_rsi(&zigzag, 14).unwrap();
        assert!((0.0..=100.0).contains(&rsi));
        assert!(wilder_rsi(&[1.0], 14).is_none());
    }

    #[test]
    fn true_range_uses_previous_close_gaps() {
        let mut bars = series_from_closes(&[10.0, 10.0], 1.0);
        bars[1].high = 12.0;
        bars[1].low = 11.0;
        bars[1].close = 11.5;
        assert_eq!(true_ranges(&bars), vec![0.0, 2.0]);
    }

    #[test]
    fn short_history_leaves_long_windows_undefined() {
        let engine = IndicatorEngine::new(20);
        let snap = engine
            .compute(&series_from_closes(&linear(10.0, 12.0, 30), 500.0))
            .unwrap();
        assert!(snap.sma50.is_none());
        assert!(snap.sma200.is_none());
        assert!(!snap.breakout50);
        assert!(snap.atr14.is_some());
        assert_eq!(snap.vol_spike, Some(1.0));
    }

    #[test]
    fn zero_volume_leaves_spike_undefined() {
        let snap = IndicatorEngine::default()
            .compute(&series_from_closes(&linear(10.0, 12.0, 80), 0.0))
            .unwrap();
        assert!(snap.vol_spike.is_none());
    }

    #[test]
    fn linear_uptrend_has_full_trend_stack() {
        let snap = IndicatorEngine::default()
            .compute(&series_from_closes(&linear(100.0, 400.0, 300), 1_000.0))
            .unwrap();
        assert!(snap.close > snap.ema20);
        assert!(snap.ema20 > snap.sma50.unwrap());
        assert!(snap.sma50.unwrap() > snap.sma200.unwrap());
        // Close equals high on every bar, so the inclusive 50-bar high is never exceeded.
        assert!(!snap.breakout50);
    }

    #[test]
    fn breakout_needs_close_above_inclusive_high() {
        let mut bars = series_from_closes(&linear(100.0, 150.0, 80), 1_000.0);
        let last = bars.len() - 1;
        bars[last].high = 150.0;
        bars[last].close = 151.0;
        let snap = IndicatorEngine::default().compute(&bars).unwrap();
        assert!(snap.breakout50);
    }
}
