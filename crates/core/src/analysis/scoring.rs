use crate::analysis::indicators::IndicatorSnapshot;
use crate::analysis::round_to;

const TREND_WEIGHT: f64 = 40.0;
const RSI_WEIGHT: f64 = 25.0;
const RSI_CENTER: f64 = 62.0;
const RSI_HALF_WIDTH: f64 = 38.0;
const RSI_NEUTRAL: f64 = 50.0;
const BREAKOUT_BONUS: f64 = 10.0;
const VOLUME_WEIGHT: f64 = 15.0;
const VOLUME_SPAN: f64 = 1.5;
const VOLATILITY_WEIGHT: f64 = 10.0;
const VOLATILITY_CEILING: f64 = 0.06;
pub const DEFAULT_ATR_PCT: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreFacts {
    /// 0..=100, one decimal.
    pub composite: f64,
    /// 0..=3.
    pub trend: u8,
    pub atr_pct: f64,
}

pub fn trend_count(s: &IndicatorSnapshot) -> u8 {
    let mut trend = 0;
    if s.close > s.ema20 {
        trend += 1;
    }
    if s.sma50.is_some_and(|sma50| s.ema20 > sma50) {
        trend += 1;
    }
    if let (Some(sma50), Some(sma200)) = (s.sma50, s.sma200) {
        if sma50 > sma200 {
            trend += 1;
        }
    }
    trend
}

pub fn rsi_band_score(rsi: Option<f64>) -> f64 {
    let rsi = rsi.unwrap_or(RSI_NEUTRAL);
    (1.0 - (rsi - RSI_CENTER).abs() / RSI_HALF_WIDTH).max(0.0) * RSI_WEIGHT
}

pub fn volume_score(vol_spike: Option<f64>) -> f64 {
    let spike = vol_spike.unwrap_or(1.0);
    ((spike - 1.0) / VOLUME_SPAN).clamp(0.0, 1.0) * VOLUME_WEIGHT
}

pub fn atr_pct(atr14: Option<f64>, close: f64) -> f64 {
    match atr14 {
        Some(atr) if close != 0.0 => atr / close,
        _ => DEFAULT_ATR_PCT,
    }
}

pub fn volatility_score(atr_pct: f64) -> f64 {
    ((VOLATILITY_CEILING - atr_pct) / VOLATILITY_CEILING).clamp(0.0, 1.0) * VOLATILITY_WEIGHT
}

pub fn score(s: &IndicatorSnapshot) -> ScoreFacts {
    let trend = trend_count(s);
    let atr_pct = atr_pct(s.atr14, s.close);
    let breakout = if s.breakout50 { BREAKOUT_BONUS } else { 0.0 };

    let raw = (trend as f64 / 3.0) * TREND_WEIGHT
        + rsi_band_score(s.rsi14)
        + breakout
        + volume_score(s.vol_spike)
        + volatility_score(atr_pct);

    // NaN inputs (e.g. a degenerate ema) must not escape the bounds.
    let bounded = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 100.0) };

    ScoreFacts {
        composite: round_to(bounded, 1),
        trend,
        atr_pct,
    }
}
