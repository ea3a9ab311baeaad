pub mod classify;
pub mod indicators;
pub mod quote;
pub mod scoring;

use crate::domain::bar::{validate_series, Bar, Quote};
use crate::domain::error::RankError;
use crate::domain::recommendation::{Classification, ScoringBasis};
use indicators::IndicatorEngine;

pub const FULL_RATIONALE: &str = "Technical composite from daily history: EMA20/SMA50/SMA200 trend \
     alignment, RSI(14) band, 50-day breakout, volume spike vs 20-day average and ATR(14) volatility.";
pub const QUOTE_RATIONALE: &str = "Quote-only snapshot: price history too short for indicators; \
     scored from last vs previous close. Low-information, treat with caution.";

/// Scored outcome for one symbol, before it is labelled with ticker, cap and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub basis: ScoringBasis,
    pub composite: f64,
    pub trend: Option<u8>,
    pub classification: Classification,
    pub confidence: i32,
    pub stop_loss: f64,
    pub target_band: [f64; 2],
    pub rationale: &'static str,
    pub evidence: Vec<String>,
}

/// Validates `bars` and runs indicators, composite scoring and classification.
pub fn assess_bars(engine: &IndicatorEngine, bars: &[Bar]) -> Result<Assessment, RankError> {
    validate_series(bars)?;
    let snapshot = engine.compute(bars)?;
    let facts = scoring::score(&snapshot);
    let verdict = classify::classify(&facts, snapshot.close, snapshot.atr14);

    let mut evidence = vec![
        format!("bars:{}", bars.len()),
        format!("trend:{}/3", facts.trend),
        format!("atr_pct:{:.4}", facts.atr_pct),
    ];
    if let Some(rsi) = snapshot.rsi14 {
        evidence.push(format!("rsi14:{rsi:.1}"));
    }
    if snapshot.breakout50 {
        evidence.push("breakout50".to_string());
    }

    Ok(Assessment {
        basis: ScoringBasis::Indicators,
        composite: facts.composite,
        trend: Some(facts.trend),
        classification: verdict.classification,
        confidence: verdict.confidence,
        stop_loss: verdict.stop_loss,
        target_band: verdict.target_band,
        rationale: FULL_RATIONALE,
        evidence,
    })
}

pub fn assess_quote(q: &Quote) -> Result<Assessment, RankError> {
    if !q.last.is_finite() || q.last <= 0.0 {
        return Err(RankError::MalformedData(format!(
            "unusable last price {}",
            q.last
        )));
    }
    let v = quote::score_quote(q);
    Ok(Assessment {
        basis: ScoringBasis::QuoteOnly,
        composite: v.composite,
        trend: None,
        classification: v.classification,
        confidence: v.confidence,
        stop_loss: v.stop_loss,
        target_band: v.target_band,
        rationale: QUOTE_RATIONALE,
        evidence: vec![
            "quote_only".to_string(),
            format!("change_pct:{:.4}", v.change_pct),
        ],
    })
}

pub fn round_to(x: f64, decimals: i32) -> f64 {
    let m = 10f64.powi(decimals);
    (x * m).round() / m
}
