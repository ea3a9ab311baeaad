//! Degraded scoring from last/previous close only.

use crate::analysis::classify::target_band;
use crate::analysis::round_to;
use crate::domain::bar::Quote;
use crate::domain::recommendation::Classification;

const AVOID_BELOW: f64 = 55.0;
const NEUTRAL_BELOW: f64 = 70.0;
const STOP_MULT: f64 = 0.95;
const TARGET_LOW: f64 = 1.08;
const TARGET_HIGH: f64 = 1.15;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuoteVerdict {
    pub composite: f64,
    pub change_pct: f64,
    pub classification: Classification,
    pub confidence: i32,
    pub stop_loss: f64,
    pub target_band: [f64; 2],
}

pub fn change_pct(quote: &Quote) -> f64 {
    match quote.prev {
        Some(prev) if prev != 0.0 && prev.is_finite() => (quote.last - prev) / prev,
        _ => 0.0,
    }
}

pub fn score_quote(quote: &Quote) -> QuoteVerdict {
    let change = change_pct(quote);
    let raw = 50.0 + change * 100.0 * 0.5;
    let composite = if raw.is_nan() {
        50.0
    } else {
        round_to(raw.clamp(0.0, 100.0), 1)
    };

    // No Multi-Bagger on this path: there is not enough history for a long call.
    let classification = if composite < AVOID_BELOW {
        Classification::Avoid
    } else if composite < NEUTRAL_BELOW {
        Classification::Neutral
    } else {
        Classification::ShortTermBlast
    };

    QuoteVerdict {
        composite,
        change_pct: change,
        classification,
        confidence: (25.0 + (composite - 50.0)).clamp(10.0, 85.0).round() as i32,
        stop_loss: round_to(quote.last * STOP_MULT, 2),
        target_band: target_band(quote.last, TARGET_LOW, TARGET_HIGH),
    }
}
