use crate::analysis::round_to;
use crate::analysis::scoring::ScoreFacts;
use crate::domain::recommendation::Classification;

const MULTI_BAGGER_MIN: f64 = 72.0;
const MULTI_BAGGER_MIN_TREND: u8 = 2;
const SHORT_TERM_MIN: f64 = 70.0;
const AVOID_BELOW: f64 = 55.0;

const STOP_ATR_MULTIPLE: f64 = 1.8;
const TARGET_LOW: f64 = 1.12;
const TARGET_HIGH: f64 = 1.28;

/// Labels and levels derived from the full indicator path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub classification: Classification,
    pub confidence: i32,
    pub stop_loss: f64,
    pub target_band: [f64; 2],
}

/// First match wins: Multi-Bagger, Short-Term Blast, Avoid, then Neutral.
pub fn classification_for(facts: &ScoreFacts) -> Classification {
    if facts.composite >= MULTI_BAGGER_MIN && facts.trend >= MULTI_BAGGER_MIN_TREND {
        Classification::MultiBagger
    } else if facts.composite >= SHORT_TERM_MIN {
        Classification::ShortTermBlast
    } else if facts.composite < AVOID_BELOW {
        Classification::Avoid
    } else {
        Classification::Neutral
    }
}

pub fn confidence_for(facts: &ScoreFacts) -> i32 {
    (facts.composite - 25.0 + facts.trend as f64 * 5.0)
        .clamp(10.0, 90.0)
        .round() as i32
}

pub fn classify(facts: &ScoreFacts, last_close: f64, atr14: Option<f64>) -> Verdict {
    let atr = atr14.unwrap_or(0.0);
    Verdict {
        classification: classification_for(facts),
        confidence: confidence_for(facts),
        stop_loss: round_to(last_close - STOP_ATR_MULTIPLE * atr, 2),
        target_band: target_band(last_close, TARGET_LOW, TARGET_HIGH),
    }
}

/// `[close * low, close * high]` rounded to cents, widened by a cent if
/// rounding collapsed the band.
pub fn target_band(last_close: f64, low_mult: f64, high_mult: f64) -> [f64; 2] {
    let low = round_to(last_close * low_mult, 2);
    let mut high = round_to(last_close * high_mult, 2);
    if high <= low {
        high = round_to(low + 0.01, 2);
    }
    [low, high]
}
