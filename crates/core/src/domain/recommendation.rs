use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "Multi-Bagger")]
    MultiBagger,
    #[serde(rename = "Short-Term Blast")]
    ShortTermBlast,
    #[serde(rename = "Neutral")]
    Neutral,
    #[serde(rename = "Avoid")]
    Avoid,
}

impl Classification {
    /// Ordering from worst (0) to best (3).
    pub fn rank(&self) -> u8 {
        match self {
            Classification::Avoid => 0,
            Classification::Neutral => 1,
            Classification::ShortTermBlast => 2,
            Classification::MultiBagger => 3,
        }
    }

    pub fn holding_duration(&self) -> HoldingDuration {
        match self {
            Classification::MultiBagger => HoldingDuration::Long,
            Classification::ShortTermBlast => HoldingDuration::Short,
            Classification::Neutral => HoldingDuration::Medium,
            Classification::Avoid => HoldingDuration::NotApplicable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldingDuration {
    #[serde(rename = "Long (>12 months)")]
    Long,
    #[serde(rename = "Medium (1-12 months)")]
    Medium,
    #[serde(rename = "Short (1-30 days)")]
    Short,
    #[serde(rename = "N/A")]
    NotApplicable,
}

/// Which scoring path produced a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringBasis {
    Indicators,
    QuoteOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub ticker: String,
    pub cap: String,
    pub composite_score: f64,
    pub classification: Classification,
    pub holding_duration: HoldingDuration,
    pub confidence: i32,
    pub rationale: String,
    pub stop_loss: f64,
    pub target_band: [f64; 2],
    pub evidence: Vec<String>,
    pub basis: ScoringBasis,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_labels_as_display_strings() {
        assert_eq!(
            serde_json::to_value(Classification::MultiBagger).unwrap(),
            json!("Multi-Bagger")
        );
        assert_eq!(
            serde_json::to_value(Classification::ShortTermBlast).unwrap(),
            json!("Short-Term Blast")
        );
        assert_eq!(
            serde_json::to_value(HoldingDuration::NotApplicable).unwrap(),
            json!("N/A")
        );
        assert_eq!(
            serde_json::to_value(ScoringBasis::QuoteOnly).unwrap(),
            json!("quote_only")
        );
    }

    #[test]
    fn holding_duration_follows_classification() {
        assert_eq!(
            Classification::MultiBagger.holding_duration(),
            HoldingDuration::Long
        );
        assert_eq!(
            Classification::ShortTermBlast.holding_duration(),
            HoldingDuration::Short
        );
        assert_eq!(
            Classification::Neutral.holding_duration(),
            HoldingDuration::Medium
        );
        assert_eq!(
            Classification::Avoid.holding_duration(),
            HoldingDuration::NotApplicable
        );
    }
}
