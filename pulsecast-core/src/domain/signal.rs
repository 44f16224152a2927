//! Stock-specific (local) signal and the correction warning it may carry.

use serde::{Deserialize, Serialize};

/// Local signal for one stock. Scores are expected in [-1, 1]; the aggregator
/// clamps out-of-range values rather than rejecting them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalSignal {
    pub technical_score: f64,
    pub sentiment_score: f64,
    pub momentum: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction_warning: Option<CorrectionWarning>,
    /// Raw indicator values the scores came from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readings: Option<IndicatorReadings>,
}

impl LocalSignal {
    pub fn new(technical_score: f64, sentiment_score: f64, momentum: f64) -> Self {
        Self {
            technical_score,
            sentiment_score,
            momentum,
            correction_warning: None,
            readings: None,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.technical_score.is_finite()
            && self.sentiment_score.is_finite()
            && self.momentum.is_finite()
    }
}

/// Indicator values carried alongside a derived local signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorReadings {
    pub rsi: f64,
    pub volume_ratio: f64,
    pub news_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningSeverity {
    Medium,
    High,
}

/// Overbought / pullback-risk warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionWarning {
    pub severity: WarningSeverity,
    pub reasons: Vec<String>,
    /// 0–100.
    pub confidence: f64,
}
