//! Prediction input and output types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::market::RegionalAggregate;
use super::signal::{CorrectionWarning, LocalSignal};

/// Forecast window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Horizon {
    Today,
    Tomorrow,
    Week,
    Month,
}

impl Horizon {
    pub const ALL: [Horizon; 4] = [
        Horizon::Today,
        Horizon::Tomorrow,
        Horizon::Week,
        Horizon::Month,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Horizon::Today => "today",
            Horizon::Tomorrow => "tomorrow",
            Horizon::Week => "week",
            Horizon::Month => "month",
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Horizon {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "today" => Ok(Horizon::Today),
            "tomorrow" => Ok(Horizon::Tomorrow),
            "week" => Ok(Horizon::Week),
            "month" => Ok(Horizon::Month),
            other => Err(format!(
                "unknown horizon '{other}' (expected today, tomorrow, week, month)"
            )),
        }
    }
}

/// Everything the aggregator needs for one (symbol, horizon).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionInput {
    pub symbol: String,
    pub horizon: Horizon,
    /// Zero when the price source was unavailable.
    pub current_price: f64,
    pub asian: RegionalAggregate,
    pub european: RegionalAggregate,
    pub local_signal: Option<LocalSignal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

impl Direction {
    /// Sign of `value` with a dead band of `epsilon`.
    pub fn from_change(value: f64, epsilon: f64) -> Self {
        if value > epsilon {
            Direction::Up
        } else if value < -epsilon {
            Direction::Down
        } else {
            Direction::Flat
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorSource {
    European,
    Asian,
    Local,
}

/// One component's share of the prediction, kept for auditability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributingFactor {
    pub source: FactorSource,
    /// Normalized component value in [-1, 1], before weighting.
    pub value: f64,
    pub weight: f64,
    /// `value × weight`.
    pub contribution: f64,
}

/// Degraded input recorded on a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFlag {
    AsianMarketsUnavailable,
    EuropeanMarketsUnavailable,
    LocalSignalMissing,
    PriceUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Buy,
    Sell,
    Warning,
    Opportunity,
    Alert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStrength {
    Moderate,
    High,
    Strong,
    VeryStrong,
    Critical,
}

/// An actionable reading of a prediction, with its reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub kind: SignalKind,
    pub strength: SignalStrength,
    pub reason: String,
}

/// Directional forecast for one (symbol, horizon).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub symbol: String,
    pub horizon: Horizon,
    pub direction: Direction,
    pub predicted_change_percent: f64,
    /// 0–100.
    pub confidence: f64,
    /// Always ordered European, Asian, Local.
    pub contributing_factors: Vec<ContributingFactor>,
    pub predicted_price: Option<f64>,
    /// Banded impact (%) of the local component.
    pub local_impact_percent: f64,
    pub correction_warning: Option<CorrectionWarning>,
    pub flags: Vec<DataFlag>,
    #[serde(default)]
    pub signals: Vec<TradeSignal>,
    /// Short plain-language reasons, most significant first.
    #[serde(default)]
    pub top_reasons: Vec<String>,
}

impl PredictionResult {
    pub fn factor(&self, source: FactorSource) -> Option<&ContributingFactor> {
        self.contributing_factors.iter().find(|f| f.source == source)
    }

    pub fn is_degraded(&self) -> bool {
        !self.flags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizon_roundtrips_through_str() {
        for h in Horizon::ALL {
            assert_eq!(h.as_str().parse::<Horizon>().unwrap(), h);
        }
        assert!("year".parse::<Horizon>().is_err());
    }

    #[test]
    fn direction_uses_dead_band() {
        assert_eq!(Direction::from_change(0.2, 0.05), Direction::Up);
        assert_eq!(Direction::from_change(-0.2, 0.05), Direction::Down);
        assert_eq!(Direction::from_change(0.05, 0.05), Direction::Flat);
        assert_eq!(Direction::from_change(-0.01, 0.05), Direction::Flat);
    }

    #[test]
    fn horizon_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Horizon::Week).unwrap(), "\"week\"");
    }
}
