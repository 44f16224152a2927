//! Regional market quotes and their normalized aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Market region feeding the prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Asian,
    European,
}

impl Region {
    pub const ALL: [Region; 2] = [Region::Asian, Region::European];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Asian => "asian",
            Region::European => "european",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asian" | "asia" => Ok(Region::Asian),
            "european" | "europe" => Ok(Region::European),
            other => Err(format!("unknown region '{other}'")),
        }
    }
}

/// One market index quote from a regional provider.
///
/// `is_valid` is set by the provider: false when the quote is missing or
/// older than the provider's freshness window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    pub market_symbol: String,
    pub region: Region,
    pub change_percent: f64,
    pub is_valid: bool,
    pub fetched_at: DateTime<Utc>,
}

impl MarketQuote {
    /// Valid and numerically usable.
    pub fn is_usable(&self) -> bool {
        self.is_valid && self.change_percent.is_finite()
    }
}

/// Sentiment label attached to a regional aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketSentiment {
    Bullish,
    Neutral,
    Bearish,
}

/// Normalized influence of one region. Recomputed on every call, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalAggregate {
    pub region: Region,
    pub avg_change_percent: f64,
    /// Market-weighted change, before the region's share is applied.
    pub influence_score: f64,
    /// `influence_score × region_weight_pct / 100`.
    pub impact_percent: f64,
    pub valid_markets: usize,
    pub total_markets: usize,
    pub sentiment_label: Option<MarketSentiment>,
    /// 0–100, scaled by the valid/total market ratio.
    pub sentiment_confidence: Option<f64>,
}

impl RegionalAggregate {
    /// Zero-influence aggregate used when no market is usable.
    pub fn neutral(region: Region, total_markets: usize) -> Self {
        Self {
            region,
            avg_change_percent: 0.0,
            influence_score: 0.0,
            impact_percent: 0.0,
            valid_markets: 0,
            total_markets,
            sentiment_label: None,
            sentiment_confidence: None,
        }
    }

    /// Fraction of markets that produced a usable quote (0 when there were none).
    pub fn completeness(&self) -> f64 {
        if self.total_markets == 0 {
            0.0
        } else {
            self.valid_markets as f64 / self.total_markets as f64
        }
    }

    pub fn has_data(&self) -> bool {
        self.valid_markets > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_parses_aliases() {
        assert_eq!("Asia".parse::<Region>().unwrap(), Region::Asian);
        assert_eq!("european".parse::<Region>().unwrap(), Region::European);
        assert!("latam".parse::<Region>().is_err());
    }

    #[test]
    fn neutral_aggregate_has_no_completeness() {
        let agg = RegionalAggregate::neutral(Region::Asian, 4);
        assert_eq!(agg.completeness(), 0.0);
        assert!(!agg.has_data());
        assert_eq!(RegionalAggregate::neutral(Region::Asian, 0).completeness(), 0.0);
    }

    #[test]
    fn nan_quote_is_not_usable() {
        let quote = MarketQuote {
            market_symbol: "^N225".into(),
            region: Region::Asian,
            change_percent: f64::NAN,
            is_valid: true,
            fetched_at: Utc::now(),
        };
        assert!(!quote.is_usable());
    }
}
