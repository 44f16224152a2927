//! JSON market fixtures: the in-memory providers the CLI runs against.
//!
//! ```json
//! {
//!   "quotes": [
//!     { "market": "^FTSE", "region": "european", "change_percent": 0.8 }
//!   ],
//!   "stocks": {
//!     "NVDA": {
//!       "prices": { "abs_drop_1d": 9.41, "current_price": 183.16, "sentiment": 0.105 },
//!       "features": { "rsi": 42.0, "volume_ratio": 1.3 }
//!     },
//!     "AAPL": {
//!       "prices": { "current_price": 228.5 },
//!       "signal": { "technical_score": 0.2, "sentiment_score": 0.1, "momentum": 0.3 }
//!     }
//!   }
//! }
//! ```
//!
//! A stock takes either a precomputed `signal` or raw `features`; `signal`
//! wins when both are present.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;

use pulsecast_core::config::{CorrectionConfig, LocalConfig};
use pulsecast_core::domain::{LocalSignal, MarketQuote, PriceDeltaSnapshot, Region};
use pulsecast_core::local::LocalFeatures;
use pulsecast_runner::{
    FeatureLocalSignals, LocalSignalProvider, ProviderError, Providers, StaticLocalSignals,
    StaticPriceHistory, StaticQuotes,
};

#[derive(Debug, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub quotes: Vec<FixtureQuote>,
    #[serde(default)]
    pub stocks: BTreeMap<String, FixtureStock>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureQuote {
    pub market: String,
    pub region: Region,
    pub change_percent: f64,
    #[serde(default = "default_valid")]
    pub valid: bool,
}

fn default_valid() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FixturePrices {
    pub change_1d_pct: f64,
    pub change_3d_pct: f64,
    pub change_7d_pct: f64,
    pub abs_drop_1d: f64,
    pub abs_drop_3d: f64,
    pub current_price: f64,
    pub sentiment: f64,
    pub news_count: u32,
}

#[derive(Debug, Deserialize)]
pub struct FixtureStock {
    pub prices: Option<FixturePrices>,
    pub signal: Option<LocalSignal>,
    pub features: Option<LocalFeatures>,
}

/// Precomputed signals first, derived ones second.
struct FixtureSignals {
    fixed: StaticLocalSignals,
    derived: FeatureLocalSignals,
}

impl LocalSignalProvider for FixtureSignals {
    fn compute(&self, symbol: &str) -> Result<LocalSignal, ProviderError> {
        self.fixed
            .compute(symbol)
            .or_else(|_| self.derived.compute(symbol))
    }
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("failed to parse fixture {}", path.display()))
    }

    /// Every stock symbol in the fixture, uppercased and sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self
            .stocks
            .keys()
            .map(|s| s.trim().to_ascii_uppercase())
            .collect();
        symbols.sort();
        symbols.dedup();
        symbols
    }

    pub fn providers(&self, local: &LocalConfig, correction: &CorrectionConfig) -> Providers {
        let now = Utc::now();
        let quotes = self
            .quotes
            .iter()
            .map(|q| MarketQuote {
                market_symbol: q.market.clone(),
                region: q.region,
                change_percent: q.change_percent,
                is_valid: q.valid,
                fetched_at: now,
            })
            .collect();

        let prices = StaticPriceHistory::default();
        let signals = FixtureSignals {
            fixed: StaticLocalSignals::default(),
            derived: FeatureLocalSignals::new(local.clone(), correction.clone()),
        };
        for (symbol, stock) in &self.stocks {
            if let Some(p) = &stock.prices {
                prices.insert(PriceDeltaSnapshot {
                    symbol: symbol.trim().to_ascii_uppercase(),
                    change_1d_pct: p.change_1d_pct,
                    change_3d_pct: p.change_3d_pct,
                    change_7d_pct: p.change_7d_pct,
                    abs_drop_1d: p.abs_drop_1d,
                    abs_drop_3d: p.abs_drop_3d,
                    current_price: p.current_price,
                    sentiment: p.sentiment,
                    news_count: p.news_count,
                });
            }
            match (&stock.signal, &stock.features) {
                (Some(signal), _) => signals.fixed.insert(symbol, signal.clone()),
                (None, Some(features)) => signals.derived.insert(symbol, features.clone()),
                (None, None) => {}
            }
        }

        Providers {
            quotes: Arc::new(StaticQuotes::new(quotes)),
            prices: Arc::new(prices),
            signals: Arc::new(signals),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsecast_runner::{PriceHistoryProvider, RegionalQuoteProvider};

    const SAMPLE: &str = r#"{
        "quotes": [
            { "market": "^FTSE", "region": "european", "change_percent": 0.8 },
            { "market": "^N225", "region": "asian", "change_percent": -0.3, "valid": false }
        ],
        "stocks": {
            "nvda": {
                "prices": { "abs_drop_1d": 9.41, "current_price": 183.16, "sentiment": 0.105 },
                "features": { "rsi": 42.0 }
            },
            "AAPL": {
                "signal": { "technical_score": 0.2, "sentiment_score": 0.1, "momentum": 0.3 }
            }
        }
    }"#;

    #[test]
    fn sample_fixture_builds_providers() {
        let fixture: Fixture = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(fixture.symbols(), vec!["AAPL".to_string(), "NVDA".to_string()]);

        let providers = fixture.providers(&LocalConfig::default(), &CorrectionConfig::default());
        assert_eq!(providers.quotes.fetch(Region::European).len(), 1);
        assert!(!providers.quotes.fetch(Region::Asian)[0].is_valid);
        assert_eq!(providers.prices.deltas("NVDA").unwrap().current_price, 183.16);
        assert!(providers.prices.deltas("AAPL").is_err());
        assert!(providers.signals.compute("NVDA").is_ok());
        assert_eq!(providers.signals.compute("AAPL").unwrap().momentum, 0.3);
        assert!(providers.signals.compute("MSFT").is_err());
    }
}
