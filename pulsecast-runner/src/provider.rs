//! Data provider seams and in-memory implementations.
//!
//! The engine never talks to a market-data API directly. It consumes these
//! three traits; production wiring plugs in real clients, while the CLI
//! fixtures and the test suites use the `Static*` providers below.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use pulsecast_core::config::{CorrectionConfig, LocalConfig};
use pulsecast_core::domain::{LocalSignal, MarketQuote, PriceDeltaSnapshot, Region};
use pulsecast_core::local::{derive_local_signal, LocalFeatures};

use crate::error::ProviderError;

/// Raw per-market quotes for one region. May return partial or stale data
/// (flagged per quote) but never fails.
pub trait RegionalQuoteProvider: Send + Sync {
    fn fetch(&self, region: Region) -> Vec<MarketQuote>;
}

/// Price/sentiment deltas for one stock.
pub trait PriceHistoryProvider: Send + Sync {
    fn deltas(&self, symbol: &str) -> Result<PriceDeltaSnapshot, ProviderError>;
}

/// Stock-specific technical/sentiment/momentum signal.
pub trait LocalSignalProvider: Send + Sync {
    fn compute(&self, symbol: &str) -> Result<LocalSignal, ProviderError>;
}

fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

// ─── Static providers ────────────────────────────────────────────────

/// Fixed quotes per region. Replaceable at runtime so a test can move the
/// market between two reads.
#[derive(Debug, Default)]
pub struct StaticQuotes {
    quotes: RwLock<HashMap<Region, Vec<MarketQuote>>>,
}

impl StaticQuotes {
    pub fn new(quotes: Vec<MarketQuote>) -> Self {
        let provider = Self::default();
        provider.replace_all(quotes);
        provider
    }

    /// Replace every region's quotes, grouping by each quote's region.
    pub fn replace_all(&self, quotes: Vec<MarketQuote>) {
        let mut grouped: HashMap<Region, Vec<MarketQuote>> = HashMap::new();
        for quote in quotes {
            grouped.entry(quote.region).or_default().push(quote);
        }
        *self.quotes.write().unwrap_or_else(PoisonError::into_inner) = grouped;
    }

    pub fn set(&self, region: Region, quotes: Vec<MarketQuote>) {
        self.quotes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(region, quotes);
    }
}

impl RegionalQuoteProvider for StaticQuotes {
    fn fetch(&self, region: Region) -> Vec<MarketQuote> {
        self.quotes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&region)
            .cloned()
            .unwrap_or_default()
    }
}

/// Fixed price deltas per symbol.
#[derive(Debug, Default)]
pub struct StaticPriceHistory {
    snapshots: RwLock<HashMap<String, PriceDeltaSnapshot>>,
}

impl StaticPriceHistory {
    pub fn new(snapshots: impl IntoIterator<Item = PriceDeltaSnapshot>) -> Self {
        let provider = Self::default();
        for snapshot in snapshots {
            provider.insert(snapshot);
        }
        provider
    }

    pub fn insert(&self, snapshot: PriceDeltaSnapshot) {
        self.snapshots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(normalize_symbol(&snapshot.symbol), snapshot);
    }
}

impl PriceHistoryProvider for StaticPriceHistory {
    fn deltas(&self, symbol: &str) -> Result<PriceDeltaSnapshot, ProviderError> {
        self.snapshots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&normalize_symbol(symbol))
            .cloned()
            .ok_or_else(|| ProviderError::NotFound {
                provider: "price-history".into(),
                symbol: symbol.to_string(),
            })
    }
}

/// Precomputed local signals per symbol.
#[derive(Debug, Default)]
pub struct StaticLocalSignals {
    signals: RwLock<HashMap<String, LocalSignal>>,
}

impl StaticLocalSignals {
    pub fn new(signals: impl IntoIterator<Item = (String, LocalSignal)>) -> Self {
        let provider = Self::default();
        for (symbol, signal) in signals {
            provider.insert(&symbol, signal);
        }
        provider
    }

    pub fn insert(&self, symbol: &str, signal: LocalSignal) {
        self.signals
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(normalize_symbol(symbol), signal);
    }
}

impl LocalSignalProvider for StaticLocalSignals {
    fn compute(&self, symbol: &str) -> Result<LocalSignal, ProviderError> {
        self.signals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&normalize_symbol(symbol))
            .cloned()
            .ok_or_else(|| ProviderError::NotFound {
                provider: "local-signal".into(),
                symbol: symbol.to_string(),
            })
    }
}

/// Derives local signals from raw indicator features on every call.
#[derive(Debug)]
pub struct FeatureLocalSignals {
    features: RwLock<HashMap<String, LocalFeatures>>,
    local: LocalConfig,
    correction: CorrectionConfig,
}

impl FeatureLocalSignals {
    pub fn new(local: LocalConfig, correction: CorrectionConfig) -> Self {
        Self {
            features: RwLock::new(HashMap::new()),
            local,
            correction,
        }
    }

    pub fn insert(&self, symbol: &str, features: LocalFeatures) {
        self.features
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(normalize_symbol(symbol), features);
    }
}

impl LocalSignalProvider for FeatureLocalSignals {
    fn compute(&self, symbol: &str) -> Result<LocalSignal, ProviderError> {
        let features = self.features.read().unwrap_or_else(PoisonError::into_inner);
        let raw = features
            .get(&normalize_symbol(symbol))
            .ok_or_else(|| ProviderError::NotFound {
                provider: "local-features".into(),
                symbol: symbol.to_string(),
            })?;
        Ok(derive_local_signal(raw, &self.local, &self.correction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn quote(symbol: &str, region: Region) -> MarketQuote {
        MarketQuote {
            market_symbol: symbol.into(),
            region,
            change_percent: 0.5,
            is_valid: true,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn quotes_are_grouped_by_region() {
        let provider = StaticQuotes::new(vec![
            quote("^N225", Region::Asian),
            quote("^FTSE", Region::European),
            quote("^HSI", Region::Asian),
        ]);
        assert_eq!(provider.fetch(Region::Asian).len(), 2);
        assert_eq!(provider.fetch(Region::European).len(), 1);
        provider.set(Region::European, Vec::new());
        assert!(provider.fetch(Region::European).is_empty());
    }

    #[test]
    fn symbol_lookup_is_case_insensitive() {
        let signals = StaticLocalSignals::new([("aapl".to_string(), LocalSignal::new(0.1, 0.2, 0.3))]);
        assert!(signals.compute("AAPL").is_ok());
        assert!(matches!(
            signals.compute("MSFT"),
            Err(ProviderError::NotFound { .. })
        ));
    }

    #[test]
    fn feature_provider_derives_signal() {
        let provider = FeatureLocalSignals::new(LocalConfig::default(), CorrectionConfig::default());
        provider.insert(
            "NVDA",
            LocalFeatures {
                rsi: 25.0,
                ..LocalFeatures::default()
            },
        );
        let signal = provider.compute("nvda").unwrap();
        assert!(signal.technical_score > 0.0);
    }
}
