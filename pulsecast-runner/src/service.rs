//! Prediction service: providers → normalizer → aggregator, fronted by the
//! prediction cache.
//!
//! Every provider call is bounded by `EngineSettings::provider_timeout`.
//! Regional and price failures always degrade (neutral aggregate, missing
//! price); a local signal failure degrades in the serving path and fails the
//! task in the regeneration path, see [`SignalMode`].

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use pulsecast_core::domain::{
    Horizon, LocalSignal, PredictionInput, PredictionResult, PriceDeltaSnapshot, Region,
    RegionalAggregate,
};
use pulsecast_core::{
    CalibrationConfig, PredictionAggregator, ReboundDetector, ReboundEvent, RegionalNormalizer,
    ScoringError,
};

use crate::cache::{prediction_key, regional_key, PredictionCache};
use crate::config::EngineSettings;
use crate::error::{EngineError, ProviderError};
use crate::provider::{LocalSignalProvider, PriceHistoryProvider, RegionalQuoteProvider};
use crate::store::CacheStore;
use crate::timeout::{call_with_timeout, CallError};

/// The three consumed collaborators.
#[derive(Clone)]
pub struct Providers {
    pub quotes: Arc<dyn RegionalQuoteProvider>,
    pub prices: Arc<dyn PriceHistoryProvider>,
    pub signals: Arc<dyn LocalSignalProvider>,
}

/// How a missing local signal is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalMode {
    /// Score without it and flag the result.
    Lenient,
    /// Fail the computation so the caller can retry.
    Required,
}

/// Inputs shared by every horizon of one symbol.
#[derive(Debug, Clone)]
struct Gathered {
    symbol: String,
    current_price: f64,
    asian: RegionalAggregate,
    european: RegionalAggregate,
    local_signal: Option<LocalSignal>,
}

impl Gathered {
    fn input(&self, horizon: Horizon) -> PredictionInput {
        PredictionInput {
            symbol: self.symbol.clone(),
            horizon,
            current_price: self.current_price,
            asian: self.asian.clone(),
            european: self.european.clone(),
            local_signal: self.local_signal.clone(),
        }
    }
}

pub struct PredictionService {
    config: CalibrationConfig,
    settings: EngineSettings,
    cache: PredictionCache,
    quotes: Arc<dyn RegionalQuoteProvider>,
    prices: Arc<dyn PriceHistoryProvider>,
    signals: Arc<dyn LocalSignalProvider>,
}

impl std::fmt::Debug for PredictionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionService")
            .field("config", &self.config.fingerprint())
            .field("settings", &self.settings)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl PredictionService {
    /// Validates both configurations once; an invalid one is never served.
    pub fn new(
        config: CalibrationConfig,
        settings: EngineSettings,
        store: Arc<dyn CacheStore>,
        providers: Providers,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        settings.validate()?;
        Ok(Self {
            config,
            settings,
            cache: PredictionCache::new(store),
            quotes: providers.quotes,
            prices: providers.prices,
            signals: providers.signals,
        })
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn cache(&self) -> &PredictionCache {
        &self.cache
    }

    /// Cache lifetime of a prediction for `horizon`.
    pub fn ttl(&self, horizon: Horizon) -> Duration {
        Duration::from_secs(self.config.horizons.get(horizon).ttl_secs)
    }

    // ─── Serving ─────────────────────────────────────────────────────

    /// Cache-fronted prediction for one (symbol, horizon).
    pub fn get_prediction(
        &self,
        symbol: &str,
        horizon: Horizon,
    ) -> Result<PredictionResult, EngineError> {
        let symbol = canonical_symbol(symbol)?;
        let key = prediction_key(&symbol, horizon);
        self.cache.get_or_compute(&key, self.ttl(horizon), || {
            self.compute(&symbol, horizon, SignalMode::Lenient)
        })
    }

    /// Uncached prediction for one horizon.
    pub fn compute(
        &self,
        symbol: &str,
        horizon: Horizon,
        mode: SignalMode,
    ) -> Result<PredictionResult, EngineError> {
        let gathered = self.gather(symbol, mode)?;
        let aggregator = PredictionAggregator::new(&self.config);
        Ok(aggregator.aggregate(&gathered.input(horizon))?)
    }

    /// Uncached predictions for every horizon from one round of provider calls.
    pub fn compute_all_horizons(
        &self,
        symbol: &str,
        mode: SignalMode,
    ) -> Result<Vec<PredictionResult>, EngineError> {
        let gathered = self.gather(symbol, mode)?;
        let aggregator = PredictionAggregator::new(&self.config);
        Horizon::ALL
            .iter()
            .map(|&horizon| {
                aggregator
                    .aggregate(&gathered.input(horizon))
                    .map_err(EngineError::from)
            })
            .collect()
    }

    /// Store a freshly computed prediction, replacing any cached one.
    pub fn cache_prediction(&self, result: &PredictionResult) -> Result<(), EngineError> {
        let key = prediction_key(&result.symbol, result.horizon);
        self.cache.put(&key, self.ttl(result.horizon), result)
    }

    /// Detect a rebound for `symbol` as of `date`. Uncached.
    pub fn detect_rebound(&self, symbol: &str, date: NaiveDate) -> Result<ReboundEvent, EngineError> {
        let symbol = canonical_symbol(symbol)?;
        let snapshot = self
            .fetch_snapshot(&symbol)
            .map_err(|e| EngineError::provider(&symbol, e))?;
        Ok(ReboundDetector::new(&self.config).detect(&snapshot, date)?)
    }

    // ─── Invalidation ────────────────────────────────────────────────

    pub fn invalidate_prediction(&self, symbol: &str, horizon: Horizon) {
        let key = prediction_key(symbol, horizon);
        if let Err(e) = self.cache.invalidate(&key) {
            tracing::warn!(key = %key, error = %e, "cache invalidation failed");
        }
    }

    /// Drop every horizon's prediction for `symbol`.
    pub fn invalidate_symbol(&self, symbol: &str) {
        for horizon in Horizon::ALL {
            self.invalidate_prediction(symbol, horizon);
        }
    }

    /// Drop the regional aggregates every prediction depends on.
    pub fn invalidate_regions(&self) {
        for region in Region::ALL {
            let key = regional_key(region, self.config.regions.for_region(region));
            if let Err(e) = self.cache.invalidate(&key) {
                tracing::warn!(key = %key, error = %e, "cache invalidation failed");
            }
        }
    }

    // ─── Inputs ──────────────────────────────────────────────────────

    fn gather(&self, symbol: &str, mode: SignalMode) -> Result<Gathered, EngineError> {
        let symbol = canonical_symbol(symbol)?;
        let local_signal = self.fetch_local(&symbol, mode)?;
        let current_price = match self.fetch_snapshot(&symbol) {
            Ok(snapshot) => snapshot.current_price,
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "price unavailable");
                0.0
            }
        };
        Ok(Gathered {
            asian: self.regional_aggregate(Region::Asian),
            european: self.regional_aggregate(Region::European),
            symbol,
            current_price,
            local_signal,
        })
    }

    /// Cached regional aggregate. Never fails: a provider fault yields a
    /// neutral aggregate, which is not cached.
    pub fn regional_aggregate(&self, region: Region) -> RegionalAggregate {
        let table = self.config.regions.for_region(region);
        let key = regional_key(region, table);
        let fetched = self.cache.get_or_compute(&key, self.settings.regional_ttl(), || {
            let provider = Arc::clone(&self.quotes);
            let quotes = call_with_timeout("quotes", self.settings.provider_timeout(), move || {
                provider.fetch(region)
            })
            .map_err(|e| EngineError::provider(region.as_str(), provider_fault("regional-quotes", e)))?;
            Ok(RegionalNormalizer::new(&self.config).normalize(region, &quotes))
        });
        match fetched {
            Ok(aggregate) => aggregate,
            Err(e) => {
                tracing::warn!(region = %region, error = %e, "regional data unavailable, using neutral");
                RegionalAggregate::neutral(region, table.markets.len())
            }
        }
    }

    fn fetch_local(&self, symbol: &str, mode: SignalMode) -> Result<Option<LocalSignal>, EngineError> {
        let provider = Arc::clone(&self.signals);
        let owned = symbol.to_string();
        let outcome = call_with_timeout("local-signal", self.settings.provider_timeout(), move || {
            provider.compute(&owned)
        })
        .map_err(|e| provider_fault("local-signal", e))
        .and_then(|computed| computed);

        match (outcome, mode) {
            (Ok(signal), _) => Ok(Some(signal)),
            (Err(e), SignalMode::Lenient) => {
                tracing::warn!(symbol, error = %e, "local signal unavailable, scoring without it");
                Ok(None)
            }
            (Err(e), SignalMode::Required) => Err(EngineError::provider(symbol, e)),
        }
    }

    fn fetch_snapshot(&self, symbol: &str) -> Result<PriceDeltaSnapshot, ProviderError> {
        let provider = Arc::clone(&self.prices);
        let owned = symbol.to_string();
        call_with_timeout("price-history", self.settings.provider_timeout(), move || {
            provider.deltas(&owned)
        })
        .map_err(|e| provider_fault("price-history", e))
        .and_then(|deltas| deltas)
    }
}

fn canonical_symbol(symbol: &str) -> Result<String, EngineError> {
    let canonical = symbol.trim().to_ascii_uppercase();
    if canonical.is_empty() {
        return Err(ScoringError::malformed(symbol, "symbol is empty").into());
    }
    Ok(canonical)
}

fn provider_fault(provider: &str, err: CallError) -> ProviderError {
    match err {
        CallError::TimedOut(after) => ProviderError::Timeout {
            provider: provider.to_string(),
            after_ms: after.as_millis() as u64,
        },
        other => ProviderError::Unavailable {
            provider: provider.to_string(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{StaticLocalSignals, StaticPriceHistory, StaticQuotes};
    use crate::store::MemoryStore;
    use chrono::Utc;
    use pulsecast_core::domain::{DataFlag, MarketQuote};

    struct SlowSignals;

    impl LocalSignalProvider for SlowSignals {
        fn compute(&self, _symbol: &str) -> Result<LocalSignal, ProviderError> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(LocalSignal::new(0.5, 0.5, 0.5))
        }
    }

    fn quote(symbol: &str, region: Region, change: f64) -> MarketQuote {
        MarketQuote {
            market_symbol: symbol.into(),
            region,
            change_percent: change,
            is_valid: true,
            fetched_at: Utc::now(),
        }
    }

    fn snapshot(symbol: &str, price: f64) -> PriceDeltaSnapshot {
        PriceDeltaSnapshot {
            symbol: symbol.into(),
            change_1d_pct: 0.5,
            change_3d_pct: 0.0,
            change_7d_pct: 0.0,
            abs_drop_1d: 0.0,
            abs_drop_3d: 0.0,
            current_price: price,
            sentiment: 0.0,
            news_count: 0,
        }
    }

    fn settings() -> EngineSettings {
        EngineSettings {
            provider_timeout_ms: 100,
            ..EngineSettings::default()
        }
    }

    fn service_with(signals: Arc<dyn LocalSignalProvider>) -> PredictionService {
        let providers = Providers {
            quotes: Arc::new(StaticQuotes::new(vec![
                quote("^N225", Region::Asian, 1.0),
                quote("^FTSE", Region::European, 0.8),
            ])),
            prices: Arc::new(StaticPriceHistory::new([snapshot("AAPL", 200.0)])),
            signals,
        };
        PredictionService::new(
            CalibrationConfig::default(),
            settings(),
            Arc::new(MemoryStore::new()),
            providers,
        )
        .unwrap()
    }

    fn service() -> PredictionService {
        service_with(Arc::new(StaticLocalSignals::new([(
            "AAPL".to_string(),
            LocalSignal::new(0.4, 0.2, 0.3),
        )])))
    }

    #[test]
    fn second_read_is_a_cache_hit() {
        let svc = service();
        let first = svc.get_prediction("aapl", Horizon::Today).unwrap();
        let computed = svc.cache().computations();
        let second = svc.get_prediction("AAPL", Horizon::Today).unwrap();
        assert_eq!(first, second);
        assert_eq!(svc.cache().computations(), computed);
    }

    #[test]
    fn ttl_follows_horizon() {
        let svc = service();
        assert_eq!(svc.ttl(Horizon::Today), Duration::from_secs(60));
        assert_eq!(svc.ttl(Horizon::Week), Duration::from_secs(300));
    }

    #[test]
    fn slow_local_signal_degrades_when_lenient() {
        let svc = service_with(Arc::new(SlowSignals));
        let result = svc.get_prediction("AAPL", Horizon::Today).unwrap();
        assert!(result.flags.contains(&DataFlag::LocalSignalMissing));
    }

    #[test]
    fn slow_local_signal_fails_when_required() {
        let svc = service_with(Arc::new(SlowSignals));
        let err = svc
            .compute("AAPL", Horizon::Today, SignalMode::Required)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Provider {
                source: ProviderError::Timeout { .. },
                ..
            }
        ));
    }

    #[test]
    fn unknown_price_flags_result() {
        let svc = service_with(Arc::new(StaticLocalSignals::new([(
            "MSFT".to_string(),
            LocalSignal::new(0.1, 0.1, 0.1),
        )])));
        let result = svc.get_prediction("MSFT", Horizon::Week).unwrap();
        assert!(result.flags.contains(&DataFlag::PriceUnavailable));
        assert_eq!(result.predicted_price, None);
    }

    #[test]
    fn empty_symbol_is_malformed() {
        let svc = service();
        assert!(matches!(
            svc.get_prediction("  ", Horizon::Today),
            Err(EngineError::Scoring(_))
        ));
    }

    #[test]
    fn all_horizons_share_one_round_of_inputs() {
        let svc = service();
        let results = svc.compute_all_horizons("AAPL", SignalMode::Required).unwrap();
        assert_eq!(results.len(), Horizon::ALL.len());
        assert!(results.iter().all(|r| r.symbol == "AAPL"));
    }

    #[test]
    fn invalidate_symbol_forces_recompute() {
        let svc = service();
        svc.get_prediction("AAPL", Horizon::Today).unwrap();
        let before = svc.cache().computations();
        svc.invalidate_symbol("AAPL");
        svc.get_prediction("AAPL", Horizon::Today).unwrap();
        assert_eq!(svc.cache().computations(), before + 1);
    }

    #[test]
    fn unbounded_ttl_rejected_and_longest_ttl_serves() {
        let providers = || Providers {
            quotes: Arc::new(StaticQuotes::default()),
            prices: Arc::new(StaticPriceHistory::new([snapshot("AAPL", 200.0)])),
            signals: Arc::new(StaticLocalSignals::default()),
        };

        let mut config = CalibrationConfig::default();
        config.horizons.today.ttl_secs = u64::MAX;
        let rejected = PredictionService::new(
            config.clone(),
            settings(),
            Arc::new(MemoryStore::new()),
            providers(),
        );
        assert!(matches!(rejected, Err(EngineError::Config(_))));

        config.horizons.today.ttl_secs = pulsecast_core::config::MAX_TTL_SECS;
        let svc = PredictionService::new(config, settings(), Arc::new(MemoryStore::new()), providers())
            .unwrap();
        let first = svc.get_prediction("AAPL", Horizon::Today).unwrap();
        let computed = svc.cache().computations();
        assert_eq!(svc.get_prediction("AAPL", Horizon::Today).unwrap(), first);
        assert_eq!(svc.cache().computations(), computed);
    }

    #[test]
    fn invalid_calibration_rejected() {
        let mut config = CalibrationConfig::default();
        config.aggregation.local_weight = 0.9;
        let providers = Providers {
            quotes: Arc::new(StaticQuotes::default()),
            prices: Arc::new(StaticPriceHistory::default()),
            signals: Arc::new(StaticLocalSignals::default()),
        };
        let result = PredictionService::new(
            config,
            EngineSettings::default(),
            Arc::new(MemoryStore::new()),
            providers,
        );
        assert!(matches!(result, Err(EngineError::Config(_))));
    }
}
