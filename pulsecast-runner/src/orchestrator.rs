//! Regeneration orchestrator: targeted invalidation, retried recomputation and
//! batch fan-out over a private worker pool.
//!
//! Each regeneration is a task: it runs under the retry policy, every attempt
//! bounded by the task timeout. A task that exhausts its attempts becomes one
//! [`TaskFailure`] in the batch summary and never aborts its siblings.
//!
//! Rebound-triggered regeneration goes through the same task path, at most
//! once per (symbol, day), gated by the [`ReboundLog`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use pulsecast_core::domain::{Horizon, PredictionResult};
use pulsecast_core::ReboundEvent;

use crate::error::EngineError;
use crate::rebound_log::{ReboundLog, RecordOutcome};
use crate::retry::{run_with_retry, Attempted};
use crate::service::{PredictionService, SignalMode};
use crate::timeout::{call_with_timeout, CallError};

// ─── Summary ─────────────────────────────────────────────────────────

/// One stock that still failed after every retry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub symbol: String,
    pub attempts: u32,
    pub error: String,
}

/// Outcome of a batch regeneration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegenerationSummary {
    /// Symbols regenerated successfully, sorted.
    pub succeeded: Vec<String>,
    /// Failures sorted by symbol.
    pub failed: Vec<TaskFailure>,
    pub elapsed_ms: u64,
}

impl RegenerationSummary {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

// ─── Orchestrator ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RegenerationOrchestrator {
    service: Arc<PredictionService>,
    rebounds: Arc<Mutex<ReboundLog>>,
}

impl RegenerationOrchestrator {
    pub fn new(service: Arc<PredictionService>) -> Self {
        let retention = service.config().rebound.retention_days;
        Self {
            service,
            rebounds: Arc::new(Mutex::new(ReboundLog::new(retention))),
        }
    }

    pub fn service(&self) -> &PredictionService {
        &self.service
    }

    /// Positive rebound events recorded so far, ordered by day then symbol.
    pub fn rebound_events(&self) -> Vec<ReboundEvent> {
        self.rebound_log().events().cloned().collect()
    }

    fn rebound_log(&self) -> MutexGuard<'_, ReboundLog> {
        self.rebounds.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Invalidate every cached prediction of `symbol` plus the regional
    /// aggregates, then recompute and repopulate. Returns the `today` result.
    pub fn regenerate_one(&self, symbol: &str) -> Result<PredictionResult, EngineError> {
        self.service.invalidate_symbol(symbol);
        self.service.invalidate_regions();
        self.run_task(symbol).result
    }

    /// Regenerate every symbol of `universe` on the worker pool.
    ///
    /// Blank and duplicate symbols are dropped. Regional aggregates are
    /// invalidated once for the whole batch.
    pub fn regenerate_all(&self, universe: &[String]) -> RegenerationSummary {
        let started = Instant::now();
        let mut symbols: Vec<String> = universe
            .iter()
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        symbols.sort();
        symbols.dedup();

        tracing::info!(stocks = symbols.len(), "batch regeneration started");
        self.service.invalidate_regions();

        let regenerate = |symbol: &String| {
            self.service.invalidate_symbol(symbol);
            (symbol.clone(), self.run_task(symbol))
        };
        let workers = self.service.settings().workers;
        let outcomes: Vec<(String, Attempted<PredictionResult>)> =
            match rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("pulsecast-regen-{i}"))
                .build()
            {
                Ok(pool) => pool.install(|| symbols.par_iter().map(regenerate).collect()),
                Err(e) => {
                    tracing::warn!(error = %e, "worker pool unavailable, regenerating sequentially");
                    symbols.iter().map(regenerate).collect()
                }
            };

        let mut summary = RegenerationSummary::default();
        for (symbol, outcome) in outcomes {
            match outcome.result {
                Ok(_) => summary.succeeded.push(symbol),
                Err(e) => summary.failed.push(TaskFailure {
                    symbol,
                    attempts: outcome.attempts,
                    error: e.to_string(),
                }),
            }
        }
        summary.succeeded.sort();
        summary.failed.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        summary.elapsed_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            succeeded = summary.succeeded.len(),
            failed = summary.failed.len(),
            elapsed_ms = summary.elapsed_ms,
            "batch regeneration finished"
        );
        summary
    }

    /// Run rebound detection for `symbol` as of today (UTC).
    pub fn check_rebound(&self, symbol: &str) -> Result<Option<ReboundEvent>, EngineError> {
        self.check_rebound_on(symbol, Utc::now().date_naive())
    }

    /// Run rebound detection for `symbol` as of `date`.
    ///
    /// A positive event that is the first for its (symbol, day) invalidates
    /// the symbol's `today` prediction and the regional aggregates, then
    /// regenerates immediately. A failed regeneration is logged; the event is
    /// still returned. Repeat and stale (before the retention window) events
    /// are returned without regenerating. Returns `None` when no rebound was
    /// detected.
    pub fn check_rebound_on(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<ReboundEvent>, EngineError> {
        let event = self.service.detect_rebound(symbol, date)?;
        if !event.is_positive() {
            return Ok(None);
        }

        let outcome = self.rebound_log().record(event.clone());
        match outcome {
            RecordOutcome::Recorded => {}
            RecordOutcome::AlreadyHandled => {
                tracing::debug!(symbol = %event.symbol, %date, "rebound already handled for this day");
                return Ok(Some(event));
            }
            RecordOutcome::Stale => {
                tracing::warn!(
                    symbol = %event.symbol,
                    %date,
                    "rebound dated before the retention window, not regenerating"
                );
                return Ok(Some(event));
            }
            RecordOutcome::NotPositive => return Ok(None),
        }

        tracing::info!(
            symbol = %event.symbol,
            %date,
            rebound_type = %event.rebound_type,
            confidence = event.confidence,
            patterns = %event.pattern_list(),
            "rebound detected, regenerating"
        );
        self.service.invalidate_prediction(&event.symbol, Horizon::Today);
        self.service.invalidate_regions();
        if let Err(e) = self.run_task(&event.symbol).result {
            tracing::error!(symbol = %event.symbol, error = %e, "rebound regeneration failed");
        }
        Ok(Some(event))
    }

    // ─── Tasks ───────────────────────────────────────────────────────

    /// One regeneration task: retried, each attempt bounded by the task timeout.
    fn run_task(&self, symbol: &str) -> Attempted<PredictionResult> {
        let policy = &self.service.settings().retry;
        let timeout = policy.task_timeout();
        let outcome = run_with_retry(policy, symbol, |attempt| {
            tracing::debug!(symbol, attempt, "regeneration attempt");
            let worker = self.clone();
            let owned = symbol.to_string();
            call_with_timeout("regen", timeout, move || worker.regenerate_symbol(&owned))
                .map_err(|e| match e {
                    CallError::TimedOut(_) => EngineError::TaskTimeout {
                        symbol: symbol.to_string(),
                        secs: timeout.as_secs(),
                    },
                    other => EngineError::Computation(format!("regeneration of {symbol}: {other}")),
                })
                .and_then(|regenerated| regenerated)
        });
        if let Err(e) = &outcome.result {
            tracing::error!(
                symbol,
                attempts = outcome.attempts,
                error = %e,
                "regeneration failed after retries"
            );
        }
        outcome
    }

    /// Recompute every horizon and repopulate the cache. Returns `today`.
    fn regenerate_symbol(&self, symbol: &str) -> Result<PredictionResult, EngineError> {
        let mut today = None;
        for result in self
            .service
            .compute_all_horizons(symbol, SignalMode::Required)?
        {
            self.service.cache_prediction(&result)?;
            if result.horizon == Horizon::Today {
                today = Some(result);
            }
        }
        today.ok_or_else(|| EngineError::Computation(format!("no today prediction for {symbol}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineSettings;
    use crate::error::ProviderError;
    use crate::provider::{LocalSignalProvider, StaticLocalSignals, StaticPriceHistory, StaticQuotes};
    use crate::retry::RetryPolicy;
    use crate::service::Providers;
    use crate::store::MemoryStore;
    use pulsecast_core::domain::{LocalSignal, MarketQuote, PriceDeltaSnapshot, Region};
    use pulsecast_core::CalibrationConfig;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` calls, then succeeds.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    impl LocalSignalProvider for Flaky {
        fn compute(&self, symbol: &str) -> Result<LocalSignal, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(ProviderError::Unavailable {
                    provider: "flaky".into(),
                    reason: format!("call {call} for {symbol}"),
                })
            } else {
                Ok(LocalSignal::new(0.3, 0.1, 0.2))
            }
        }
    }

    fn settings() -> EngineSettings {
        EngineSettings {
            provider_timeout_ms: 200,
            workers: 2,
            retry: RetryPolicy {
                initial_backoff_ms: 1,
                max_backoff_ms: 5,
                jitter_pct: 0.0,
                task_timeout_secs: 5,
                ..RetryPolicy::default()
            },
            ..EngineSettings::default()
        }
    }

    fn snapshot(symbol: &str) -> PriceDeltaSnapshot {
        PriceDeltaSnapshot {
            symbol: symbol.into(),
            change_1d_pct: 0.2,
            change_3d_pct: 0.1,
            change_7d_pct: 0.3,
            abs_drop_1d: 0.0,
            abs_drop_3d: 0.0,
            current_price: 100.0,
            sentiment: 0.0,
            news_count: 0,
        }
    }

    fn orchestrator(signals: Arc<dyn LocalSignalProvider>) -> RegenerationOrchestrator {
        let providers = Providers {
            quotes: Arc::new(StaticQuotes::new(vec![MarketQuote {
                market_symbol: "^FTSE".into(),
                region: Region::European,
                change_percent: 0.6,
                is_valid: true,
                fetched_at: Utc::now(),
            }])),
            prices: Arc::new(StaticPriceHistory::new([
                snapshot("AAPL"),
                snapshot("MSFT"),
                PriceDeltaSnapshot {
                    abs_drop_1d: 9.41,
                    current_price: 183.16,
                    ..snapshot("NVDA")
                },
            ])),
            signals,
        };
        let service = PredictionService::new(
            CalibrationConfig::default(),
            settings(),
            Arc::new(MemoryStore::new()),
            providers,
        )
        .unwrap();
        RegenerationOrchestrator::new(Arc::new(service))
    }

    #[test]
    fn transient_failures_are_retried() {
        let orch = orchestrator(Arc::new(Flaky {
            failures: 2,
            calls: AtomicU32::new(0),
        }));
        let result = orch.regenerate_one("AAPL").unwrap();
        assert_eq!(result.horizon, Horizon::Today);
        assert_eq!(result.symbol, "AAPL");
    }

    #[test]
    fn regenerate_one_populates_every_horizon() {
        let orch = orchestrator(Arc::new(StaticLocalSignals::new([(
            "AAPL".to_string(),
            LocalSignal::new(0.3, 0.1, 0.2),
        )])));
        orch.regenerate_one("AAPL").unwrap();
        let before = orch.service().cache().computations();
        for horizon in Horizon::ALL {
            orch.service().get_prediction("AAPL", horizon).unwrap();
        }
        assert_eq!(orch.service().cache().computations(), before);
    }

    #[test]
    fn missing_signal_fails_after_all_attempts() {
        let orch = orchestrator(Arc::new(StaticLocalSignals::default()));
        let summary = orch.regenerate_all(&["AAPL".to_string()]);
        assert!(summary.succeeded.is_empty());
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].attempts, 3);
    }

    #[test]
    fn universe_is_deduplicated() {
        let orch = orchestrator(Arc::new(StaticLocalSignals::new([
            ("AAPL".to_string(), LocalSignal::new(0.3, 0.1, 0.2)),
            ("MSFT".to_string(), LocalSignal::new(-0.3, 0.0, 0.1)),
        ])));
        let universe = ["aapl", "AAPL ", "MSFT", ""].map(String::from);
        let summary = orch.regenerate_all(&universe);
        assert_eq!(summary.succeeded, vec!["AAPL".to_string(), "MSFT".to_string()]);
        assert!(summary.is_clean());
        assert_eq!(summary.total(), 2);
    }

    #[test]
    fn back_dated_rebound_is_stale_and_not_regenerated() {
        let orch = orchestrator(Arc::new(StaticLocalSignals::new([(
            "NVDA".to_string(),
            LocalSignal::new(0.3, 0.1, 0.2),
        )])));
        let recent = NaiveDate::from_ymd_opt(2024, 3, 30).unwrap();
        let stale = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();

        assert!(orch.check_rebound_on("NVDA", recent).unwrap().is_some());
        let computed = orch.service().cache().computations();

        let event = orch.check_rebound_on("NVDA", stale).unwrap();
        assert!(event.is_some_and(|e| e.is_positive()));
        assert_eq!(orch.service().cache().computations(), computed);
        assert_eq!(orch.rebound_events().len(), 1);
        assert_eq!(orch.rebound_events()[0].date, recent);
    }

    #[test]
    fn flat_stock_has_no_rebound() {
        let orch = orchestrator(Arc::new(StaticLocalSignals::default()));
        let found = orch
            .check_rebound_on("AAPL", NaiveDate::from_ymd_opt(2024, 3, 4).unwrap())
            .unwrap();
        assert!(found.is_none());
        assert!(orch.rebound_events().is_empty());
    }
}
