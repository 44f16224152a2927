//! Pulsecast Runner: provider wiring, caching and regeneration.
//!
//! This crate builds on `pulsecast-core` to provide:
//! - Provider traits with timeout-bounded calls and in-memory implementations
//! - A single-flight prediction cache over any TTL store
//! - The cache-fronted prediction service
//! - Retried, timeout-bounded batch regeneration on a private worker pool
//! - Rebound-triggered regeneration, once per symbol per day
//! - CSV export and tracing setup

pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod orchestrator;
pub mod provider;
pub mod rebound_log;
pub mod retry;
pub mod service;
pub mod store;
pub mod timeout;

pub use cache::{component_key, prediction_key, regional_key, PredictionCache};
pub use config::EngineSettings;
pub use error::{EngineError, ProviderError, StoreError};
pub use logging::{init_logging, LogConfig, LogFormat};
pub use orchestrator::{RegenerationOrchestrator, RegenerationSummary, TaskFailure};
pub use provider::{
    FeatureLocalSignals, LocalSignalProvider, PriceHistoryProvider, RegionalQuoteProvider,
    StaticLocalSignals, StaticPriceHistory, StaticQuotes,
};
pub use rebound_log::{ReboundLog, RecordOutcome};
pub use retry::RetryPolicy;
pub use service::{PredictionService, Providers, SignalMode};
pub use store::{CacheStore, MemoryStore};
