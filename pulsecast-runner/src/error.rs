//! Error types for provider access, caching and regeneration.

use pulsecast_core::{ConfigError, ScoringError};
use thiserror::Error;

/// Failure of an external data provider call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("{provider} timed out after {after_ms} ms")]
    Timeout { provider: String, after_ms: u64 },

    #[error("{provider} unavailable: {reason}")]
    Unavailable { provider: String, reason: String },

    #[error("{provider} has no data for {symbol}")]
    NotFound { provider: String, symbol: String },
}

/// Cache backend failure. Callers bypass the cache rather than fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the engine. `Clone` so a single-flight leader can hand
/// its failure to every waiter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("scoring: {0}")]
    Scoring(#[from] ScoringError),

    #[error("provider call for {symbol} failed: {source}")]
    Provider {
        symbol: String,
        #[source]
        source: ProviderError,
    },

    #[error("regeneration of {symbol} exceeded {secs}s")]
    TaskTimeout { symbol: String, secs: u64 },

    #[error("computation failed: {0}")]
    Computation(String),

    #[error("cache value codec: {0}")]
    Codec(String),
}

impl EngineError {
    pub fn provider(symbol: &str, source: ProviderError) -> Self {
        Self::Provider {
            symbol: symbol.to_string(),
            source,
        }
    }

    /// Configuration faults never heal on retry.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, EngineError::Config(_))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Codec(e.to_string())
    }
}
