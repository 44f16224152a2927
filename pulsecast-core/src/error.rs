//! Structural faults raised by the scoring stages.
//!
//! Degraded-but-parseable input never produces an error; it produces a
//! low-confidence result with data flags. Only malformed input shapes land here.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("malformed input for {symbol}: {reason}")]
    MalformedInput { symbol: String, reason: String },
}

impl ScoringError {
    pub fn malformed(symbol: &str, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }
}
