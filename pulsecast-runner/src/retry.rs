//! Retry policy for regeneration tasks: bounded attempts, exponential backoff
//! with jitter, and a per-attempt timeout.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use pulsecast_core::ConfigError;

use crate::config::invalid;
use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_backoff_ms: u64,
    /// Fraction (0–1) of the backoff randomly added or removed.
    pub jitter_pct: f64,
    /// Wall-clock bound on a single attempt.
    pub task_timeout_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 1_000,
            backoff_multiplier: 2.0,
            max_backoff_ms: 30_000,
            jitter_pct: 0.2,
            task_timeout_secs: 60,
        }
    }
}

impl RetryPolicy {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }

    /// Backoff before retrying after failed attempt number `attempt` (1-based).
    pub fn backoff<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let base = (self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(exponent))
            .min(self.max_backoff_ms as f64);
        let jitter = if self.jitter_pct > 0.0 && base > 0.0 {
            base * rng.gen_range(-self.jitter_pct..=self.jitter_pct)
        } else {
            0.0
        };
        Duration::from_millis((base + jitter).max(0.0).round() as u64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(invalid("engine.retry.max_attempts", "must be >= 1"));
        }
        if !(self.backoff_multiplier.is_finite() && self.backoff_multiplier >= 1.0) {
            return Err(invalid("engine.retry.backoff_multiplier", "must be >= 1.0"));
        }
        if !(0.0..=1.0).contains(&self.jitter_pct) {
            return Err(invalid("engine.retry.jitter_pct", "must lie in [0, 1]"));
        }
        if self.task_timeout_secs == 0 {
            return Err(invalid("engine.retry.task_timeout_secs", "must be > 0"));
        }
        Ok(())
    }
}

/// Outcome of a retried operation.
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T, EngineError>,
    /// Attempts made, including the final one.
    pub attempts: u32,
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are exhausted. `op` receives the 1-based attempt number.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, label: &str, mut op: F) -> Attempted<T>
where
    F: FnMut(u32) -> Result<T, EngineError>,
{
    let mut rng = rand::thread_rng();
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => {
                return Attempted {
                    result: Ok(value),
                    attempts: attempt,
                }
            }
            Err(e) if attempt < policy.max_attempts && e.is_retryable() => {
                let delay = policy.backoff(attempt, &mut rng);
                tracing::warn!(
                    task = label,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "attempt failed, retrying"
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => {
                return Attempted {
                    result: Err(e),
                    attempts: attempt,
                }
            }
        }
    }
}
