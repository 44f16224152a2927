//! Bounded-wait execution of blocking calls.
//!
//! The call runs on a dedicated named thread and the caller waits on a channel
//! with `recv_timeout`. A call that overruns is abandoned: its thread is
//! detached and its eventual result dropped, so the caller never blocks past
//! the deadline.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    TimedOut(Duration),
    /// The call panicked before producing a value.
    Panicked,
    /// The OS refused to spawn a thread.
    Spawn(String),
}

impl std::fmt::Display for CallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallError::TimedOut(after) => write!(f, "timed out after {} ms", after.as_millis()),
            CallError::Panicked => f.write_str("call panicked"),
            CallError::Spawn(reason) => write!(f, "failed to spawn call thread: {reason}"),
        }
    }
}

impl std::error::Error for CallError {}

/// Run `call` with an upper bound of `timeout` on the caller's wait.
pub fn call_with_timeout<T, F>(name: &str, timeout: Duration, call: F) -> Result<T, CallError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);
    thread::Builder::new()
        .name(format!("pulsecast-{name}"))
        .spawn(move || {
            // Receiver is gone when the caller already timed out.
            let _ = tx.send(call());
        })
        .map_err(|e| CallError::Spawn(e.to_string()))?;

    match rx.recv_timeout(timeout) {
        Ok(value) => Ok(value),
        Err(RecvTimeoutError::Timeout) => Err(CallError::TimedOut(timeout)),
        Err(RecvTimeoutError::Disconnected) => Err(CallError::Panicked),
    }
}
