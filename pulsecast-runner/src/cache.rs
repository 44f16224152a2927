//! Prediction cache: TTL-bound, single-flight, fronting any [`CacheStore`].
//!
//! `get_or_compute` gives an at-most-one-concurrent-computation guarantee per
//! key. The first caller to miss becomes the leader and computes; callers that
//! miss while the leader is running wait on the leader's flight and receive
//! its result. Errors are handed to waiters but never stored.
//!
//! A failing store never fails the caller: reads and writes that error are
//! logged and the value is computed live.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use pulsecast_core::config::{params_hash, RegionConfig};
use pulsecast_core::domain::{Horizon, Region};

use crate::error::{EngineError, StoreError};
use crate::store::CacheStore;

// ─── Keys ────────────────────────────────────────────────────────────

/// `prediction:{SYMBOL}:{horizon}`.
pub fn prediction_key(symbol: &str, horizon: Horizon) -> String {
    format!("prediction:{}:{}", symbol.trim().to_ascii_uppercase(), horizon)
}

/// `{component}:{endpoint}:{blake3(params)}` for parameterised entries.
pub fn component_key<T: Serialize + ?Sized>(component: &str, endpoint: &str, params: &T) -> String {
    format!("{component}:{endpoint}:{}", params_hash(params))
}

/// Regional aggregate key; changes whenever the region's calibration changes.
pub fn regional_key(region: Region, table: &RegionConfig) -> String {
    component_key("regional", region.as_str(), table)
}

// ─── Single flight ───────────────────────────────────────────────────

type FlightResult = Result<String, EngineError>;

#[derive(Default)]
struct Flight {
    result: Mutex<Option<FlightResult>>,
    done: Condvar,
}

impl Flight {
    fn publish(&self, result: FlightResult) {
        *lock(&self.result) = Some(result);
        self.done.notify_all();
    }

    fn wait(&self) -> FlightResult {
        let mut slot = lock(&self.result);
        loop {
            if let Some(result) = slot.as_ref() {
                return result.clone();
            }
            slot = self
                .done
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

enum Role {
    Leader(Arc<Flight>),
    Follower(Arc<Flight>),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Publishes an error to waiters if the leader unwinds before publishing.
struct LeaderGuard<'a> {
    cache: &'a PredictionCache,
    key: &'a str,
    flight: Arc<Flight>,
    published: bool,
}

impl LeaderGuard<'_> {
    fn finish(mut self, result: FlightResult) {
        self.flight.publish(result);
        self.published = true;
        lock(&self.cache.flights).remove(self.key);
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.published {
            self.flight.publish(Err(EngineError::Computation(format!(
                "computation for {} panicked",
                self.key
            ))));
            lock(&self.cache.flights).remove(self.key);
        }
    }
}

// ─── Cache ───────────────────────────────────────────────────────────

pub struct PredictionCache {
    store: Arc<dyn CacheStore>,
    flights: Mutex<HashMap<String, Arc<Flight>>>,
    computations: AtomicUsize,
}

impl PredictionCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            flights: Mutex::new(HashMap::new()),
            computations: AtomicUsize::new(0),
        }
    }

    /// Underlying computations run so far (hits and joined flights excluded).
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::SeqCst)
    }

    /// Return the cached value for `key`, or compute it once and cache it for `ttl`.
    pub fn get_or_compute<T, F>(&self, key: &str, ttl: Duration, compute: F) -> Result<T, EngineError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, EngineError>,
    {
        match self.read(key) {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(key, error = %e, "cache unavailable, computing live");
                return self.run(compute);
            }
        }

        let role = {
            let mut flights = lock(&self.flights);
            // A leader may have finished between the miss above and this lock.
            if let Ok(Some(value)) = self.read(key) {
                return Ok(value);
            }
            match flights.get(key) {
                Some(existing) => Role::Follower(Arc::clone(existing)),
                None => {
                    let flight = Arc::new(Flight::default());
                    flights.insert(key.to_string(), Arc::clone(&flight));
                    Role::Leader(flight)
                }
            }
        };

        match role {
            Role::Leader(flight) => self.lead(key, ttl, flight, compute),
            Role::Follower(flight) => {
                tracing::trace!(key, "joining in-flight computation");
                let json = flight.wait()?;
                Ok(serde_json::from_str(&json)?)
            }
        }
    }

    /// Compute as leader. The leader returns the decoded cached form too, so
    /// every caller of a key observes bit-identical values.
    fn lead<T, F>(&self, key: &str, ttl: Duration, flight: Arc<Flight>, compute: F) -> Result<T, EngineError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, EngineError>,
    {
        let guard = LeaderGuard {
            cache: self,
            key,
            flight,
            published: false,
        };
        let encoded = self
            .run(compute)
            .and_then(|value| Ok(serde_json::to_string(&value)?));
        match encoded {
            Ok(json) => {
                if let Err(e) = self.store.put(key, json.clone(), ttl) {
                    tracing::warn!(key, error = %e, "cache write failed");
                }
                guard.finish(Ok(json.clone()));
                Ok(serde_json::from_str(&json)?)
            }
            Err(e) => {
                guard.finish(Err(e.clone()));
                Err(e)
            }
        }
    }

    /// Store `value` under `key`, replacing any cached value (last write wins).
    pub fn put<T: Serialize>(&self, key: &str, ttl: Duration, value: &T) -> Result<(), EngineError> {
        let json = serde_json::to_string(value)?;
        if let Err(e) = self.store.put(key, json, ttl) {
            tracing::warn!(key, error = %e, "cache write failed");
        }
        Ok(())
    }

    /// Drop `key`. Idempotent; a missing key is not an error.
    pub fn invalidate(&self, key: &str) -> Result<(), StoreError> {
        self.store.forget(key)
    }

    /// Cached value if present and decodable. Undecodable entries are dropped.
    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(json) = self.store.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&json) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, error = %e, "dropping undecodable cache entry");
                self.store.forget(key)?;
                Ok(None)
            }
        }
    }

    fn run<T, F>(&self, compute: F) -> Result<T, EngineError>
    where
        F: FnOnce() -> Result<T, EngineError>,
    {
        self.computations.fetch_add(1, Ordering::SeqCst);
        compute()
    }
}

impl std::fmt::Debug for PredictionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionCache")
            .field("in_flight", &lock(&self.flights).len())
            .field("computations", &self.computations())
            .finish()
    }
}
