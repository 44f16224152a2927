//! Cache backend: get/put/forget with TTL over serialized values.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::StoreError;

/// Key-value store with per-entry expiry. Values are JSON strings so any
/// backend (in-process, shared) can hold them.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError>;
    /// Remove `key`. Forgetting a missing key is not an error.
    fn forget(&self, key: &str) -> Result<(), StoreError>;
}

/// One stored value and its expiry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub value: String,
    /// `None` when the TTL reaches past the clock's range.
    pub expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// In-process store. Expired entries are dropped lazily on read.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries().values().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        before - entries.len()
    }

    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries()
            .values()
            .filter(|e| e.is_live(now))
            .map(|e| e.key.clone())
            .collect();
        keys.sort();
        keys
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        let entry = CacheEntry {
            key: key.to_string(),
            value,
            expires_at: Instant::now().checked_add(ttl),
        };
        self.entries().insert(key.to_string(), entry);
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<(), StoreError> {
        self.entries().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn put_then_get() {
        let store = MemoryStore::new();
        store.put("a", "1".into(), Duration::from_secs(60)).unwrap();
        assert_eq!(store.get("a").unwrap(), Some("1".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn expired_entry_is_a_miss() {
        let store = MemoryStore::new();
        store.put("a", "1".into(), Duration::from_millis(10)).unwrap();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(store.get("a").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn unbounded_ttl_never_expires() {
        let store = MemoryStore::new();
        store.put("a", "1".into(), Duration::MAX).unwrap();
        assert_eq!(store.get("a").unwrap(), Some("1".to_string()));
        assert_eq!(store.purge_expired(), 0);
    }

    #[test]
    fn forget_is_idempotent() {
        let store = MemoryStore::new();
        store.put("a", "1".into(), Duration::from_secs(60)).unwrap();
        store.forget("a").unwrap();
        store.forget("a").unwrap();
        store.forget("never-set").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn purge_removes_only_expired() {
        let store = MemoryStore::new();
        store.put("short", "1".into(), Duration::from_millis(5)).unwrap();
        store.put("long", "2".into(), Duration::from_secs(60)).unwrap();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.keys(), vec!["long".to_string()]);
    }
}
