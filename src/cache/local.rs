//! Local persistent cache
//!
//! Best-effort scoped key-value cache. Reads never fail: a missing,
//! unreadable or malformed entry reads as absent. Writes that fail are
//! logged and dropped.

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::CacheStorage;

/// A cached payload with its age information.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub key: String,
    pub payload: T,
    pub stored_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl<T> CacheEntry<T> {
    /// Whether the payload is still inside its freshness window at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.stored_at);
        match chrono::Duration::from_std(self.ttl) {
            Ok(ttl) => age < ttl,
            Err(_) => true,
        }
    }
}

/// Shared handle to the scoped cache. Cloning shares the same storage.
#[derive(Clone, Default)]
pub struct LocalCache {
    storage: Option<Arc<Mutex<CacheStorage>>>,
}

impl LocalCache {
    pub fn new(storage: Arc<Mutex<CacheStorage>>) -> Self {
        Self {
            storage: Some(storage),
        }
    }

    /// A cache that stores nothing (`--no-cache`).
    pub fn disabled() -> Self {
        Self { storage: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.storage.is_some()
    }

    /// Read and decode the entry under `key`.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let storage = self.storage.as_ref()?;
        let stored = {
            let guard = storage.lock().ok()?;
            match guard.get(key) {
                Ok(entry) => entry?,
                Err(e) => {
                    log::debug!("Cache read failed for {}: {}", key, e);
                    return None;
                }
            }
        };

        match serde_json::from_slice(&stored.data) {
            Ok(payload) => Some(CacheEntry {
                key: key.to_string(),
                payload,
                stored_at: stored.stored_at,
                ttl: stored.ttl,
            }),
            Err(e) => {
                log::debug!("Ignoring malformed cache entry {}: {}", key, e);
                None
            }
        }
    }

    /// Store `payload` under `key`, stamped with the current time.
    pub fn write<T: Serialize>(&self, key: &str, scope: Option<&str>, payload: &T, ttl: Duration) {
        let Some(storage) = self.storage.as_ref() else {
            return;
        };
        let json = match serde_json::to_vec(payload) {
            Ok(json) => json,
            Err(e) => {
                log::debug!("Skipping cache write for {}: {}", key, e);
                return;
            }
        };
        match storage.lock() {
            Ok(guard) => {
                if let Err(e) = guard.put(key, &json, scope, ttl) {
                    log::debug!("Cache write failed for {}: {}", key, e);
                }
            }
            Err(_) => log::debug!("Cache lock poisoned, dropping write for {}", key),
        }
    }

    /// Drop the entry under `key`.
    pub fn remove(&self, key: &str) {
        if let Some(storage) = self.storage.as_ref()
            && let Ok(guard) = storage.lock()
            && let Err(e) = guard.delete(key)
        {
            log::debug!("Cache delete failed for {}: {}", key, e);
        }
    }
}
