use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::models::price::Series;

use super::traits::FastCache;

struct MemoryEntry {
    value: Arc<dyn Any + Send + Sync>,
    expires_at: Instant,
}

/// In-process cache of arbitrary typed values with per-entry expiry.
///
/// Values are stored type-erased; `get::<T>` misses when the stored value
/// has a different type, the same as a missing key.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: Clone + Send + Sync + 'static>(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.get(key)?.expires_at <= Instant::now() {
            entries.remove(key);
            return None;
        }
        entries.get(key)?.value.downcast_ref::<T>().cloned()
    }

    pub fn set<T: Send + Sync + 'static>(&self, key: &str, value: T, ttl: Duration) {
        let entry = MemoryEntry {
            value: Arc::new(value),
            expires_at: Instant::now() + ttl,
        };
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), entry);
    }

    pub fn remove(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Number of entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.len())
            .finish()
    }
}

impl FastCache for MemoryCache {
    fn get_series(&self, key: &str) -> Option<Series> {
        self.get::<Series>(key)
    }

    /// Expired entries whose keys are never read again are dropped here.
    fn set_series(&self, key: &str, series: Series, ttl: Duration) {
        self.purge_expired();
        self.set(key, series, ttl);
    }
}
