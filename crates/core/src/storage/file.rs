use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::errors::CoreError;
use crate::models::price::Series;

use super::format;
use super::traits::SlowCache;

const FILE_EXTENSION: &str = "cache";

/// Distinguishes temp files of writes that overlap on the same key.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// File-backed cache: one entry file per key under a single directory.
///
/// Flow: value → bincode → CCHE entry (expiry in header) → `<dir>/<key>.cache`
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Open (and create if needed) a cache directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read and decode the entry for `key`.
    ///
    /// Missing, expired and unreadable entries are all misses. Expired
    /// entry files are removed on the way out.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path_for(key);
        let bytes = std::fs::read(&path).ok()?;

        match Self::decode(&bytes) {
            Ok(Some(value)) => Some(value),
            Ok(None) => {
                debug!(key, "persistent cache entry expired");
                let _ = std::fs::remove_file(&path);
                None
            }
            Err(e) => {
                debug!(key, error = %e, "unreadable persistent cache entry");
                None
            }
        }
    }

    /// Encode `value` and write it with an expiry `ttl` from now.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<(), CoreError> {
        let payload = bincode::serialize(value)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize cache entry: {e}")))?;
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = Utc::now().timestamp().saturating_add(ttl_secs);
        let bytes = format::write_entry(format::CURRENT_VERSION, expires_at, &payload);

        // Write then rename so concurrent readers never see a half-written file.
        // Each write gets its own temp file; the last rename wins.
        let path = self.path_for(key);
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("{}.{seq}.tmp", std::process::id()));
        std::fs::write(&tmp, bytes)?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), CoreError> {
        match std::fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<Option<T>, CoreError> {
        let (header, payload) = format::read_entry(bytes)?;
        if header.expires_at <= Utc::now().timestamp() {
            return Ok(None);
        }
        let value = bincode::deserialize(payload)
            .map_err(|e| CoreError::Deserialization(format!("Failed to deserialize cache entry: {e}")))?;
        Ok(Some(value))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.{FILE_EXTENSION}"))
    }
}

impl SlowCache for FileCache {
    fn get_series(&self, key: &str) -> Option<Series> {
        self.get::<Series>(key)
    }

    fn set_series(&self, key: &str, series: &Series, ttl: Duration) -> Result<(), CoreError> {
        self.set(key, series, ttl)
    }
}
