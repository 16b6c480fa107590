pub mod file;
pub mod format;
pub mod memory;
pub mod traits;

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::models::price::Series;
use crate::models::range::normalize_token;

use self::traits::SlowCache;

/// Key name used for the global market series.
pub const GLOBAL_KEY: &str = "globaldata";

/// Cache key for the single-asset (or global) chart path.
pub fn cache_key(symbol: &str, range: &str) -> String {
    let name = if symbol.is_empty() { GLOBAL_KEY } else { symbol };
    format!("{name}_{}", normalize_token(range))
}

/// Cache key for one holding's series on the portfolio path. Lower-cased.
pub fn portfolio_cache_key(symbol: &str, range: &str) -> String {
    format!("{symbol}_{}", normalize_token(range)).to_lowercase()
}

/// Write `series` to the persistent tier on a detached blocking task.
///
/// Nobody waits for the write; a failure is logged and dropped.
pub fn persist_in_background(slow: Arc<dyn SlowCache>, key: String, series: Series, ttl: Duration) {
    tokio::task::spawn_blocking(move || {
        if let Err(e) = slow.set_series(&key, &series, ttl) {
            debug!(key = %key, error = %e, "persistent cache write failed");
        }
    });
}
