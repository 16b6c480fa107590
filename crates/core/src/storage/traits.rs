use std::time::Duration;

use crate::errors::CoreError;
use crate::models::price::Series;

/// Short-lived in-process cache tier, consulted first on every path.
pub trait FastCache: Send + Sync {
    fn get_series(&self, key: &str) -> Option<Series>;

    fn set_series(&self, key: &str, series: Series, ttl: Duration);
}

/// Long-lived persistent cache tier.
///
/// Only the portfolio path reads from it; every path writes to it in the
/// background. It is a warm start across sessions, never a source of truth.
pub trait SlowCache: Send + Sync {
    fn get_series(&self, key: &str) -> Option<Series>;

    fn set_series(&self, key: &str, series: &Series, ttl: Duration) -> Result<(), CoreError>;
}
