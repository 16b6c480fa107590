use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::errors::CoreError;
use crate::models::price::Series;
use crate::models::range::{RangeRegistry, TimeWindow};
use crate::models::settings::ChartSettings;
use crate::providers::traits::PriceDataSource;
use crate::storage::traits::{FastCache, SlowCache};
use crate::storage::{cache_key, persist_in_background};

/// Market caps are charted in billions.
const GLOBAL_SCALE: f64 = 1e9;

/// Fetches chart series from the data source, fronted by the cache tiers.
///
/// Cache strategy on the single-asset path:
/// - **Fast tier only** is read. A miss (or an empty cached series) refetches.
/// - Every fetch is written to the fast tier and, in the background, to the
///   persistent tier for the next session.
pub struct SeriesService {
    source: Arc<dyn PriceDataSource>,
    fast: Arc<dyn FastCache>,
    slow: Arc<dyn SlowCache>,
    registry: RangeRegistry,
    currency: String,
    fast_ttl: Duration,
    slow_ttl: Duration,
}

impl SeriesService {
    pub fn new(
        source: Arc<dyn PriceDataSource>,
        fast: Arc<dyn FastCache>,
        slow: Arc<dyn SlowCache>,
        settings: &ChartSettings,
    ) -> Self {
        Self {
            source,
            fast,
            slow,
            registry: RangeRegistry::new(),
            currency: settings.currency.clone(),
            fast_ttl: settings.fast_cache_ttl(),
            slow_ttl: settings.slow_cache_ttl(),
        }
    }

    pub fn fast_cache(&self) -> &Arc<dyn FastCache> {
        &self.fast
    }

    pub fn slow_cache(&self) -> &Arc<dyn SlowCache> {
        &self.slow
    }

    /// Window for `range` ending now. "YTD" is recomputed on every call.
    pub fn window_for(&self, range: &str) -> Result<TimeWindow, CoreError> {
        self.registry.window_for(range, Utc::now())
    }

    /// Fetch one series straight from the source.
    ///
    /// An empty `symbol` means the global market: its capitalization series,
    /// converted to billions. Otherwise the asset's price series, unmodified.
    pub async fn fetch(&self, symbol: &str, name: &str, window: TimeWindow) -> Result<Series, CoreError> {
        if symbol.is_empty() {
            let points = self.source.global_series(&self.currency, window).await?;
            Ok(points.iter().map(|p| p.value / GLOBAL_SCALE).collect())
        } else {
            let points = self
                .source
                .asset_series(&self.currency, symbol, name, window)
                .await?;
            Ok(Series::from_points(&points))
        }
    }

    /// Series for the single-asset (or global) chart over `range`.
    ///
    /// Transport errors are returned untouched; nothing is cached for them.
    pub async fn chart_series(&self, symbol: &str, name: &str, range: &str) -> Result<Series, CoreError> {
        let window = self.window_for(range)?;
        let key = cache_key(symbol, range);

        if let Some(cached) = self.fast.get_series(&key).filter(|s| !s.is_empty()) {
            debug!(key = %key, "soft cache hit");
            return Ok(cached);
        }

        let series = self.fetch(symbol, name, window).await?;
        self.store(&key, &series);
        Ok(series)
    }

    /// Write to the fast tier now and to the persistent tier in the background.
    pub fn store(&self, key: &str, series: &Series) {
        self.fast.set_series(key, series.clone(), self.fast_ttl);
        persist_in_background(self.slow.clone(), key.to_string(), series.clone(), self.slow_ttl);
    }
}
