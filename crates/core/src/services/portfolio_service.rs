use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::errors::CoreError;
use crate::models::portfolio::{AssetRef, Holding};
use crate::models::price::Series;
use crate::models::range::TimeWindow;
use crate::models::settings::ChartSettings;
use crate::services::series_service::SeriesService;
use crate::storage::portfolio_cache_key;

/// Sums per-holding series into one portfolio value series.
///
/// Cache strategy per holding: fast tier → persistent tier → source.
/// A full miss waits `cold_fetch_delay` before calling the source, so a
/// cold portfolio does not burst the upstream API.
pub struct PortfolioService {
    series: Arc<SeriesService>,
    cold_fetch_delay: Duration,
}

impl PortfolioService {
    pub fn new(series: Arc<SeriesService>, settings: &ChartSettings) -> Self {
        Self {
            series,
            cold_fetch_delay: settings.cold_fetch_delay(),
        }
    }

    /// Holdings that take part in the chart: positive quantity, and the
    /// focused asset only when one is set.
    pub fn qualifying<'a>(holdings: &'a [Holding], focus: Option<&AssetRef>) -> Vec<&'a Holding> {
        holdings
            .iter()
            .filter(|h| focus.map_or(true, |f| h.matches(f)))
            .filter(|h| h.quantity > 0.0)
            .collect()
    }

    /// Portfolio value over `range`: each holding's series scaled by its
    /// quantity, summed by index position.
    ///
    /// Any holding's upstream failure aborts the whole aggregation.
    pub async fn aggregate(
        &self,
        holdings: &[Holding],
        focus: Option<&AssetRef>,
        range: &str,
    ) -> Result<Series, CoreError> {
        let window = self.series.window_for(range)?;
        let mut total = Series::new();

        for holding in Self::qualifying(holdings, focus) {
            let series = self.holding_series(holding, range, window).await?;
            total.accumulate(&series.scaled(holding.quantity));
        }

        Ok(total)
    }

    /// Unscaled price series for one holding.
    async fn holding_series(
        &self,
        holding: &Holding,
        range: &str,
        window: TimeWindow,
    ) -> Result<Series, CoreError> {
        let key = portfolio_cache_key(&holding.symbol, range);

        if let Some(cached) = self.series.fast_cache().get_series(&key) {
            debug!(key = %key, "soft cache hit");
            return Ok(cached);
        }

        let series = match self
            .series
            .slow_cache()
            .get_series(&key)
            .filter(|s| !s.is_empty())
        {
            Some(persisted) => {
                debug!(key = %key, "persistent cache hit");
                persisted
            }
            None => {
                tokio::time::sleep(self.cold_fetch_delay).await;
                debug!(symbol = %holding.symbol, range, "fetching holding series");
                self.series
                    .fetch(&holding.symbol, &holding.name, window)
                    .await?
            }
        };

        self.series.store(&key, &series);
        Ok(series)
    }
}
