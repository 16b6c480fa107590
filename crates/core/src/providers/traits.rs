use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::price::PricePoint;
use crate::models::range::TimeWindow;

/// Upstream source of historical chart data.
///
/// Either call may fail with a transport error (`CoreError::Network` or
/// `CoreError::Api`); the chart treats that as "no update this cycle".
#[async_trait]
pub trait PriceDataSource: Send + Sync {
    /// Human-readable name of this source (for logs/errors).
    fn name(&self) -> &str;

    /// Total market capitalization over `window`, in `currency` units.
    async fn global_series(
        &self,
        currency: &str,
        window: TimeWindow,
    ) -> Result<Vec<PricePoint>, CoreError>;

    /// Price history of one asset over `window`.
    async fn asset_series(
        &self,
        currency: &str,
        symbol: &str,
        name: &str,
        window: TimeWindow,
    ) -> Result<Vec<PricePoint>, CoreError>;
}
