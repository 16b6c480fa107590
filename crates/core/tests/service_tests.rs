// ═══════════════════════════════════════════════════════════════════
// Service Tests — SeriesService, PortfolioService, ChartService
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use coinchart_core::errors::CoreError;
use coinchart_core::models::portfolio::{AssetRef, Holding};
use coinchart_core::models::price::{PricePoint, Series};
use coinchart_core::models::range::TimeWindow;
use coinchart_core::models::settings::ChartSettings;
use coinchart_core::providers::traits::PriceDataSource;
use coinchart_core::services::chart_service::ChartService;
use coinchart_core::services::portfolio_service::PortfolioService;
use coinchart_core::services::series_service::SeriesService;
use coinchart_core::storage::memory::MemoryCache;
use coinchart_core::storage::traits::{FastCache, SlowCache};

// ═══════════════════════════════════════════════════════════════════
// Mocks
// ═══════════════════════════════════════════════════════════════════

/// Source serving fixed per-symbol price lists and a fixed global series.
struct MockSource {
    assets: HashMap<String, Vec<f64>>,
    global: Vec<f64>,
    fail: bool,
    asset_calls: AtomicUsize,
    global_calls: AtomicUsize,
    windows: Mutex<Vec<TimeWindow>>,
}

impl MockSource {
    fn new() -> Self {
        let mut assets = HashMap::new();
        assets.insert("BTC".to_string(), vec![100.0, 110.0, 120.0]);
        assets.insert("ETH".to_string(), vec![10.0, 20.0]);
        assets.insert("ONE".to_string(), vec![1.0, 1.0, 1.0]);
        Self {
            assets,
            global: vec![2.0e12, 2.5e12],
            fail: false,
            asset_calls: AtomicUsize::new(0),
            global_calls: AtomicUsize::new(0),
            windows: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    fn points(values: &[f64]) -> Vec<PricePoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| PricePoint::new(i as i64 * 60_000, *v))
            .collect()
    }
}

#[async_trait]
impl PriceDataSource for MockSource {
    fn name(&self) -> &str {
        "MockSource"
    }

    async fn global_series(
        &self,
        _currency: &str,
        window: TimeWindow,
    ) -> Result<Vec<PricePoint>, CoreError> {
        self.global_calls.fetch_add(1, Ordering::SeqCst);
        self.windows.lock().unwrap().push(window);
        if self.fail {
            return Err(CoreError::Network("connection refused".into()));
        }
        Ok(Self::points(&self.global))
    }

    async fn asset_series(
        &self,
        _currency: &str,
        symbol: &str,
        _name: &str,
        window: TimeWindow,
    ) -> Result<Vec<PricePoint>, CoreError> {
        self.asset_calls.fetch_add(1, Ordering::SeqCst);
        self.windows.lock().unwrap().push(window);
        if self.fail {
            return Err(CoreError::Api {
                provider: "MockSource".into(),
                message: "rate limited".into(),
            });
        }
        Ok(Self::points(self.assets.get(symbol).map(Vec::as_slice).unwrap_or(&[])))
    }
}

/// Persistent tier kept in memory; ttl is ignored.
#[derive(Default)]
struct MockSlowCache {
    entries: Mutex<HashMap<String, Series>>,
}

impl MockSlowCache {
    fn with(key: &str, series: Series) -> Self {
        let cache = Self::default();
        cache.entries.lock().unwrap().insert(key.to_string(), series);
        cache
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }
}

impl SlowCache for MockSlowCache {
    fn get_series(&self, key: &str) -> Option<Series> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set_series(&self, key: &str, series: &Series, _ttl: Duration) -> Result<(), CoreError> {
        self.entries.lock().unwrap().insert(key.to_string(), series.clone());
        Ok(())
    }
}

fn test_settings() -> ChartSettings {
    ChartSettings {
        cold_fetch_delay_ms: 0,
        ..ChartSettings::default()
    }
}

struct Fixture {
    source: Arc<MockSource>,
    fast: Arc<MemoryCache>,
    slow: Arc<MockSlowCache>,
    series: Arc<SeriesService>,
}

fn fixture_with(source: MockSource, slow: MockSlowCache) -> Fixture {
    let source = Arc::new(source);
    let fast = Arc::new(MemoryCache::new());
    let slow = Arc::new(slow);
    let series = Arc::new(SeriesService::new(
        source.clone(),
        fast.clone(),
        slow.clone(),
        &test_settings(),
    ));
    Fixture {
        source,
        fast,
        slow,
        series,
    }
}

fn fixture() -> Fixture {
    fixture_with(MockSource::new(), MockSlowCache::default())
}

/// Background persistence is fire-and-forget; poll until it lands.
async fn wait_for_persisted(slow: &MockSlowCache, key: &str) -> bool {
    for _ in 0..100 {
        if slow.contains(key) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

// ═══════════════════════════════════════════════════════════════════
// SeriesService — fetch
// ═══════════════════════════════════════════════════════════════════

mod series_fetch {
    use super::*;

    #[tokio::test]
    async fn empty_symbol_fetches_global_in_billions() {
        let fx = fixture();
        let window = fx.series.window_for("7D").unwrap();

        let series = fx.series.fetch("", "", window).await.unwrap();

        assert_eq!(series.values(), &[2000.0, 2500.0]);
        assert_eq!(fx.source.global_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fx.source.asset_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn asset_series_is_unmodified() {
        let fx = fixture();
        let window = fx.series.window_for("7D").unwrap();

        let series = fx.series.fetch("BTC", "Bitcoin", window).await.unwrap();

        assert_eq!(series.values(), &[100.0, 110.0, 120.0]);
    }

    #[tokio::test]
    async fn transport_failure_is_reported() {
        let fx = fixture_with(MockSource::failing(), MockSlowCache::default());
        let window = fx.series.window_for("7D").unwrap();

        let err = fx.series.fetch("BTC", "Bitcoin", window).await.unwrap_err();

        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn window_spans_the_range_duration() {
        let fx = fixture();
        fx.series.chart_series("BTC", "Bitcoin", "7D").await.unwrap();

        let windows = fx.source.windows.lock().unwrap();
        assert_eq!(windows[0].end - windows[0].start, 7 * 24 * 60 * 60);
    }

    #[test]
    fn unknown_range_has_no_window() {
        let fx = fixture();
        assert!(matches!(fx.series.window_for("2W"), Err(CoreError::UnknownRange(_))));
    }
}

// ═══════════════════════════════════════════════════════════════════
// SeriesService — single-asset cache path
// ═══════════════════════════════════════════════════════════════════

mod series_cache_path {
    use super::*;

    #[tokio::test]
    async fn miss_fetches_then_fast_tier_hits() {
        let fx = fixture();

        let first = fx.series.chart_series("BTC", "Bitcoin", "7D").await.unwrap();
        let second = fx.series.chart_series("BTC", "Bitcoin", "7D").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(fx.source.asset_calls.load(Ordering::SeqCst), 1);
        assert!(fx.fast.get_series("BTC_7D").is_some());
    }

    #[tokio::test]
    async fn fetch_is_persisted_in_background() {
        let fx = fixture();

        fx.series.chart_series("", "", "All Time").await.unwrap();

        assert!(wait_for_persisted(&fx.slow, "globaldata_AllTime").await);
    }

    #[tokio::test]
    async fn persistent_tier_is_not_consulted() {
        let fx = fixture_with(
            MockSource::new(),
            MockSlowCache::with("BTC_7D", Series::from(vec![1.0, 2.0])),
        );

        let series = fx.series.chart_series("BTC", "Bitcoin", "7D").await.unwrap();

        assert_eq!(series.values(), &[100.0, 110.0, 120.0]);
        assert_eq!(fx.source.asset_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_fast_entry_refetches() {
        let fx = fixture();
        fx.fast.set_series("BTC_7D", Series::new(), Duration::from_secs(60));

        let series = fx.series.chart_series("BTC", "Bitcoin", "7D").await.unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(fx.source.asset_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_caches_nothing() {
        let fx = fixture_with(MockSource::failing(), MockSlowCache::default());

        assert!(fx.series.chart_series("BTC", "Bitcoin", "7D").await.is_err());
        assert!(fx.fast.get_series("BTC_7D").is_none());
    }
}

// ═══════════════════════════════════════════════════════════════════
// PortfolioService — aggregation
// ═══════════════════════════════════════════════════════════════════

mod portfolio_aggregate {
    use super::*;

    fn service(fx: &Fixture) -> PortfolioService {
        PortfolioService::new(fx.series.clone(), &test_settings())
    }

    #[tokio::test]
    async fn single_holding_is_scaled_by_quantity() {
        let fx = fixture();
        let holdings = vec![Holding::new("BTC", "Bitcoin", 2.0)];

        let total = service(&fx).aggregate(&holdings, None, "7D").await.unwrap();

        assert_eq!(total.values(), &[200.0, 220.0, 240.0]);
    }

    #[tokio::test]
    async fn shorter_and_longer_series_sum_by_position() {
        let fx = fixture();
        // ETH → [10, 20], ONE → [1, 1, 1]
        let holdings = vec![
            Holding::new("ETH", "Ethereum", 1.0),
            Holding::new("ONE", "One", 1.0),
        ];

        let total = service(&fx).aggregate(&holdings, None, "7D").await.unwrap();

        assert_eq!(total.values(), &[11.0, 21.0, 1.0]);
    }

    #[tokio::test]
    async fn non_positive_holdings_are_skipped() {
        let fx = fixture();
        let holdings = vec![
            Holding::new("BTC", "Bitcoin", 0.0),
            Holding::new("ETH", "Ethereum", -1.0),
            Holding::new("ONE", "One", 3.0),
        ];

        let total = service(&fx).aggregate(&holdings, None, "7D").await.unwrap();

        assert_eq!(total.values(), &[3.0, 3.0, 3.0]);
        assert_eq!(fx.source.asset_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn focus_limits_to_matching_holding() {
        let fx = fixture();
        let holdings = vec![
            Holding::new("BTC", "Bitcoin", 1.0),
            Holding::new("ETH", "Ethereum", 1.0),
        ];
        let focus = AssetRef::new("eth", "Ethereum");

        let total = service(&fx)
            .aggregate(&holdings, Some(&focus), "7D")
            .await
            .unwrap();

        assert_eq!(total.values(), &[10.0, 20.0]);
    }

    #[tokio::test]
    async fn no_holdings_gives_empty_series() {
        let fx = fixture();
        let total = service(&fx).aggregate(&[], None, "7D").await.unwrap();
        assert!(total.is_empty());
    }

    #[tokio::test]
    async fn persistent_tier_avoids_fetch() {
        let fx = fixture_with(
            MockSource::new(),
            MockSlowCache::with("btc_7d", Series::from(vec![5.0, 6.0])),
        );
        let holdings = vec![Holding::new("BTC", "Bitcoin", 1.0)];

        let total = service(&fx).aggregate(&holdings, None, "7D").await.unwrap();

        assert_eq!(total.values(), &[5.0, 6.0]);
        assert_eq!(fx.source.asset_calls.load(Ordering::SeqCst), 0);
        // Promoted to the fast tier under the lower-cased key
        assert!(fx.fast.get_series("btc_7d").is_some());
    }

    #[tokio::test]
    async fn cold_fetch_fills_both_tiers() {
        let fx = fixture();
        let holdings = vec![Holding::new("BTC", "Bitcoin", 1.0)];

        service(&fx).aggregate(&holdings, None, "All Time").await.unwrap();

        assert!(fx.fast.get_series("btc_alltime").is_some());
        assert!(wait_for_persisted(&fx.slow, "btc_alltime").await);
    }

    #[tokio::test]
    async fn any_failure_aborts_aggregation() {
        let fx = fixture_with(MockSource::failing(), MockSlowCache::default());
        let holdings = vec![Holding::new("BTC", "Bitcoin", 1.0)];

        let err = service(&fx).aggregate(&holdings, None, "7D").await.unwrap_err();

        assert!(err.is_transport());
    }

    #[tokio::test(start_paused = true)]
    async fn cold_fetch_waits_before_calling_source() {
        let source = Arc::new(MockSource::new());
        let fast = Arc::new(MemoryCache::new());
        let slow = Arc::new(MockSlowCache::default());
        let settings = ChartSettings {
            cold_fetch_delay_ms: 2000,
            ..ChartSettings::default()
        };
        let series = Arc::new(SeriesService::new(source.clone(), fast, slow, &settings));
        let svc = PortfolioService::new(series, &settings);
        let holdings = vec![Holding::new("BTC", "Bitcoin", 1.0)];

        let started = tokio::time::Instant::now();
        svc.aggregate(&holdings, None, "7D").await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(2000));
        assert_eq!(source.asset_calls.load(Ordering::SeqCst), 1);
    }
}

// ═══════════════════════════════════════════════════════════════════
// ChartService — rendering
// ═══════════════════════════════════════════════════════════════════

mod chart_render {
    use super::*;

    fn sample() -> Series {
        Series::from(vec![1.0, 3.0, 2.0, 5.0, 4.0, 6.0])
    }

    #[test]
    fn grid_matches_requested_size() {
        let grid = ChartService::new().render(&sample(), 40, 10).unwrap();

        assert_eq!(grid.height(), 10);
        assert!(grid.rows().iter().all(|row| row.len() == 40));
    }

    #[test]
    fn grid_contains_a_trace() {
        let grid = ChartService::new().render(&sample(), 40, 10).unwrap();

        assert!(grid.rows().iter().flatten().any(|cell| cell.symbol.trim() != ""));
    }

    #[test]
    fn rendering_is_pure() {
        let svc = ChartService::new();
        assert_eq!(
            svc.render(&sample(), 30, 8).unwrap(),
            svc.render(&sample(), 30, 8).unwrap()
        );
    }

    #[test]
    fn new_size_replaces_every_dimension() {
        let svc = ChartService::new();
        let wide = svc.render(&sample(), 60, 12).unwrap();
        let narrow = svc.render(&sample(), 20, 5).unwrap();

        assert_eq!((wide.height(), wide.width()), (12, 60));
        assert_eq!((narrow.height(), narrow.width()), (5, 20));
    }

    #[test]
    fn flat_series_still_renders() {
        let grid = ChartService::new()
            .render(&Series::from(vec![7.0, 7.0, 7.0]), 20, 5)
            .unwrap();
        assert_eq!(grid.height(), 5);
    }

    #[test]
    fn single_point_renders() {
        let grid = ChartService::new()
            .render(&Series::from(vec![42.0]), 20, 5)
            .unwrap();
        assert_eq!(grid.width(), 20);
    }

    #[test]
    fn empty_series_is_insufficient_data() {
        let err = ChartService::new().render(&Series::new(), 40, 10).unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn zero_width_is_unavailable_target() {
        let err = ChartService::new().render(&sample(), 0, 10).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn text_has_one_line_per_row() {
        let grid = ChartService::new().render(&sample(), 25, 7).unwrap();
        let text = grid.to_text();

        assert_eq!(text.lines().count(), 7);
        assert!(text.ends_with('\n'));
    }
}
