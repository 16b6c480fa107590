pub mod collaborators;
pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use collaborators::{
    AssetResolver, ChartDisplay, ColorScheme, HoldingsSource, PlainColorScheme, Viewport,
};
use errors::CoreError;
use models::{
    chart::{ChartGrid, ChartState, ChartView, LOADING, MAX_CHART_HEIGHT, MIN_CHART_HEIGHT, NOT_ENOUGH_DATA},
    portfolio::AssetRef,
    price::Series,
    range::RangeRegistry,
    settings::ChartSettings,
};
use providers::{coingecko::CoinGeckoProvider, traits::PriceDataSource};
use services::{
    chart_service::ChartService, portfolio_service::PortfolioService,
    series_service::SeriesService,
};
use storage::{
    file::FileCache,
    memory::MemoryCache,
    traits::{FastCache, SlowCache},
};

/// Handle to a background chart update.
pub type UpdateHandle = JoinHandle<Result<(), CoreError>>;

/// Everything the chart needs from the surrounding application.
pub struct Collaborators {
    pub source: Arc<dyn PriceDataSource>,
    pub fast_cache: Arc<dyn FastCache>,
    pub slow_cache: Arc<dyn SlowCache>,
    pub holdings: Arc<dyn HoldingsSource>,
    pub assets: Arc<dyn AssetResolver>,
    pub viewport: Arc<dyn Viewport>,
    pub display: Arc<dyn ChartDisplay>,
    pub colors: Arc<dyn ColorScheme>,
}

/// Main entry point for the chart core.
///
/// Every user-facing operation (range change, resize, focus toggle) updates
/// the selection and schedules an update cycle on the tokio runtime; the
/// caller never waits on the network. Must be used from within a runtime.
#[must_use]
pub struct ChartController {
    ctx: Arc<ChartContext>,
}

/// Shared state behind the controller. Owned, never global.
struct ChartContext {
    series: Arc<SeriesService>,
    portfolio: PortfolioService,
    renderer: ChartService,
    registry: RangeRegistry,
    holdings: Arc<dyn HoldingsSource>,
    assets: Arc<dyn AssetResolver>,
    viewport: Arc<dyn Viewport>,
    display: Arc<dyn ChartDisplay>,
    colors: Arc<dyn ColorScheme>,
    view: Mutex<ChartView>,
    /// Outer lock: one update cycle at a time, held across network calls.
    update_lock: tokio::sync::Mutex<()>,
    /// Inner lock: the rendered grid. Never held across an await.
    points: Mutex<ChartGrid>,
}

impl std::fmt::Debug for ChartController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let view = self.ctx.view();
        let grid = lock(&self.ctx.points);
        f.debug_struct("ChartController")
            .field("view", &view)
            .field("grid", &(grid.height(), grid.width()))
            .finish()
    }
}

impl ChartController {
    /// Build a controller from validated settings and its collaborators.
    pub fn new(settings: ChartSettings, collaborators: Collaborators) -> Result<Self, CoreError> {
        settings.validate()?;

        let series = Arc::new(SeriesService::new(
            collaborators.source,
            collaborators.fast_cache,
            collaborators.slow_cache,
            &settings,
        ));
        let portfolio = PortfolioService::new(series.clone(), &settings);

        let view = ChartView {
            selected_range: settings.default_range.clone(),
            chart_height: settings.chart_height,
            focused_symbol: None,
            portfolio_visible: false,
        };

        Ok(Self {
            ctx: Arc::new(ChartContext {
                series,
                portfolio,
                renderer: ChartService::new(),
                registry: RangeRegistry::new(),
                holdings: collaborators.holdings,
                assets: collaborators.assets,
                viewport: collaborators.viewport,
                display: collaborators.display,
                colors: collaborators.colors,
                view: Mutex::new(view),
                update_lock: tokio::sync::Mutex::new(()),
                points: Mutex::new(ChartGrid::empty()),
            }),
        })
    }

    /// Controller backed by CoinGecko, an in-process fast cache and a file
    /// cache under `settings.cache_dir` (or the system temp directory).
    pub fn with_coingecko(
        settings: ChartSettings,
        holdings: Arc<dyn HoldingsSource>,
        assets: Arc<dyn AssetResolver>,
        viewport: Arc<dyn Viewport>,
        display: Arc<dyn ChartDisplay>,
    ) -> Result<Self, CoreError> {
        let source = match &settings.provider_base_url {
            Some(url) => CoinGeckoProvider::with_base_url(url.clone()),
            None => CoinGeckoProvider::new(),
        };
        let dir = settings
            .cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("coinchart"));
        let slow_cache = FileCache::open(dir)?;
        info!(source = source.name(), cache_dir = %slow_cache.dir().display(), "chart controller ready");

        Self::new(
            settings,
            Collaborators {
                source: Arc::new(source),
                fast_cache: Arc::new(MemoryCache::new()),
                slow_cache: Arc::new(slow_cache),
                holdings,
                assets,
                viewport,
                display,
                colors: Arc::new(PlainColorScheme),
            },
        )
    }

    // ── Update cycle ────────────────────────────────────────────────

    /// Run one update cycle now and redraw the chart.
    ///
    /// Upstream failures keep the previous chart and are not errors; only
    /// unrecoverable internal failures are returned.
    pub async fn update_chart(&self) -> Result<(), CoreError> {
        self.ctx.update_chart().await
    }

    /// Schedule an update cycle in the background.
    pub fn trigger_update(&self) -> UpdateHandle {
        let ctx = self.ctx.clone();
        tokio::spawn(async move {
            let result = ctx.update_chart().await;
            if let Err(e) = &result {
                warn!(error = %e, "chart update failed");
            }
            result
        })
    }

    // ── Ranges ──────────────────────────────────────────────────────

    /// Select `range` and schedule an update.
    pub fn set_range(&self, range: &str) -> Result<UpdateHandle, CoreError> {
        debug!(range, "set_range");
        if !self.ctx.registry.contains(range) {
            return Err(CoreError::UnknownRange(range.to_string()));
        }
        self.ctx.view_mut().selected_range = range.to_string();
        Ok(self.trigger_update())
    }

    /// Select the next range, wrapping to the first.
    pub fn next_range(&self) -> UpdateHandle {
        debug!("next_range");
        self.select_range_with(|registry, current| registry.next(current))
    }

    /// Select the previous range, wrapping to the last.
    pub fn previous_range(&self) -> UpdateHandle {
        debug!("previous_range");
        self.select_range_with(|registry, current| registry.previous(current))
    }

    pub fn first_range(&self) -> UpdateHandle {
        debug!("first_range");
        self.select_range_with(|registry, _| registry.first())
    }

    pub fn last_range(&self) -> UpdateHandle {
        debug!("last_range");
        self.select_range_with(|registry, _| registry.last())
    }

    fn select_range_with(
        &self,
        pick: impl FnOnce(&RangeRegistry, &str) -> &'static str,
    ) -> UpdateHandle {
        {
            let mut view = self.ctx.view_mut();
            view.selected_range = pick(&self.ctx.registry, &view.selected_range).to_string();
        }
        self.trigger_update()
    }

    // ── Height ──────────────────────────────────────────────────────

    /// Change the chart height by `delta` rows.
    ///
    /// A result outside `[5, 30]` leaves the height alone and schedules nothing.
    pub fn resize_height(&self, delta: i32) -> Option<UpdateHandle> {
        debug!(delta, "resize_height");
        {
            let mut view = self.ctx.view_mut();
            let candidate = i32::from(view.chart_height).checked_add(delta)?;
            if candidate < i32::from(MIN_CHART_HEIGHT) || candidate > i32::from(MAX_CHART_HEIGHT) {
                return None;
            }
            view.chart_height = u16::try_from(candidate).ok()?;
        }
        Some(self.trigger_update())
    }

    pub fn shorten_chart(&self) -> Option<UpdateHandle> {
        self.resize_height(-1)
    }

    pub fn enlarge_chart(&self) -> Option<UpdateHandle> {
        self.resize_height(1)
    }

    // ── Focus & mode ────────────────────────────────────────────────

    /// Focus `candidate`, or clear the focus if it is already focused.
    ///
    /// Shows the loading placeholder immediately, then schedules the update
    /// and, separately, a summary bar refresh.
    pub fn toggle_focus(&self, candidate: Option<&str>) -> UpdateHandle {
        debug!(candidate, "toggle_focus");
        {
            let mut view = self.ctx.view_mut();
            view.focused_symbol = match (&view.focused_symbol, candidate) {
                (Some(current), Some(c)) if current.eq_ignore_ascii_case(c) => None,
                (_, c) => c.map(str::to_string),
            };
        }

        self.show_loading();
        let handle = self.trigger_update();

        let display = self.ctx.display.clone();
        tokio::spawn(async move { display.refresh_summary() });

        handle
    }

    /// Switch between portfolio and single-asset charts and schedule an update.
    pub fn set_portfolio_visible(&self, visible: bool) -> UpdateHandle {
        debug!(visible, "set_portfolio_visible");
        self.ctx.view_mut().portfolio_visible = visible;
        self.trigger_update()
    }

    /// Replace the chart panel with the loading placeholder.
    pub fn show_loading(&self) {
        if self.ctx.viewport.width().is_none() {
            return;
        }
        self.ctx.display.draw(self.ctx.colors.chart(LOADING));
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Snapshot of the selection and the current grid.
    #[must_use]
    pub fn state(&self) -> ChartState {
        let view = self.ctx.view();
        let grid = lock(&self.ctx.points).clone();
        ChartState::new(view, grid)
    }

    #[must_use]
    pub fn selected_range(&self) -> String {
        self.ctx.view().selected_range
    }

    #[must_use]
    pub fn chart_height(&self) -> u16 {
        self.ctx.view().chart_height
    }

    /// The text the display receives (before coloring).
    #[must_use]
    pub fn chart_text(&self) -> String {
        self.ctx.chart_body()
    }

    #[must_use]
    pub fn ranges(&self) -> &'static [&'static str] {
        self.ctx.registry.ranges()
    }
}

impl ChartContext {
    async fn update_chart(&self) -> Result<(), CoreError> {
        debug!("update_chart");
        if self.viewport.width().is_none() {
            return Ok(());
        }

        let _cycle = self.update_lock.lock().await;

        let view = self.view();
        let focus = self.resolve_focus(&view);

        let result = if view.portfolio_visible {
            let holdings = self.holdings.holdings();
            self.portfolio
                .aggregate(&holdings, focus.as_ref(), &view.selected_range)
                .await
        } else {
            let (symbol, name) = focus.map(|a| (a.symbol, a.name)).unwrap_or_default();
            self.series
                .chart_series(&symbol, &name, &view.selected_range)
                .await
        };

        match result {
            Ok(series) => {
                // The panel may have gone away while we were fetching.
                let Some(width) = self.viewport.width() else {
                    return Ok(());
                };
                self.write_points(&series, width, view.chart_height)?;
            }
            Err(e) if e.is_transport() => {
                debug!(error = %e, "chart data unavailable, keeping previous chart");
            }
            Err(e) => return Err(e),
        }

        self.redraw();
        Ok(())
    }

    /// Render and replace the grid atomically.
    fn write_points(&self, series: &Series, width: u16, height: u16) -> Result<(), CoreError> {
        let mut points = lock(&self.points);
        *points = match self.renderer.render(series, width, height) {
            Ok(grid) => grid,
            Err(e) if e.is_insufficient_data() => ChartGrid::empty(),
            Err(e) if e.is_configuration() => return Ok(()),
            Err(e) => return Err(e),
        };
        Ok(())
    }

    fn redraw(&self) {
        if self.viewport.width().is_none() {
            return;
        }
        let body = self.chart_body();
        self.display.draw(self.colors.chart(&body));
    }

    fn chart_body(&self) -> String {
        let points = lock(&self.points);
        if points.is_empty() {
            NOT_ENOUGH_DATA.to_string()
        } else {
            points.to_text()
        }
    }

    /// Look the focused symbol up in the current coin list. A symbol that is
    /// no longer listed clears the focus.
    fn resolve_focus(&self, view: &ChartView) -> Option<AssetRef> {
        let symbol = view.focused_symbol.as_deref()?;
        if let Some(asset) = self.assets.resolve(symbol) {
            return Some(asset);
        }

        debug!(symbol, "focused asset no longer listed, clearing focus");
        let mut current = self.view_mut();
        if current.focused_symbol.as_deref() == Some(symbol) {
            current.focused_symbol = None;
        }
        None
    }

    fn view(&self) -> ChartView {
        lock(&self.view).clone()
    }

    fn view_mut(&self) -> MutexGuard<'_, ChartView> {
        lock(&self.view)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
