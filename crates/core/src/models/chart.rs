use ratatui::buffer::Cell;
use ratatui::style::Color;

/// Smallest chart height in rows.
pub const MIN_CHART_HEIGHT: u16 = 5;

/// Largest chart height in rows.
pub const MAX_CHART_HEIGHT: u16 = 30;

/// Shown instead of a chart when the series is empty.
pub const NOT_ENOUGH_DATA: &str = "\n\n\n\n\nnot enough data for chart";

/// Shown while a focus change is being fetched.
pub const LOADING: &str = "\n\nLoading...";

/// One styled terminal cell of a rendered chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartCell {
    pub symbol: String,
    pub fg: Color,
    pub bg: Color,
}

impl From<&Cell> for ChartCell {
    fn from(cell: &Cell) -> Self {
        Self {
            symbol: cell.symbol().to_string(),
            fg: cell.fg,
            bg: cell.bg,
        }
    }
}

/// A rendered chart: `height` rows of `width` cells, or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartGrid {
    rows: Vec<Vec<ChartCell>>,
}

impl ChartGrid {
    pub fn new(rows: Vec<Vec<ChartCell>>) -> Self {
        Self { rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[Vec<ChartCell>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Flatten into display text, one line per row, each terminated by a newline.
    pub fn to_text(&self) -> String {
        let mut body = String::new();
        for row in &self.rows {
            for cell in row {
                body.push_str(&cell.symbol);
            }
            body.push('\n');
        }
        body
    }
}

/// User-driven chart selection. Mutated by range/height/focus operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartView {
    pub selected_range: String,
    pub chart_height: u16,
    /// Symbol of the focused asset, re-resolved each update cycle.
    pub focused_symbol: Option<String>,
    /// Portfolio mode when set, single-asset (or global) mode otherwise.
    pub portfolio_visible: bool,
}

/// Snapshot of everything the chart currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartState {
    pub selected_range: String,
    pub chart_height: u16,
    pub focused_symbol: Option<String>,
    pub portfolio_visible: bool,
    pub grid: ChartGrid,
}

impl ChartState {
    pub fn new(view: ChartView, grid: ChartGrid) -> Self {
        Self {
            selected_range: view.selected_range,
            chart_height: view.chart_height,
            focused_symbol: view.focused_symbol,
            portfolio_visible: view.portfolio_visible,
            grid,
        }
    }
}
