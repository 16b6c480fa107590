use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::symbols;
use ratatui::text::Span;
use ratatui::widgets::{Axis, Chart, Dataset, GraphType, Widget};

use crate::errors::CoreError;
use crate::models::chart::{ChartCell, ChartGrid};
use crate::models::price::Series;

const LINE_COLOR: Color = Color::Cyan;
const AXIS_COLOR: Color = Color::Gray;

/// Lays a series out as a line chart in a fixed-size terminal cell grid.
///
/// The chart is drawn into an off-screen buffer exactly `width × height`
/// cells large, so the result never depends on the real terminal. Pure:
/// the same series and size always give the same grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChartService;

impl ChartService {
    pub fn new() -> Self {
        Self
    }

    /// Render `series` into `height` rows of `width` cells.
    ///
    /// An empty series is `InsufficientData`; a zero-sized area is
    /// `RenderTargetUnavailable`.
    pub fn render(&self, series: &Series, width: u16, height: u16) -> Result<ChartGrid, CoreError> {
        if width == 0 || height == 0 {
            return Err(CoreError::RenderTargetUnavailable);
        }
        let (Some(min), Some(max)) = (series.min(), series.max()) else {
            return Err(CoreError::InsufficientData);
        };

        let data: Vec<(f64, f64)> = series
            .values()
            .iter()
            .enumerate()
            .map(|(i, &v)| (i as f64, v))
            .collect();
        let (low, high) = y_bounds(min, max);
        let max_x = (series.len().saturating_sub(1)).max(1) as f64;

        let dataset = Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(LINE_COLOR))
            .data(&data);

        let chart = Chart::new(vec![dataset])
            .x_axis(Axis::default().bounds([0.0, max_x]))
            .y_axis(
                Axis::default()
                    .style(Style::default().fg(AXIS_COLOR))
                    .bounds([low, high])
                    .labels(vec![
                        Span::raw(format_label(low)),
                        Span::raw(format_label(high)),
                    ]),
            );

        let area = Rect::new(0, 0, width, height);
        let mut buffer = Buffer::empty(area);
        chart.render(area, &mut buffer);

        let rows = buffer
            .content
            .chunks(usize::from(width))
            .map(|row| row.iter().map(ChartCell::from).collect())
            .collect();
        Ok(ChartGrid::new(rows))
    }
}

/// A flat series still needs a non-empty y range to be drawn.
fn y_bounds(min: f64, max: f64) -> (f64, f64) {
    if max > min {
        return (min, max);
    }
    let pad = if min == 0.0 { 1.0 } else { min.abs() * 0.01 };
    (min - pad, max + pad)
}

/// Plain decimal labels; never exponential notation.
fn format_label(value: f64) -> String {
    if value.abs() >= 100.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}
