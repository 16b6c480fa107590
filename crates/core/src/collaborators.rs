//! Interfaces to the dashboard around the chart.
//!
//! The chart core never owns the panel layout, the coin list, the portfolio
//! bookkeeping or the terminal. It sees them only through these traits.

use crate::models::portfolio::{AssetRef, Holding};

/// Read-only view of the user's portfolio.
pub trait HoldingsSource: Send + Sync {
    fn holdings(&self) -> Vec<Holding>;
}

/// Looks up coins in the externally-owned, periodically refreshed coin list.
pub trait AssetResolver: Send + Sync {
    /// `None` when the symbol is no longer listed.
    fn resolve(&self, symbol: &str) -> Option<AssetRef>;
}

/// Size of the chart panel.
pub trait Viewport: Send + Sync {
    /// Usable chart width in columns, or `None` while the panel does not exist.
    fn width(&self) -> Option<u16>;
}

/// Where finished chart text goes.
pub trait ChartDisplay: Send + Sync {
    /// Replace the chart panel contents with `body`.
    fn draw(&self, body: String);

    /// Refresh the market summary bar shown above the chart.
    fn refresh_summary(&self);
}

/// Final styling applied to chart text before display.
pub trait ColorScheme: Send + Sync {
    fn chart(&self, body: &str) -> String;
}

/// Leaves chart text untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainColorScheme;

impl ColorScheme for PlainColorScheme {
    fn chart(&self, body: &str) -> String {
        body.to_string()
    }
}
