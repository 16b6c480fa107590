use serde::{Deserialize, Serialize};

/// One position from the external portfolio snapshot. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    /// Ticker symbol (e.g., "BTC")
    pub symbol: String,

    /// Display name (e.g., "Bitcoin")
    pub name: String,

    /// Amount held. Non-positive holdings never contribute to a chart.
    pub quantity: f64,
}

impl Holding {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>, quantity: f64) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            quantity,
        }
    }

    /// Symbols are compared case-insensitively.
    pub fn matches(&self, asset: &AssetRef) -> bool {
        self.symbol.eq_ignore_ascii_case(&asset.symbol)
    }
}

/// An asset resolved from the externally-owned coin list for one update cycle.
///
/// The chart only remembers the focused symbol; this is re-resolved every
/// cycle so a refreshed coin list never leaves a stale reference behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    pub symbol: String,
    pub name: String,
}

impl AssetRef {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
        }
    }
}
