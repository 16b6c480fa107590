use thiserror::Error;

/// Unified error type for the entire coinchart-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Cache files ─────────────────────────────────────────────────
    #[error("Invalid cache file format: {0}")]
    InvalidFileFormat(String),

    #[error("Unsupported cache file version: {0}")]
    UnsupportedVersion(u16),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("File I/O error: {0}")]
    FileIO(String),

    // ── API / Network ───────────────────────────────────────────────
    #[error("API error ({provider}): {message}")]
    Api {
        provider: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    // ── Chart ───────────────────────────────────────────────────────
    #[error("Not enough data for chart")]
    InsufficientData,

    #[error("Render target unavailable")]
    RenderTargetUnavailable,

    #[error("Unknown chart range: {0}")]
    UnknownRange(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),
}

impl CoreError {
    /// Upstream fetch failed. The update cycle keeps the previous chart.
    pub fn is_transport(&self) -> bool {
        matches!(self, CoreError::Api { .. } | CoreError::Network(_))
    }

    /// The resulting series was empty; a placeholder is shown instead of a chart.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, CoreError::InsufficientData)
    }

    /// Nothing to draw into yet (startup/teardown). Never a fault.
    pub fn is_configuration(&self) -> bool {
        matches!(self, CoreError::RenderTargetUnavailable)
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<bincode::Error> for CoreError {
    fn from(e: bincode::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // Strip query parameters from URLs: they may carry API keys.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}
