use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::chart::{MAX_CHART_HEIGHT, MIN_CHART_HEIGHT};
use crate::models::range::RangeRegistry;

/// User-configurable chart settings, typically loaded from a JSON config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    /// Currency every series is quoted in (e.g., "USD", "EUR").
    pub currency: String,

    /// Range selected at startup.
    pub default_range: String,

    /// Chart height in rows at startup.
    pub chart_height: u16,

    /// Lifetime of in-process cache entries.
    pub fast_cache_ttl_secs: u64,

    /// Lifetime of on-disk cache entries.
    pub slow_cache_ttl_hours: u64,

    /// Pause before hitting the data source on a full cache miss (portfolio charts).
    pub cold_fetch_delay_ms: u64,

    /// Directory for the persistent cache. `None` leaves the choice to the host.
    pub cache_dir: Option<PathBuf>,

    /// Override for the HTTP data source base URL.
    pub provider_base_url: Option<String>,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            default_range: "1Y".to_string(),
            chart_height: 10,
            fast_cache_ttl_secs: 10,
            slow_cache_ttl_hours: 24,
            cold_fetch_delay_ms: 2000,
            cache_dir: None,
            provider_base_url: None,
        }
    }
}

impl ChartSettings {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let settings: ChartSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Self, CoreError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if !RangeRegistry::new().contains(&self.default_range) {
            return Err(CoreError::ValidationError(format!(
                "default_range '{}' is not a known chart range",
                self.default_range
            )));
        }
        if !(MIN_CHART_HEIGHT..=MAX_CHART_HEIGHT).contains(&self.chart_height) {
            return Err(CoreError::ValidationError(format!(
                "chart_height {} must be between {MIN_CHART_HEIGHT} and {MAX_CHART_HEIGHT}",
                self.chart_height
            )));
        }
        if self.currency.trim().is_empty() {
            return Err(CoreError::ValidationError("currency must not be empty".into()));
        }
        Ok(())
    }

    pub fn fast_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.fast_cache_ttl_secs)
    }

    pub fn slow_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.slow_cache_ttl_hours * 60 * 60)
    }

    pub fn cold_fetch_delay(&self) -> Duration {
        Duration::from_millis(self.cold_fetch_delay_ms)
    }
}
