use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Token whose duration is derived from the wall clock on every call.
pub const YEAR_TO_DATE: &str = "YTD";

/// Selectable chart ranges, in navigation order.
const RANGES: [&str; 9] = [
    "24H", "3D", "7D", "1M", "3M", "6M", "1Y", YEAR_TO_DATE, "All Time",
];

/// Static durations in hours. "6H" and "1H" are looked up but not navigable.
/// Months and years are counted in four-week months, as the data source expects.
const DURATION_HOURS: [(&str, i64); 10] = [
    ("All Time", 24 * 7 * 4 * 12 * 5),
    ("1Y", 24 * 7 * 4 * 12),
    ("6M", 24 * 7 * 4 * 6),
    ("3M", 24 * 7 * 4 * 3),
    ("1M", 24 * 7 * 4),
    ("7D", 24 * 7),
    ("3D", 24 * 3),
    ("24H", 24),
    ("6H", 6),
    ("1H", 1),
];

/// Absolute time window in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    /// Window ending at `now` and spanning `duration` backwards.
    pub fn ending_at(now: DateTime<Utc>, duration: Duration) -> Self {
        let end = now.timestamp();
        Self {
            start: end - duration.num_seconds(),
            end,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(self.end - self.start)
    }
}

/// The fixed, ordered list of chart ranges and their durations.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeRegistry;

impl RangeRegistry {
    pub fn new() -> Self {
        Self
    }

    /// All navigable ranges, in order.
    pub fn ranges(&self) -> &'static [&'static str] {
        &RANGES
    }

    pub fn first(&self) -> &'static str {
        RANGES[0]
    }

    pub fn last(&self) -> &'static str {
        RANGES[RANGES.len() - 1]
    }

    pub fn contains(&self, token: &str) -> bool {
        RANGES.contains(&token)
    }

    /// Duration of `token` as of the current wall-clock time.
    pub fn duration_of(&self, token: &str) -> Option<Duration> {
        self.duration_of_at(token, Utc::now())
    }

    /// Duration of `token` as of `now`.
    ///
    /// "YTD" is always computed from `now` (start of `now`'s calendar year, UTC);
    /// every other token comes from the static table. Unknown tokens yield `None`.
    pub fn duration_of_at(&self, token: &str, now: DateTime<Utc>) -> Option<Duration> {
        if token == YEAR_TO_DATE {
            return Some(now - beginning_of_year(now));
        }
        DURATION_HOURS
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, hours)| Duration::hours(*hours))
    }

    /// Resolve `token` into an absolute window ending at `now`.
    pub fn window_for(&self, token: &str, now: DateTime<Utc>) -> Result<TimeWindow, CoreError> {
        let duration = self
            .duration_of_at(token, now)
            .ok_or_else(|| CoreError::UnknownRange(token.to_string()))?;
        Ok(TimeWindow::ending_at(now, duration))
    }

    /// Range after `current`, wrapping to the first. Unknown `current` yields the first.
    pub fn next(&self, current: &str) -> &'static str {
        let idx = match self.position(current) {
            Some(i) if i + 1 < RANGES.len() => i + 1,
            _ => 0,
        };
        RANGES[idx]
    }

    /// Range before `current`, wrapping to the last.
    ///
    /// Unknown `current` yields the first range, not the last. Callers rely on this.
    pub fn previous(&self, current: &str) -> &'static str {
        match self.position(current) {
            Some(0) => self.last(),
            Some(i) => RANGES[i - 1],
            None => self.first(),
        }
    }

    fn position(&self, token: &str) -> Option<usize> {
        RANGES.iter().position(|r| *r == token)
    }
}

fn beginning_of_year(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// Cache-key form of a range token: all whitespace removed ("All Time" → "AllTime").
pub fn normalize_token(token: &str) -> String {
    token.chars().filter(|c| !c.is_whitespace()).collect()
}
