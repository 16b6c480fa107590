use serde::{Deserialize, Serialize};

/// A single sample returned by the data source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Unix timestamp in milliseconds.
    pub timestamp_ms: i64,
    pub value: f64,
}

impl PricePoint {
    pub fn new(timestamp_ms: i64, value: f64) -> Self {
        Self { timestamp_ms, value }
    }
}

/// Ordered samples over a time window, equally spaced by the source.
///
/// Timestamps are dropped once a series leaves the fetcher; only the
/// index position of a sample carries meaning downstream. This is also the
/// value stored in both cache tiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series(Vec<f64>);

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points(points: &[PricePoint]) -> Self {
        Self(points.iter().map(|p| p.value).collect())
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Multiply every sample by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self(self.0.iter().map(|v| v * factor).collect())
    }

    /// Add `other` into this series by index position.
    ///
    /// Indexes present in both are summed in place; trailing samples of a
    /// longer `other` are appended. Samples are not aligned by timestamp.
    pub fn accumulate(&mut self, other: &Series) {
        for (i, value) in other.0.iter().enumerate() {
            match self.0.get_mut(i) {
                Some(total) => *total += value,
                None => self.0.push(*value),
            }
        }
    }

    pub fn min(&self) -> Option<f64> {
        self.0.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.0.iter().copied().reduce(f64::max)
    }
}

impl From<Vec<f64>> for Series {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

impl FromIterator<f64> for Series {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
