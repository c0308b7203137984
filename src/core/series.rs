//! TimeSeries data structure for per-building energy readings.

use crate::error::{EngineError, Result};
use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use std::collections::HashMap;

/// A single observation: one timestamp, one metered value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// An ordered univariate time series for one building and metric.
///
/// Timestamps must be strictly increasing (and therefore unique). Gaps are
/// tolerated; the series never interpolates missing readings.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
    metadata: HashMap<String, String>,
}

impl TimeSeries {
    /// Create a series from parallel timestamp and value vectors.
    pub fn new(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(EngineError::InvalidParameter(format!(
                "timestamps and values differ in length: {} vs {}",
                timestamps.len(),
                values.len()
            )));
        }
        for i in 1..timestamps.len() {
            if timestamps[i] <= timestamps[i - 1] {
                return Err(EngineError::TimestampError(
                    "timestamps must be strictly increasing".to_string(),
                ));
            }
        }
        Ok(Self {
            timestamps,
            values,
            metadata: HashMap::new(),
        })
    }

    /// Create a series from observation points.
    pub fn from_points(points: Vec<TimeSeriesPoint>) -> Result<Self> {
        let (timestamps, values) = points.into_iter().map(|p| (p.timestamp, p.value)).unzip();
        Self::new(timestamps, values)
    }

    /// An empty series.
    pub fn empty() -> Self {
        Self {
            timestamps: Vec::new(),
            values: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Attach a metadata entry (building id, metric name, unit).
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Check if the series has no observations.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Get timestamps.
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Get values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get metadata.
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// Last observation timestamp, if any.
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().copied()
    }

    /// Iterate over observations as points.
    pub fn points(&self) -> impl Iterator<Item = TimeSeriesPoint> + '_ {
        self.timestamps
            .iter()
            .zip(self.values.iter())
            .map(|(&timestamp, &value)| TimeSeriesPoint { timestamp, value })
    }

    /// Median spacing between consecutive observations.
    ///
    /// Robust to occasional gaps. `None` for series with fewer than two
    /// points.
    pub fn median_step(&self) -> Option<Duration> {
        if self.timestamps.len() < 2 {
            return None;
        }
        let mut diffs: Vec<i64> = self
            .timestamps
            .windows(2)
            .map(|w| (w[1] - w[0]).num_seconds())
            .collect();
        diffs.sort_unstable();
        Some(Duration::seconds(diffs[diffs.len() / 2]))
    }
}

/// Calendar bucket index for contextual baselines: hour-of-day crossed with
/// day-of-week, 168 buckets total (Monday 00:00 is bucket 0).
pub fn calendar_bucket(timestamp: &DateTime<Utc>) -> usize {
    timestamp.weekday().num_days_from_monday() as usize * 24 + timestamp.hour() as usize
}

/// True for Saturday and Sunday.
pub fn is_weekend(timestamp: &DateTime<Utc>) -> bool {
    matches!(
        timestamp.weekday(),
        chrono::Weekday::Sat | chrono::Weekday::Sun
    )
}
