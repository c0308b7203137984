//! Contextual z-score anomaly detector.
//!
//! Builds a 168-bucket baseline (hour-of-day x day-of-week) over the series
//! and flags points whose z value against their own bucket exceeds the
//! sensitivity threshold. Points in a zero-variance bucket are never
//! flagged; that is a known limitation of the contextual baseline.

use crate::core::{calendar_bucket, AnomalyRecord, DetectorKind, Severity, TimeSeries};
use crate::error::Result;

const BUCKETS: usize = 168;
/// Maximum number of records returned, keeping only the largest deviations.
const MAX_RECORDS: usize = 10;

/// Detection sensitivity; lower z thresholds flag more points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sensitivity {
    Low,
    #[default]
    Medium,
    High,
}

impl Sensitivity {
    /// The z threshold this sensitivity maps to.
    pub fn z_threshold(&self) -> f64 {
        match self {
            Sensitivity::Low => 4.0,
            Sensitivity::Medium => 3.0,
            Sensitivity::High => 2.0,
        }
    }
}

/// Pick up to two candidate explanations from the relative deviation.
pub(crate) fn classify_causes(deviation_pct: f64) -> Vec<String> {
    if deviation_pct > 20.0 {
        vec!["equipment malfunction".to_string(), "unusual occupancy".to_string()]
    } else if deviation_pct < -20.0 {
        vec!["sensor error".to_string(), "unexpected shutdown".to_string()]
    } else {
        vec!["weather influence".to_string(), "occupancy variation".to_string()]
    }
}

/// Relative deviation in percent, zero when the expectation is ~zero.
pub(crate) fn deviation_pct(actual: f64, expected: f64) -> f64 {
    if expected.abs() < 1e-10 {
        0.0
    } else {
        (actual - expected) / expected * 100.0
    }
}

/// Hour-of-day x day-of-week contextual baseline detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextualZScoreDetector {
    sensitivity: Sensitivity,
}

impl ContextualZScoreDetector {
    pub fn new(sensitivity: Sensitivity) -> Self {
        Self { sensitivity }
    }

    /// Detect anomalies against the series' own calendar baseline.
    ///
    /// Returns at most ten records, ordered by absolute relative deviation
    /// descending. An empty series yields an empty result.
    pub fn detect(&self, series: &TimeSeries) -> Result<Vec<AnomalyRecord>> {
        let mut sums = [0.0_f64; BUCKETS];
        let mut sq_sums = [0.0_f64; BUCKETS];
        let mut counts = [0_usize; BUCKETS];

        for point in series.points() {
            let b = calendar_bucket(&point.timestamp);
            sums[b] += point.value;
            sq_sums[b] += point.value * point.value;
            counts[b] += 1;
        }

        let mut means = [0.0_f64; BUCKETS];
        let mut stddevs = [0.0_f64; BUCKETS];
        for b in 0..BUCKETS {
            if counts[b] == 0 {
                continue;
            }
            let n = counts[b] as f64;
            means[b] = sums[b] / n;
            if counts[b] > 1 {
                let variance = (sq_sums[b] - sums[b] * sums[b] / n) / (n - 1.0);
                stddevs[b] = variance.max(0.0).sqrt();
            }
        }

        let threshold = self.sensitivity.z_threshold();
        let mut records = Vec::new();

        for point in series.points() {
            let b = calendar_bucket(&point.timestamp);
            // Zero-variance buckets never flag.
            if stddevs[b] < 1e-10 {
                continue;
            }

            let expected = means[b];
            let z = (point.value - expected).abs() / stddevs[b];
            if z <= threshold {
                continue;
            }

            let severity = if z > 1.5 * threshold {
                Severity::High
            } else if z < 0.8 * threshold {
                Severity::Low
            } else {
                Severity::Medium
            };

            let deviation = deviation_pct(point.value, expected);
            records.push(AnomalyRecord {
                timestamp: point.timestamp,
                expected_value: expected,
                actual_value: point.value,
                deviation_pct: deviation,
                severity,
                score: z,
                method: DetectorKind::ContextualZScore,
                possible_causes: classify_causes(deviation),
            });
        }

        records.sort_by(|a, b| {
            b.deviation_pct
                .abs()
                .partial_cmp(&a.deviation_pct.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        records.truncate(MAX_RECORDS);

        tracing::debug!(
            flagged = records.len(),
            threshold,
            "contextual z-score detection complete"
        );
        Ok(records)
    }
}
