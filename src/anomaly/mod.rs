//! Anomaly detection: two independent strategies and the engine that runs
//! them.
//!
//! The contextual z-score detector judges each point against its own
//! hour-of-week baseline; the reconstruction detector judges whole
//! sequences against a learned autoencoder. They never fall back into one
//! another: a detector error propagates to the caller, who decides whether
//! to retry with the other method.

pub mod reconstruction;
pub mod zscore;

pub use reconstruction::{ReconstructionConfig, ReconstructionDetector};
pub use zscore::{ContextualZScoreDetector, Sensitivity};

use crate::core::{AnomalyRecord, DetectorKind, TimeSeries};
use crate::error::Result;
use std::collections::HashMap;

/// Which detector(s) to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnomalyMethod {
    #[default]
    ContextualZScore,
    ReconstructionError,
    /// Run both detectors and merge their records.
    Both,
}

/// Configuration for the anomaly engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnomalyConfig {
    /// Settings for the reconstruction detector when it runs.
    pub reconstruction: ReconstructionConfig,
}

/// Runs the selected detector(s) and normalizes the output shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnomalyEngine {
    config: AnomalyConfig,
}

impl AnomalyEngine {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    /// Detect anomalies in a closed series.
    ///
    /// Single-method output keeps the detector's native ordering; merged
    /// output is deduplicated by timestamp (higher score wins) and ordered
    /// chronologically. Errors carry the offending detector's name.
    pub fn detect(
        &self,
        series: &TimeSeries,
        method: AnomalyMethod,
        sensitivity: Sensitivity,
    ) -> Result<Vec<AnomalyRecord>> {
        match method {
            AnomalyMethod::ContextualZScore => self.run_zscore(series, sensitivity),
            AnomalyMethod::ReconstructionError => self.run_reconstruction(series),
            AnomalyMethod::Both => {
                let contextual = self.run_zscore(series, sensitivity)?;
                let reconstructed = self.run_reconstruction(series)?;
                Ok(merge(contextual, reconstructed))
            }
        }
    }

    fn run_zscore(&self, series: &TimeSeries, sensitivity: Sensitivity) -> Result<Vec<AnomalyRecord>> {
        ContextualZScoreDetector::new(sensitivity)
            .detect(series)
            .map_err(|e| e.in_method(DetectorKind::ContextualZScore.as_str()))
    }

    fn run_reconstruction(&self, series: &TimeSeries) -> Result<Vec<AnomalyRecord>> {
        let mut detector = ReconstructionDetector::new(self.config.reconstruction);
        detector
            .train(series)
            .and_then(|_| detector.detect(series))
            .map_err(|e| e.in_method(DetectorKind::ReconstructionError.as_str()))
    }
}

/// Merge two record sets: dedupe by timestamp keeping the higher score,
/// then order chronologically.
fn merge(a: Vec<AnomalyRecord>, b: Vec<AnomalyRecord>) -> Vec<AnomalyRecord> {
    let mut by_timestamp: HashMap<i64, AnomalyRecord> = HashMap::new();
    for record in a.into_iter().chain(b) {
        let key = record.timestamp.timestamp();
        match by_timestamp.get(&key) {
            Some(existing) if existing.score >= record.score => {}
            _ => {
                by_timestamp.insert(key, record);
            }
        }
    }
    let mut merged: Vec<AnomalyRecord> = by_timestamp.into_values().collect();
    merged.sort_by_key(|r| r.timestamp);
    merged
}
