//! Public result types produced by the forecast and anomaly engines.

use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The cascade tier that produced a forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastTier {
    /// Attention-based sequence model.
    Advanced,
    /// Calendar-bucket statistical profile.
    Seasonal,
    /// Pure calendar heuristic, never fails.
    Synthetic,
}

impl ForecastTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastTier::Advanced => "advanced",
            ForecastTier::Seasonal => "seasonal",
            ForecastTier::Synthetic => "synthetic",
        }
    }
}

impl std::fmt::Display for ForecastTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loss trajectory summary returned by gradient-based training.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    /// Mean squared error after the last epoch.
    pub final_loss: f64,
    /// Lowest epoch loss observed.
    pub best_loss: f64,
    /// Number of epochs run.
    pub epochs: usize,
}

/// Point forecasts with interval bounds, one entry per horizon step.
///
/// Models that produce no native interval set the bounds equal to the point
/// estimate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forecast {
    pub point: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Forecast {
    /// Point estimates only; bounds collapse onto the point values.
    pub fn from_points(point: Vec<f64>) -> Self {
        let lower = point.clone();
        let upper = point.clone();
        Self { point, lower, upper }
    }

    /// Point estimates with explicit interval bounds.
    pub fn with_intervals(point: Vec<f64>, lower: Vec<f64>, upper: Vec<f64>) -> Self {
        debug_assert_eq!(point.len(), lower.len());
        debug_assert_eq!(point.len(), upper.len());
        Self { point, lower, upper }
    }

    /// Number of forecast steps.
    pub fn horizon(&self) -> usize {
        self.point.len()
    }
}

/// One forecast step as surfaced to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub method: ForecastTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<TrainingSummary>,
}

/// Categorical anomaly triage level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Which detector produced an anomaly record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    ContextualZScore,
    ReconstructionError,
}

impl DetectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorKind::ContextualZScore => "contextual-zscore",
            DetectorKind::ReconstructionError => "reconstruction-error",
        }
    }
}

/// One flagged consumption anomaly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub timestamp: DateTime<Utc>,
    pub expected_value: f64,
    pub actual_value: f64,
    /// Relative deviation in percent, 0 when the expectation is ~zero.
    pub deviation_pct: f64,
    pub severity: Severity,
    /// Detector-native numeric severity: z value for the contextual
    /// detector, error/threshold ratio for the reconstruction detector.
    pub score: f64,
    pub method: DetectorKind,
    /// At most two candidate explanations, most likely first.
    pub possible_causes: Vec<String>,
}

/// A cascade tier that was attempted and demoted.
#[derive(Debug, Clone, PartialEq)]
pub struct TierFailure {
    pub tier: ForecastTier,
    pub error: EngineError,
}

/// Full outcome of one forecast invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastReport {
    /// Exactly `horizon` entries, all tagged with `tier`.
    pub results: Vec<ForecastResult>,
    /// The tier that produced the results.
    pub tier: ForecastTier,
    /// Tiers that failed before `tier` succeeded, in cascade order.
    pub attempts: Vec<TierFailure>,
}
