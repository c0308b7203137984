//! # enercast
//!
//! Forecasting and anomaly-detection engine for per-building energy time
//! series. Provides a three-tier forecast cascade (attention-based sequence
//! model, calendar-profile statistics, synthetic calendar heuristic) with
//! graceful degradation, and two independent anomaly detectors (a
//! contextual hour-of-week z-score baseline and a learned
//! reconstruction-error autoencoder).
//!
//! The crate is a plain library surface: it consumes a time-ordered numeric
//! series and returns structured results. It knows nothing about HTTP,
//! databases, or natural language. The base engine keeps no state between
//! calls; [`cache::CachingForecastEngine`] opts into a trained-model cache
//! with background training workers.
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use enercast::prelude::*;
//!
//! let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let timestamps: Vec<_> = (0..48).map(|i| base + Duration::hours(i)).collect();
//! let values: Vec<f64> = (0..48).map(|i| 100.0 + (i % 24) as f64).collect();
//! let series = TimeSeries::new(timestamps, values).unwrap();
//!
//! // The cascade always returns exactly `horizon` results.
//! let results = enercast::forecast(&series, 24);
//! assert_eq!(results.len(), 24);
//!
//! // 48 points is too short for the advanced tier; the seasonal tier answers.
//! assert!(results.iter().all(|r| r.method == ForecastTier::Seasonal));
//! ```

pub mod anomaly;
pub mod cache;
pub mod core;
pub mod engine;
pub mod error;
pub mod models;
pub mod nn;
pub mod transform;
pub mod utils;

pub use error::{EngineError, Result};

use crate::core::{AnomalyRecord, ForecastResult, TimeSeries};

/// Forecast `horizon` steps with the default engine configuration.
///
/// Convenience wrapper over [`engine::ForecastEngine::run`]; never fails.
pub fn forecast(series: &TimeSeries, horizon: usize) -> Vec<ForecastResult> {
    engine::ForecastEngine::default().run(series, horizon).results
}

/// Detect anomalies with the default engine configuration.
///
/// Detector errors propagate to the caller; there is no fallback between
/// detection methods.
pub fn detect_anomalies(
    series: &TimeSeries,
    method: anomaly::AnomalyMethod,
    sensitivity: anomaly::Sensitivity,
) -> Result<Vec<AnomalyRecord>> {
    anomaly::AnomalyEngine::default().detect(series, method, sensitivity)
}

pub mod prelude {
    pub use crate::anomaly::{AnomalyEngine, AnomalyMethod, Sensitivity};
    pub use crate::core::{
        AnomalyRecord, DetectorKind, ForecastReport, ForecastResult, ForecastTier, Severity,
        TimeSeries, TimeSeriesPoint,
    };
    pub use crate::cache::CachingForecastEngine;
    pub use crate::engine::{EngineConfig, ForecastEngine};
    pub use crate::error::{EngineError, Result};
}
