//! Core data structures for the forecasting and anomaly-detection engine.

mod result;
mod series;

pub use result::{
    AnomalyRecord, DetectorKind, Forecast, ForecastReport, ForecastResult, ForecastTier, Severity,
    TierFailure, TrainingSummary,
};
pub use series::{calendar_bucket, is_weekend, TimeSeries, TimeSeriesPoint};
