//! Common interface for the forecast-model tiers.

use crate::core::{Forecast, ForecastTier, TimeSeries, TrainingSummary};
use crate::error::Result;
use chrono::{DateTime, Utc};

/// A forecast method with train and predict capabilities.
///
/// The cascade owns one instance per tier per invocation; nothing is shared
/// across calls. Prediction receives the concrete future timestamps so
/// calendar-driven models can read hour-of-day and weekday directly.
pub trait ForecastModel {
    /// Fit the model to the series. Errors demote the cascade to the next
    /// tier.
    fn fit(&mut self, series: &TimeSeries) -> Result<()>;

    /// Predict one value (with bounds) per requested timestamp.
    fn predict(&self, timestamps: &[DateTime<Utc>]) -> Result<Forecast>;

    /// The cascade tier this model implements.
    fn tier(&self) -> ForecastTier;

    /// Human-readable model name for logs and error context.
    fn name(&self) -> &'static str;

    /// Loss summary from gradient-based training, if this tier trains one.
    fn training_summary(&self) -> Option<TrainingSummary> {
        None
    }
}

/// Type alias for boxed forecast-model trait objects.
pub type BoxedForecastModel = Box<dyn ForecastModel>;
