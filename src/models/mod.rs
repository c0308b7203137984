//! Forecast model tiers.

mod traits;

pub mod attention;
pub mod seasonal;
pub mod synthetic;

pub use attention::{AttentionConfig, AttentionForecaster, MIN_TRAIN_POINTS};
pub use seasonal::{SeasonalConfig, SeasonalProfile};
pub use synthetic::CalendarSynthetic;
pub use traits::{BoxedForecastModel, ForecastModel};
