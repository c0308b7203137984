//! The three-tier forecast cascade.
//!
//! `Advanced -> Seasonal -> Synthetic`: any tier error is recorded and the
//! next tier runs; the synthetic tier generates infallibly, so the engine
//! as a whole never returns an error. Accuracy is traded for availability.

use crate::core::{
    ForecastReport, ForecastResult, ForecastTier, TierFailure, TimeSeries, TrainingSummary,
};
use crate::models::{
    AttentionConfig, AttentionForecaster, CalendarSynthetic, ForecastModel, SeasonalConfig,
    SeasonalProfile,
};
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Configuration for the forecast engine.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Settings for the advanced tier.
    pub attention: AttentionConfig,
    /// Settings for the seasonal tier.
    pub seasonal: SeasonalConfig,
    /// Step between forecast timestamps when the series has fewer than two
    /// points to infer one from.
    pub default_step: Duration,
    /// Anchor timestamp when forecasting an empty series. Fixed so that
    /// repeated calls stay deterministic.
    pub origin: DateTime<Utc>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            attention: AttentionConfig::default(),
            seasonal: SeasonalConfig::default(),
            default_step: Duration::hours(1),
            origin: Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap(),
        }
    }
}

/// Orchestrates the forecast-model cascade.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForecastEngine {
    config: EngineConfig,
}

impl ForecastEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Forecast `horizon` steps past the end of the series.
    ///
    /// Never fails: every tier error demotes to the next tier and the
    /// terminal synthetic tier cannot fail. The report carries exactly
    /// `horizon` results tagged with the producing tier, plus a record of
    /// every demoted tier.
    pub fn run(&self, series: &TimeSeries, horizon: usize) -> ForecastReport {
        if horizon == 0 {
            return ForecastReport {
                results: Vec::new(),
                tier: ForecastTier::Synthetic,
                attempts: Vec::new(),
            };
        }

        let timestamps = self.future_timestamps(series, horizon);
        let mut attempts = Vec::new();

        let mut attention_config = self.config.attention;
        attention_config.horizon = horizon;
        let mut advanced = AttentionForecaster::new(attention_config);
        match advanced.fit(series).and_then(|_| advanced.predict(&timestamps)) {
            Ok(forecast) => {
                tracing::debug!(horizon, "advanced tier succeeded");
                return assemble(
                    &timestamps,
                    forecast,
                    ForecastTier::Advanced,
                    advanced.training_summary(),
                    attempts,
                );
            }
            Err(error) => {
                tracing::warn!(tier = %advanced.tier(), %error, "forecast tier failed, falling back");
                attempts.push(TierFailure {
                    tier: ForecastTier::Advanced,
                    error,
                });
            }
        }

        self.run_statistical(series, &timestamps, attempts)
    }

    /// The seasonal and synthetic tiers, entered once the advanced tier is
    /// out of the picture (failed, or delegated to a background trainer).
    pub(crate) fn run_statistical(
        &self,
        series: &TimeSeries,
        timestamps: &[DateTime<Utc>],
        mut attempts: Vec<TierFailure>,
    ) -> ForecastReport {
        let mut seasonal = SeasonalProfile::new(self.config.seasonal);
        match seasonal.fit(series).and_then(|_| seasonal.predict(timestamps)) {
            Ok(forecast) => {
                tracing::debug!(horizon = timestamps.len(), "seasonal tier succeeded");
                return assemble(timestamps, forecast, ForecastTier::Seasonal, None, attempts);
            }
            Err(error) => {
                tracing::warn!(tier = %seasonal.tier(), %error, "forecast tier failed, falling back");
                attempts.push(TierFailure {
                    tier: ForecastTier::Seasonal,
                    error,
                });
            }
        }

        // Terminal tier: a pure calendar function that cannot fail.
        let mut synthetic = CalendarSynthetic::new();
        let _ = synthetic.fit(series);
        let forecast = synthetic.generate(timestamps);
        assemble(timestamps, forecast, ForecastTier::Synthetic, None, attempts)
    }

    /// Future timestamps continuing the series at its median step.
    pub(crate) fn future_timestamps(
        &self,
        series: &TimeSeries,
        horizon: usize,
    ) -> Vec<DateTime<Utc>> {
        let step = series.median_step().unwrap_or(self.config.default_step);
        let start = series
            .last_timestamp()
            .map(|t| t + step)
            .unwrap_or(self.config.origin);
        (0..horizon).map(|i| start + step * i as i32).collect()
    }
}

pub(crate) fn assemble(
    timestamps: &[DateTime<Utc>],
    forecast: crate::core::Forecast,
    tier: ForecastTier,
    metrics: Option<TrainingSummary>,
    attempts: Vec<TierFailure>,
) -> ForecastReport {
    let results = timestamps
        .iter()
        .zip(forecast.point)
        .zip(forecast.lower.into_iter().zip(forecast.upper))
        .map(|((&timestamp, value), (lower_bound, upper_bound))| ForecastResult {
            timestamp,
            value,
            lower_bound,
            upper_bound,
            method: tier,
            metrics,
        })
        .collect();

    ForecastReport {
        results,
        tier,
        attempts,
    }
}
