//! Calendar-heuristic forecaster, the terminal cascade tier.
//!
//! A pure function of the requested timestamps: a sinusoidal hour-of-day
//! load curve times a weekday/weekend multiplier, scaled by the series mean
//! and spread when any observations exist, else by fixed constants. This
//! tier is defined to never fail, including on an empty series.

use crate::core::{is_weekend, Forecast, ForecastTier, TimeSeries};
use crate::error::Result;
use crate::models::ForecastModel;
use crate::utils::{mean, sample_stddev};
use chrono::{DateTime, Timelike, Utc};

/// Baseline consumption when the series carries no observations.
const DEFAULT_BASE: f64 = 100.0;
/// Swing of the hour-of-day curve relative to the base level.
const DEFAULT_RELATIVE_SWING: f64 = 0.25;
/// Consumption multiplier applied on Saturdays and Sundays.
const WEEKEND_MULTIPLIER: f64 = 0.8;
/// Hour at which the daily load curve peaks.
const PEAK_HOUR: f64 = 15.0;

/// Deterministic calendar-curve forecaster.
#[derive(Debug, Clone, Default)]
pub struct CalendarSynthetic {
    base: Option<f64>,
    swing: Option<f64>,
}

impl CalendarSynthetic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate one value per timestamp. Infallible by construction; the
    /// cascade relies on this as its last resort.
    pub fn generate(&self, timestamps: &[DateTime<Utc>]) -> Forecast {
        let base = self.base.unwrap_or(DEFAULT_BASE);
        let swing = self.swing.unwrap_or(base.abs() * DEFAULT_RELATIVE_SWING);

        let point: Vec<f64> = timestamps
            .iter()
            .map(|ts| {
                let hour = ts.hour() as f64;
                let phase = 2.0 * std::f64::consts::PI * (hour - PEAK_HOUR) / 24.0;
                let curve = base + swing * phase.cos();
                let scaled = if is_weekend(ts) {
                    curve * WEEKEND_MULTIPLIER
                } else {
                    curve
                };
                scaled.max(0.0)
            })
            .collect();

        Forecast::from_points(point)
    }
}

impl ForecastModel for CalendarSynthetic {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        if !series.is_empty() {
            self.base = Some(mean(series.values()));
            self.swing = Some(sample_stddev(series.values()));
        }
        Ok(())
    }

    fn predict(&self, timestamps: &[DateTime<Utc>]) -> Result<Forecast> {
        Ok(self.generate(timestamps))
    }

    fn tier(&self) -> ForecastTier {
        ForecastTier::Synthetic
    }

    fn name(&self) -> &'static str {
        "calendar-synthetic"
    }
}
