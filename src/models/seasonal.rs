//! Calendar-profile statistical forecaster, the seasonal cascade tier.
//!
//! A single pass over the series accumulates the overall mean together with
//! per-hour-of-day and per-weekday means. Each future timestamp is forecast
//! as `overall_mean x hour_factor x day_factor` with a normal-approximation
//! interval. Deterministic: identical input yields identical output.

use crate::core::{Forecast, ForecastTier, TimeSeries};
use crate::error::{EngineError, Result};
use crate::models::ForecastModel;
use crate::utils::{mean, sample_stddev};
use chrono::{DateTime, Datelike, Timelike, Utc};
use statrs::distribution::{ContinuousCDF, Normal};

/// Configuration for the seasonal profile model.
#[derive(Debug, Clone, Copy)]
pub struct SeasonalConfig {
    /// Confidence level for the forecast interval.
    pub interval_level: f64,
}

impl Default for SeasonalConfig {
    fn default() -> Self {
        Self { interval_level: 0.95 }
    }
}

#[derive(Debug, Clone)]
struct Profile {
    overall_mean: f64,
    stddev: f64,
    /// Multiplier per hour of day relative to the overall mean.
    hour_factors: [f64; 24],
    /// Multiplier per weekday (Monday = 0) relative to the overall mean.
    day_factors: [f64; 7],
}

/// Hour-of-day x weekday multiplicative profile forecaster.
#[derive(Debug, Clone)]
pub struct SeasonalProfile {
    config: SeasonalConfig,
    profile: Option<Profile>,
}

impl SeasonalProfile {
    pub fn new(config: SeasonalConfig) -> Self {
        Self {
            config,
            profile: None,
        }
    }
}

impl Default for SeasonalProfile {
    fn default() -> Self {
        Self::new(SeasonalConfig::default())
    }
}

impl ForecastModel for SeasonalProfile {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        if series.len() < 2 {
            return Err(EngineError::InsufficientData {
                needed: 2,
                got: series.len(),
            });
        }

        let mut hour_sums = [0.0_f64; 24];
        let mut hour_counts = [0_usize; 24];
        let mut day_sums = [0.0_f64; 7];
        let mut day_counts = [0_usize; 7];

        for point in series.points() {
            let hour = point.timestamp.hour() as usize;
            let day = point.timestamp.weekday().num_days_from_monday() as usize;
            hour_sums[hour] += point.value;
            hour_counts[hour] += 1;
            day_sums[day] += point.value;
            day_counts[day] += 1;
        }

        let overall_mean = mean(series.values());
        let stddev = sample_stddev(series.values());

        // Buckets with no observations (or a ~zero overall mean) fall back
        // to a neutral factor of 1.
        let factor = |sum: f64, count: usize| -> f64 {
            if count == 0 || overall_mean.abs() < 1e-10 {
                1.0
            } else {
                (sum / count as f64) / overall_mean
            }
        };

        let mut hour_factors = [1.0; 24];
        for h in 0..24 {
            hour_factors[h] = factor(hour_sums[h], hour_counts[h]);
        }
        let mut day_factors = [1.0; 7];
        for d in 0..7 {
            day_factors[d] = factor(day_sums[d], day_counts[d]);
        }

        self.profile = Some(Profile {
            overall_mean,
            stddev,
            hour_factors,
            day_factors,
        });
        Ok(())
    }

    fn predict(&self, timestamps: &[DateTime<Utc>]) -> Result<Forecast> {
        let profile = self.profile.as_ref().ok_or(EngineError::ModelNotTrained)?;

        let normal = Normal::new(0.0, 1.0).unwrap();
        let z = normal.inverse_cdf((1.0 + self.config.interval_level) / 2.0);
        let half_width = z * profile.stddev;

        let mut point = Vec::with_capacity(timestamps.len());
        let mut lower = Vec::with_capacity(timestamps.len());
        let mut upper = Vec::with_capacity(timestamps.len());

        for ts in timestamps {
            let hour = ts.hour() as usize;
            let day = ts.weekday().num_days_from_monday() as usize;
            let value = profile.overall_mean * profile.hour_factors[hour] * profile.day_factors[day];
            point.push(value);
            lower.push(value - half_width);
            upper.push(value + half_width);
        }

        Ok(Forecast::with_intervals(point, lower, upper))
    }

    fn tier(&self) -> ForecastTier {
        ForecastTier::Seasonal
    }

    fn name(&self) -> &'static str {
        "seasonal-profile"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn hourly_series(n: usize, f: impl Fn(usize) -> f64) -> TimeSeries {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let timestamps = (0..n).map(|i| base + Duration::hours(i as i64)).collect();
        let values = (0..n).map(f).collect();
        TimeSeries::new(timestamps, values).unwrap()
    }

    #[test]
    fn fit_requires_two_points() {
        let mut model = SeasonalProfile::default();
        assert!(matches!(
            model.fit(&TimeSeries::empty()),
            Err(EngineError::InsufficientData { needed: 2, got: 0 })
        ));
        let one = hourly_series(1, |_| 5.0);
        assert!(matches!(
            model.fit(&one),
            Err(EngineError::InsufficientData { needed: 2, got: 1 })
        ));
    }

    #[test]
    fn predict_before_fit_fails() {
        let model = SeasonalProfile::default();
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(
            model.predict(&[base]),
            Err(EngineError::ModelNotTrained)
        ));
    }

    #[test]
    fn flat_series_forecasts_its_mean() {
        // Two full weeks, constant consumption
        let series = hourly_series(336, |_| 80.0);
        let mut model = SeasonalProfile::default();
        model.fit(&series).unwrap();

        let base = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let future: Vec<_> = (0..24).map(|i| base + Duration::hours(i)).collect();
        let forecast = model.predict(&future).unwrap();

        for &v in &forecast.point {
            assert_relative_eq!(v, 80.0, epsilon = 1e-9);
        }
        // Zero variance: interval collapses
        assert_relative_eq!(forecast.upper[0] - forecast.lower[0], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn hourly_pattern_is_reproduced() {
        // Daytime hours run hot, nights run cold
        let series = hourly_series(336, |i| if (8..20).contains(&(i % 24)) { 150.0 } else { 50.0 });
        let mut model = SeasonalProfile::default();
        model.fit(&series).unwrap();

        let base = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let noon = base + Duration::hours(12);
        let midnight = base;
        let forecast = model.predict(&[midnight, noon]).unwrap();

        assert!(forecast.point[1] > forecast.point[0]);
        assert_relative_eq!(forecast.point[0], 50.0, epsilon = 1e-6);
        assert_relative_eq!(forecast.point[1], 150.0, epsilon = 1e-6);
    }

    #[test]
    fn interval_width_tracks_stddev() {
        let series = hourly_series(168, |i| 100.0 + if i % 2 == 0 { 10.0 } else { -10.0 });
        let mut model = SeasonalProfile::default();
        model.fit(&series).unwrap();

        let stddev = sample_stddev(series.values());
        let base = Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap();
        let forecast = model.predict(&[base]).unwrap();

        let width = forecast.upper[0] - forecast.lower[0];
        // 2 x 1.959964 x stddev
        assert_relative_eq!(width, 2.0 * 1.959964 * stddev, epsilon = 1e-3);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let series = hourly_series(200, |i| 60.0 + ((i * 7) % 13) as f64);
        let mut model = SeasonalProfile::default();
        model.fit(&series).unwrap();

        let base = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let future: Vec<_> = (0..24).map(|i| base + Duration::hours(i)).collect();
        assert_eq!(model.predict(&future).unwrap(), model.predict(&future).unwrap());
    }

    #[test]
    fn all_zero_series_forecasts_zero() {
        let series = hourly_series(48, |_| 0.0);
        let mut model = SeasonalProfile::default();
        model.fit(&series).unwrap();

        let base = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
        let forecast = model.predict(&[base]).unwrap();
        assert_relative_eq!(forecast.point[0], 0.0, epsilon = 1e-12);
    }
}
