//! Reconstruction-error anomaly detector.
//!
//! A dense autoencoder learns to reconstruct overlapping sequences of the
//! series; the anomaly threshold is a percentile of the training
//! reconstruction errors. At detection time the last point of every
//! sequence whose error exceeds the threshold is flagged. Flagging only the
//! final timestamp under-reports contiguous anomalies; that policy is kept
//! as-is.

use crate::anomaly::zscore::{classify_causes, deviation_pct};
use crate::core::{AnomalyRecord, DetectorKind, Severity, TimeSeries, TrainingSummary};
use crate::error::{EngineError, Result};
use crate::nn::{tanh_backward, tanh_forward, Dense, ModelTrainer, TrainableNetwork, TrainerConfig};
use crate::transform::{self, ScalingState};
use crate::utils::{mean_squared_error, percentile};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Configuration for the reconstruction detector.
#[derive(Debug, Clone, Copy)]
pub struct ReconstructionConfig {
    /// Sequence window length.
    pub seq_len: usize,
    /// Percentile of training errors that becomes the anomaly threshold.
    pub percentile: f64,
    /// Width of the outer hidden layers.
    pub hidden_dim: usize,
    /// Width of the bottleneck.
    pub latent_dim: usize,
    /// Shared trainer settings.
    pub trainer: TrainerConfig,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            seq_len: 24,
            percentile: 0.95,
            hidden_dim: 16,
            latent_dim: 8,
            trainer: TrainerConfig::default(),
        }
    }
}

/// Sequence autoencoder: seq_len -> hidden -> latent -> hidden -> seq_len,
/// tanh on the hidden layers, linear output.
#[derive(Debug, Clone)]
struct Autoencoder {
    encode_in: Dense,
    encode_out: Dense,
    decode_in: Dense,
    decode_out: Dense,
    act_encode: Vec<f64>,
    act_latent: Vec<f64>,
    act_decode: Vec<f64>,
}

impl Autoencoder {
    fn new(seq_len: usize, hidden_dim: usize, latent_dim: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self {
            encode_in: Dense::new(seq_len, hidden_dim, &mut rng),
            encode_out: Dense::new(hidden_dim, latent_dim, &mut rng),
            decode_in: Dense::new(latent_dim, hidden_dim, &mut rng),
            decode_out: Dense::new(hidden_dim, seq_len, &mut rng),
            act_encode: Vec::new(),
            act_latent: Vec::new(),
            act_decode: Vec::new(),
        }
    }
}

impl TrainableNetwork for Autoencoder {
    fn forward(&mut self, input: &[f64]) -> Vec<f64> {
        self.act_encode = tanh_forward(&self.encode_in.forward(input));
        self.act_latent = tanh_forward(&self.encode_out.forward(&self.act_encode));
        self.act_decode = tanh_forward(&self.decode_in.forward(&self.act_latent));
        self.decode_out.forward(&self.act_decode)
    }

    fn backward(&mut self, d_output: &[f64]) {
        let d = self.decode_out.backward(d_output);
        let d = tanh_backward(&d, &self.act_decode);
        let d = self.decode_in.backward(&d);
        let d = tanh_backward(&d, &self.act_latent);
        let d = self.encode_out.backward(&d);
        let d = tanh_backward(&d, &self.act_encode);
        self.encode_in.backward(&d);
    }

    fn apply_gradients(&mut self, learning_rate: f64, batch_len: usize) {
        self.encode_in.apply_gradients(learning_rate, batch_len);
        self.encode_out.apply_gradients(learning_rate, batch_len);
        self.decode_in.apply_gradients(learning_rate, batch_len);
        self.decode_out.apply_gradients(learning_rate, batch_len);
    }

    fn zero_gradients(&mut self) {
        self.encode_in.zero_gradients();
        self.encode_out.zero_gradients();
        self.decode_in.zero_gradients();
        self.decode_out.zero_gradients();
    }

    fn infer(&self, input: &[f64]) -> Vec<f64> {
        let a = tanh_forward(&self.encode_in.infer(input));
        let a = tanh_forward(&self.encode_out.infer(&a));
        let a = tanh_forward(&self.decode_in.infer(&a));
        self.decode_out.infer(&a)
    }
}

struct TrainedState {
    network: Autoencoder,
    scaling: ScalingState,
    threshold: f64,
    summary: TrainingSummary,
}

/// Autoencoder-based detector with a percentile error threshold.
pub struct ReconstructionDetector {
    config: ReconstructionConfig,
    state: Option<TrainedState>,
}

impl ReconstructionDetector {
    pub fn new(config: ReconstructionConfig) -> Self {
        Self { config, state: None }
    }

    /// Train the autoencoder and fix the anomaly threshold at the
    /// configured percentile of the training reconstruction errors.
    pub fn train(&mut self, series: &TimeSeries) -> Result<TrainingSummary> {
        if !(0.0..1.0).contains(&self.config.percentile) {
            return Err(EngineError::InvalidParameter(format!(
                "percentile must be in [0, 1), got {}",
                self.config.percentile
            )));
        }
        let needed = self.config.seq_len + 1;
        if series.len() < needed {
            return Err(EngineError::InsufficientData {
                needed,
                got: series.len(),
            });
        }

        let (scaled, scaling) = transform::normalize(series.values());
        let windows = transform::sequence_windows(&scaled, self.config.seq_len)?;

        let mut network = Autoencoder::new(
            self.config.seq_len,
            self.config.hidden_dim,
            self.config.latent_dim,
            self.config.trainer.seed,
        );
        let summary = ModelTrainer::new(self.config.trainer).fit(&mut network, &windows, &windows)?;

        let errors: Vec<f64> = windows
            .iter()
            .map(|w| mean_squared_error(w, &network.infer(w)))
            .collect();
        let threshold = percentile(&errors, self.config.percentile);

        tracing::debug!(
            windows = windows.len(),
            threshold,
            final_loss = summary.final_loss,
            "reconstruction detector trained"
        );

        self.state = Some(TrainedState {
            network,
            scaling,
            threshold,
            summary,
        });
        Ok(summary)
    }

    /// Flag the last point of every sequence whose reconstruction error
    /// exceeds the trained threshold, ordered by score descending.
    pub fn detect(&self, series: &TimeSeries) -> Result<Vec<AnomalyRecord>> {
        let state = self.state.as_ref().ok_or(EngineError::ModelNotTrained)?;

        let scaled = transform::apply(series.values(), &state.scaling);
        let windows = transform::sequence_windows(&scaled, self.config.seq_len)?;

        let mut records = Vec::new();
        for (i, window) in windows.iter().enumerate() {
            let reconstruction = state.network.infer(window);
            let error = mean_squared_error(window, &reconstruction);
            if error <= state.threshold {
                continue;
            }

            let score = if state.threshold > 0.0 {
                error / state.threshold
            } else {
                f64::INFINITY
            };
            let severity = if score > 2.0 {
                Severity::High
            } else if score > 1.25 {
                Severity::Medium
            } else {
                Severity::Low
            };

            let last = i + self.config.seq_len - 1;
            let expected =
                transform::denormalize(&[*reconstruction.last().unwrap_or(&0.0)], &state.scaling)[0];
            let actual = series.values()[last];
            let deviation = deviation_pct(actual, expected);

            records.push(AnomalyRecord {
                timestamp: series.timestamps()[last],
                expected_value: expected,
                actual_value: actual,
                deviation_pct: deviation,
                severity,
                score,
                method: DetectorKind::ReconstructionError,
                possible_causes: classify_causes(deviation),
            });
        }

        records.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        tracing::debug!(flagged = records.len(), "reconstruction detection complete");
        Ok(records)
    }

    /// The trained anomaly threshold, if any.
    pub fn threshold(&self) -> Option<f64> {
        self.state.as_ref().map(|s| s.threshold)
    }

    /// Loss summary from the last training run.
    pub fn training_summary(&self) -> Option<TrainingSummary> {
        self.state.as_ref().map(|s| s.summary)
    }
}

impl Default for ReconstructionDetector {
    fn default() -> Self {
        Self::new(ReconstructionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn hourly_series(n: usize, f: impl Fn(usize) -> f64) -> TimeSeries {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let timestamps = (0..n).map(|i| base + Duration::hours(i as i64)).collect();
        let values = (0..n).map(f).collect();
        TimeSeries::new(timestamps, values).unwrap()
    }

    /// Daily sinusoid with deterministic jitter.
    fn wavy(i: usize) -> f64 {
        let hour = (i % 24) as f64;
        100.0 + 30.0 * (2.0 * std::f64::consts::PI * hour / 24.0).sin()
            + ((i * 37) % 11) as f64 * 0.5
    }

    fn fast_config() -> ReconstructionConfig {
        ReconstructionConfig {
            trainer: TrainerConfig {
                epochs: 20,
                batch_size: 32,
                learning_rate: 0.05,
                seed: 11,
                budget: None,
            },
            ..ReconstructionConfig::default()
        }
    }

    #[test]
    fn detect_before_train_fails() {
        let detector = ReconstructionDetector::default();
        let series = hourly_series(100, wavy);
        assert!(matches!(
            detector.detect(&series),
            Err(EngineError::ModelNotTrained)
        ));
    }

    #[test]
    fn train_requires_seq_len_plus_one() {
        let mut detector = ReconstructionDetector::new(fast_config());
        let series = hourly_series(24, wavy);
        assert!(matches!(
            detector.train(&series),
            Err(EngineError::InsufficientData { needed: 25, got: 24 })
        ));

        // Exactly seq_len + 1 points trains
        let series = hourly_series(25, wavy);
        assert!(detector.train(&series).is_ok());
    }

    #[test]
    fn train_rejects_bad_percentile() {
        let mut config = fast_config();
        config.percentile = 1.5;
        let mut detector = ReconstructionDetector::new(config);
        let series = hourly_series(100, wavy);
        assert!(matches!(
            detector.train(&series),
            Err(EngineError::InvalidParameter(_))
        ));
    }

    #[test]
    fn threshold_fraction_matches_percentile() {
        // 223 points -> 200 windows of 24
        let series = hourly_series(223, wavy);
        let mut detector = ReconstructionDetector::new(fast_config());
        detector.train(&series).unwrap();

        let records = detector.detect(&series).unwrap();
        // 5% of 200 windows, give or take ties at the threshold
        assert!(
            records.len() >= 3 && records.len() <= 18,
            "flagged {} of 200 windows",
            records.len()
        );
    }

    #[test]
    fn records_are_last_points_sorted_by_score() {
        let spike_at = 150;
        let series = hourly_series(223, |i| if i == spike_at { wavy(i) * 3.0 } else { wavy(i) });
        let mut detector = ReconstructionDetector::new(fast_config());
        detector.train(&series).unwrap();

        let records = detector.detect(&series).unwrap();
        assert!(!records.is_empty());

        for pair in records.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        for record in &records {
            assert_eq!(record.method, DetectorKind::ReconstructionError);
            assert!(record.score > 1.0);
        }
    }

    #[test]
    fn training_is_seed_deterministic() {
        let series = hourly_series(150, wavy);
        let mut a = ReconstructionDetector::new(fast_config());
        let mut b = ReconstructionDetector::new(fast_config());
        a.train(&series).unwrap();
        b.train(&series).unwrap();
        assert_eq!(a.threshold(), b.threshold());
        assert_eq!(a.training_summary(), b.training_summary());
    }

    #[test]
    fn constant_series_flags_nothing() {
        let series = hourly_series(100, |_| 42.0);
        let mut detector = ReconstructionDetector::new(fast_config());
        detector.train(&series).unwrap();
        // All windows reconstruct identically; none exceed the threshold
        let records = detector.detect(&series).unwrap();
        assert!(records.is_empty());
    }
}
