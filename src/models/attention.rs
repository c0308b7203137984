//! Attention-based sequence forecaster, the advanced cascade tier.
//!
//! An additive-attention encoder over the scaled input window: each position
//! gets a learned value embedding plus a fixed sinusoidal positional code,
//! passes through a tanh layer, and a learned query pools the sequence with
//! softmax attention. A linear head emits the whole forecast horizon at
//! once. Trained with the shared minibatch trainer on stride-1 windows.

use crate::core::{Forecast, ForecastTier, TimeSeries, TrainingSummary};
use crate::error::{EngineError, Result};
use crate::models::ForecastModel;
use crate::nn::{ModelTrainer, TrainableNetwork, TrainerConfig};
use crate::transform::{self, ScalingState};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Minimum observations before the advanced tier will train at all.
pub const MIN_TRAIN_POINTS: usize = 100;

/// Shortest encoder window the model will shrink to on short histories.
const MIN_ENCODER_LEN: usize = 24;

/// Configuration for the attention forecaster.
#[derive(Debug, Clone, Copy)]
pub struct AttentionConfig {
    /// Historical window length fed to the encoder (7 days of hourly data).
    pub encoder_len: usize,
    /// Number of future points emitted per forward pass.
    pub horizon: usize,
    /// Embedding width.
    pub d_model: usize,
    /// Shared trainer settings.
    pub trainer: TrainerConfig,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            encoder_len: 168,
            horizon: 24,
            d_model: 32,
            trainer: TrainerConfig::default(),
        }
    }
}

/// The encoder network. All parameters and gradients are plain `f64`
/// matrices; `forward` caches activations for `backward`.
#[derive(Debug, Clone)]
struct AttentionNetwork {
    input_len: usize,
    d_model: usize,
    horizon: usize,

    // Parameters
    w_val: Vec<f64>,
    w_hidden: Vec<Vec<f64>>,
    b_hidden: Vec<f64>,
    query: Vec<f64>,
    w_out: Vec<Vec<f64>>,
    b_out: Vec<f64>,
    positional: Vec<Vec<f64>>,

    // Gradient accumulators
    g_w_val: Vec<f64>,
    g_w_hidden: Vec<Vec<f64>>,
    g_b_hidden: Vec<f64>,
    g_query: Vec<f64>,
    g_w_out: Vec<Vec<f64>>,
    g_b_out: Vec<f64>,

    // Forward caches
    cache_input: Vec<f64>,
    cache_embed: Vec<Vec<f64>>,
    cache_hidden: Vec<Vec<f64>>,
    cache_attention: Vec<f64>,
    cache_context: Vec<f64>,
}

impl AttentionNetwork {
    fn new(input_len: usize, horizon: usize, d_model: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let bound_d = 1.0 / (d_model as f64).sqrt();
        let uniform =
            |rng: &mut StdRng, n: usize, b: f64| (0..n).map(|_| rng.gen_range(-b..b)).collect::<Vec<f64>>();

        let w_val = uniform(&mut rng, d_model, 1.0);
        let w_hidden = (0..d_model).map(|_| uniform(&mut rng, d_model, bound_d)).collect();
        let query = uniform(&mut rng, d_model, bound_d);
        let w_out = (0..horizon).map(|_| uniform(&mut rng, d_model, bound_d)).collect();

        Self {
            input_len,
            d_model,
            horizon,
            w_val,
            w_hidden,
            b_hidden: vec![0.0; d_model],
            query,
            w_out,
            b_out: vec![0.0; horizon],
            positional: sinusoidal_positions(input_len, d_model),
            g_w_val: vec![0.0; d_model],
            g_w_hidden: vec![vec![0.0; d_model]; d_model],
            g_b_hidden: vec![0.0; d_model],
            g_query: vec![0.0; d_model],
            g_w_out: vec![vec![0.0; d_model]; horizon],
            g_b_out: vec![0.0; horizon],
            cache_input: Vec::new(),
            cache_embed: Vec::new(),
            cache_hidden: Vec::new(),
            cache_attention: Vec::new(),
            cache_context: Vec::new(),
        }
    }

    /// One full pass: embeddings, hidden states, attention weights,
    /// context, output.
    #[allow(clippy::type_complexity)]
    fn run(&self, input: &[f64]) -> (Vec<Vec<f64>>, Vec<Vec<f64>>, Vec<f64>, Vec<f64>, Vec<f64>) {
        let d = self.d_model;
        let len = input.len().min(self.input_len);

        let mut embed = Vec::with_capacity(len);
        let mut hidden = Vec::with_capacity(len);
        let mut scores = Vec::with_capacity(len);

        for (t, &x) in input.iter().take(len).enumerate() {
            let e: Vec<f64> = (0..d).map(|j| self.w_val[j] * x + self.positional[t][j]).collect();
            let h: Vec<f64> = (0..d)
                .map(|i| {
                    let pre: f64 = self.w_hidden[i]
                        .iter()
                        .zip(e.iter())
                        .map(|(w, ej)| w * ej)
                        .sum::<f64>()
                        + self.b_hidden[i];
                    pre.tanh()
                })
                .collect();
            scores.push(self.query.iter().zip(h.iter()).map(|(q, hj)| q * hj).sum::<f64>());
            embed.push(e);
            hidden.push(h);
        }

        let attention = softmax(&scores);
        let mut context = vec![0.0; d];
        for (t, h) in hidden.iter().enumerate() {
            for j in 0..d {
                context[j] += attention[t] * h[j];
            }
        }

        let output: Vec<f64> = self
            .w_out
            .iter()
            .zip(self.b_out.iter())
            .map(|(row, b)| row.iter().zip(context.iter()).map(|(w, c)| w * c).sum::<f64>() + b)
            .collect();

        (embed, hidden, attention, context, output)
    }
}

impl TrainableNetwork for AttentionNetwork {
    fn forward(&mut self, input: &[f64]) -> Vec<f64> {
        let (embed, hidden, attention, context, output) = self.run(input);
        self.cache_input = input.to_vec();
        self.cache_embed = embed;
        self.cache_hidden = hidden;
        self.cache_attention = attention;
        self.cache_context = context;
        output
    }

    fn backward(&mut self, d_output: &[f64]) {
        let d = self.d_model;
        let len = self.cache_hidden.len();

        // Output head
        let mut d_context = vec![0.0; d];
        for (k, &dy) in d_output.iter().enumerate() {
            self.g_b_out[k] += dy;
            for j in 0..d {
                self.g_w_out[k][j] += dy * self.cache_context[j];
                d_context[j] += dy * self.w_out[k][j];
            }
        }

        // Context is the attention-weighted sum of hidden states
        let mut d_attention = vec![0.0; len];
        let mut d_hidden = vec![vec![0.0; d]; len];
        for t in 0..len {
            let h = &self.cache_hidden[t];
            d_attention[t] = d_context.iter().zip(h.iter()).map(|(dc, hj)| dc * hj).sum();
            for j in 0..d {
                d_hidden[t][j] = self.cache_attention[t] * d_context[j];
            }
        }

        // Softmax over the scores
        let weighted: f64 = self
            .cache_attention
            .iter()
            .zip(d_attention.iter())
            .map(|(a, da)| a * da)
            .sum();
        let d_scores: Vec<f64> = self
            .cache_attention
            .iter()
            .zip(d_attention.iter())
            .map(|(a, da)| a * (da - weighted))
            .collect();

        // Scores are query·hidden
        for t in 0..len {
            let h = &self.cache_hidden[t];
            for j in 0..d {
                self.g_query[j] += d_scores[t] * h[j];
                d_hidden[t][j] += d_scores[t] * self.query[j];
            }
        }

        // Tanh layer and embeddings
        for t in 0..len {
            let h = &self.cache_hidden[t];
            let e = &self.cache_embed[t];
            let d_pre: Vec<f64> = (0..d).map(|i| d_hidden[t][i] * (1.0 - h[i] * h[i])).collect();

            let mut d_embed = vec![0.0; d];
            for i in 0..d {
                self.g_b_hidden[i] += d_pre[i];
                for j in 0..d {
                    self.g_w_hidden[i][j] += d_pre[i] * e[j];
                    d_embed[j] += d_pre[i] * self.w_hidden[i][j];
                }
            }
            for j in 0..d {
                self.g_w_val[j] += d_embed[j] * self.cache_input[t];
            }
        }
    }

    fn apply_gradients(&mut self, learning_rate: f64, batch_len: usize) {
        let scale = learning_rate / batch_len.max(1) as f64;
        let step = |params: &mut [f64], grads: &[f64]| {
            for (p, g) in params.iter_mut().zip(grads.iter()) {
                *p -= scale * g;
            }
        };
        step(&mut self.w_val, &self.g_w_val);
        step(&mut self.b_hidden, &self.g_b_hidden);
        step(&mut self.query, &self.g_query);
        step(&mut self.b_out, &self.g_b_out);
        for (row, grad_row) in self.w_hidden.iter_mut().zip(self.g_w_hidden.iter()) {
            for (p, g) in row.iter_mut().zip(grad_row.iter()) {
                *p -= scale * g;
            }
        }
        for (row, grad_row) in self.w_out.iter_mut().zip(self.g_w_out.iter()) {
            for (p, g) in row.iter_mut().zip(grad_row.iter()) {
                *p -= scale * g;
            }
        }
    }

    fn zero_gradients(&mut self) {
        self.g_w_val.iter_mut().for_each(|g| *g = 0.0);
        self.g_b_hidden.iter_mut().for_each(|g| *g = 0.0);
        self.g_query.iter_mut().for_each(|g| *g = 0.0);
        self.g_b_out.iter_mut().for_each(|g| *g = 0.0);
        for row in &mut self.g_w_hidden {
            row.iter_mut().for_each(|g| *g = 0.0);
        }
        for row in &mut self.g_w_out {
            row.iter_mut().for_each(|g| *g = 0.0);
        }
    }

    fn infer(&self, input: &[f64]) -> Vec<f64> {
        self.run(input).4
    }
}

/// Standard transformer positional encoding.
fn sinusoidal_positions(len: usize, d_model: usize) -> Vec<Vec<f64>> {
    (0..len)
        .map(|t| {
            (0..d_model)
                .map(|j| {
                    let freq = 10_000_f64.powf(-((j / 2 * 2) as f64) / d_model as f64);
                    let angle = t as f64 * freq;
                    if j % 2 == 0 {
                        angle.sin()
                    } else {
                        angle.cos()
                    }
                })
                .collect()
        })
        .collect()
}

/// Numerically stable softmax.
fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

struct TrainedState {
    network: AttentionNetwork,
    scaling: ScalingState,
    /// Scaled most-recent encoder window, the prediction context.
    context: Vec<f64>,
    summary: TrainingSummary,
}

/// Attention-based sequence forecaster.
pub struct AttentionForecaster {
    config: AttentionConfig,
    state: Option<TrainedState>,
}

impl AttentionForecaster {
    pub fn new(config: AttentionConfig) -> Self {
        Self { config, state: None }
    }
}

impl Default for AttentionForecaster {
    fn default() -> Self {
        Self::new(AttentionConfig::default())
    }
}

impl ForecastModel for AttentionForecaster {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        let n = series.len();
        if n < MIN_TRAIN_POINTS {
            return Err(EngineError::InsufficientData {
                needed: MIN_TRAIN_POINTS,
                got: n,
            });
        }
        let horizon = self.config.horizon;
        if n < horizon + MIN_ENCODER_LEN {
            return Err(EngineError::InsufficientData {
                needed: horizon + MIN_ENCODER_LEN,
                got: n,
            });
        }
        // Shrink the encoder on short histories so the >= MIN_TRAIN_POINTS
        // contract stays honest.
        let encoder_len = self.config.encoder_len.min(n - horizon);

        let (scaled, scaling) = transform::normalize(series.values());
        let pairs = transform::training_windows(&scaled, encoder_len, horizon)?;
        let (inputs, targets): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();

        let mut network =
            AttentionNetwork::new(encoder_len, horizon, self.config.d_model, self.config.trainer.seed);
        let summary = ModelTrainer::new(self.config.trainer)
            .fit(&mut network, &inputs, &targets)
            .map_err(|e| e.in_method(self.name()))?;

        tracing::debug!(
            encoder_len,
            horizon,
            final_loss = summary.final_loss,
            "attention forecaster trained"
        );

        let context = scaled[n - encoder_len..].to_vec();
        self.state = Some(TrainedState {
            network,
            scaling,
            context,
            summary,
        });
        Ok(())
    }

    fn predict(&self, timestamps: &[DateTime<Utc>]) -> Result<Forecast> {
        let state = self.state.as_ref().ok_or(EngineError::ModelNotTrained)?;
        if timestamps.len() > state.network.horizon {
            return Err(EngineError::InvalidParameter(format!(
                "requested horizon {} exceeds trained horizon {}",
                timestamps.len(),
                state.network.horizon
            )));
        }

        let scaled = state.network.infer(&state.context);
        let mut values = transform::denormalize(&scaled, &state.scaling);
        values.truncate(timestamps.len());
        // No native interval: bounds collapse onto the point estimate.
        Ok(Forecast::from_points(values))
    }

    fn tier(&self) -> ForecastTier {
        ForecastTier::Advanced
    }

    fn name(&self) -> &'static str {
        "attention-seq"
    }

    fn training_summary(&self) -> Option<TrainingSummary> {
        self.state.as_ref().map(|s| s.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::mean_squared_error;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn hourly_series(n: usize, f: impl Fn(usize) -> f64) -> TimeSeries {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let timestamps = (0..n).map(|i| base + Duration::hours(i as i64)).collect();
        let values = (0..n).map(f).collect();
        TimeSeries::new(timestamps, values).unwrap()
    }

    fn small_config() -> AttentionConfig {
        AttentionConfig {
            encoder_len: 24,
            horizon: 12,
            d_model: 8,
            trainer: TrainerConfig {
                epochs: 5,
                batch_size: 16,
                learning_rate: 0.05,
                seed: 7,
                budget: None,
            },
        }
    }

    #[test]
    fn fit_rejects_short_series() {
        let series = hourly_series(50, |i| i as f64);
        let mut model = AttentionForecaster::default();
        assert!(matches!(
            model.fit(&series),
            Err(EngineError::InsufficientData { needed: 100, got: 50 })
        ));
    }

    #[test]
    fn predict_before_fit_fails() {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let model = AttentionForecaster::default();
        assert!(matches!(
            model.predict(&[base]),
            Err(EngineError::ModelNotTrained)
        ));
    }

    #[test]
    fn fit_predict_round() {
        let series = hourly_series(120, |i| {
            100.0 + 20.0 * (2.0 * std::f64::consts::PI * (i % 24) as f64 / 24.0).sin()
        });
        let mut model = AttentionForecaster::new(small_config());
        model.fit(&series).unwrap();

        let summary = model.training_summary().unwrap();
        assert_eq!(summary.epochs, 5);
        assert!(summary.final_loss.is_finite());
        assert!(summary.best_loss <= summary.final_loss);

        let base = Utc.with_ymd_and_hms(2024, 1, 6, 0, 0, 0).unwrap();
        let future: Vec<_> = (0..12).map(|i| base + Duration::hours(i)).collect();
        let forecast = model.predict(&future).unwrap();

        assert_eq!(forecast.horizon(), 12);
        assert_eq!(forecast.point, forecast.lower);
        assert_eq!(forecast.point, forecast.upper);
        for v in &forecast.point {
            assert!(v.is_finite());
        }
    }

    #[test]
    fn fit_is_seed_deterministic() {
        let series = hourly_series(120, |i| 50.0 + (i % 24) as f64);
        let base = Utc.with_ymd_and_hms(2024, 1, 6, 0, 0, 0).unwrap();
        let future: Vec<_> = (0..12).map(|i| base + Duration::hours(i)).collect();

        let mut a = AttentionForecaster::new(small_config());
        let mut b = AttentionForecaster::new(small_config());
        a.fit(&series).unwrap();
        b.fit(&series).unwrap();

        assert_eq!(a.predict(&future).unwrap(), b.predict(&future).unwrap());
    }

    #[test]
    fn fit_shrinks_encoder_on_short_history() {
        // 120 points with default encoder 168: effective encoder is 120 - 24
        let mut config = small_config();
        config.encoder_len = 168;
        config.horizon = 24;
        let series = hourly_series(120, |i| (i % 24) as f64);

        let mut model = AttentionForecaster::new(config);
        model.fit(&series).unwrap();

        let base = Utc.with_ymd_and_hms(2024, 1, 6, 0, 0, 0).unwrap();
        let future: Vec<_> = (0..24).map(|i| base + Duration::hours(i)).collect();
        assert_eq!(model.predict(&future).unwrap().horizon(), 24);
    }

    #[test]
    fn fit_propagates_instability_with_method_name() {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let timestamps: Vec<_> = (0..120).map(|i| base + Duration::hours(i)).collect();
        let mut values: Vec<f64> = (0..120).map(|i| i as f64).collect();
        values[60] = f64::NAN;
        let series = TimeSeries::new(timestamps, values).unwrap();

        let mut model = AttentionForecaster::new(small_config());
        let err = model.fit(&series).unwrap_err();
        assert!(matches!(err, EngineError::MethodFailed { .. }));
        assert!(err.to_string().starts_with("attention-seq:"));
    }

    #[test]
    fn network_gradients_match_finite_differences() {
        let mut net = AttentionNetwork::new(4, 2, 3, 13);
        let input = vec![0.2, 0.8, 0.5, 0.1];
        let target = vec![0.4, 0.6];

        let output = net.forward(&input);
        let d_output: Vec<f64> = output
            .iter()
            .zip(target.iter())
            .map(|(y, t)| 2.0 * (y - t) / target.len() as f64)
            .collect();
        net.zero_gradients();
        net.backward(&d_output);

        let loss = |net: &AttentionNetwork| mean_squared_error(&target, &net.infer(&input));
        let eps = 1e-6;

        // Spot-check every parameter family with central differences.
        let mut bumped = net.clone();
        bumped.w_val[1] += eps;
        let mut lowered = net.clone();
        lowered.w_val[1] -= eps;
        let numeric = (loss(&bumped) - loss(&lowered)) / (2.0 * eps);
        assert_relative_eq!(net.g_w_val[1], numeric, epsilon = 1e-5);

        let mut bumped = net.clone();
        bumped.query[2] += eps;
        let mut lowered = net.clone();
        lowered.query[2] -= eps;
        let numeric = (loss(&bumped) - loss(&lowered)) / (2.0 * eps);
        assert_relative_eq!(net.g_query[2], numeric, epsilon = 1e-5);

        let mut bumped = net.clone();
        bumped.w_hidden[1][2] += eps;
        let mut lowered = net.clone();
        lowered.w_hidden[1][2] -= eps;
        let numeric = (loss(&bumped) - loss(&lowered)) / (2.0 * eps);
        assert_relative_eq!(net.g_w_hidden[1][2], numeric, epsilon = 1e-5);

        let mut bumped = net.clone();
        bumped.w_out[0][1] += eps;
        let mut lowered = net.clone();
        lowered.w_out[0][1] -= eps;
        let numeric = (loss(&bumped) - loss(&lowered)) / (2.0 * eps);
        assert_relative_eq!(net.g_w_out[0][1], numeric, epsilon = 1e-5);

        let mut bumped = net.clone();
        bumped.b_hidden[0] += eps;
        let mut lowered = net.clone();
        lowered.b_hidden[0] -= eps;
        let numeric = (loss(&bumped) - loss(&lowered)) / (2.0 * eps);
        assert_relative_eq!(net.g_b_hidden[0], numeric, epsilon = 1e-5);
    }

    #[test]
    fn softmax_sums_to_one() {
        let a = softmax(&[1.0, 2.0, 3.0]);
        assert_relative_eq!(a.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(a[2] > a[1] && a[1] > a[0]);
    }
}
