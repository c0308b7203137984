//! Shared gradient-based training loop.
//!
//! Both the attention forecaster and the reconstruction autoencoder train
//! through [`ModelTrainer`]: minibatch gradient descent minimizing mean
//! squared error over a fixed epoch budget, with an explicit seed for
//! reproducible shuffling and an optional wall-clock budget.

pub mod dense;

pub use dense::{tanh_backward, tanh_forward, Dense};

use crate::core::TrainingSummary;
use crate::error::{EngineError, Result};
use crate::utils::mean_squared_error;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::time::{Duration, Instant};

/// A network trainable by [`ModelTrainer`].
///
/// `forward` caches activations for `backward`; `infer` is the cache-free
/// path used at prediction time.
pub trait TrainableNetwork {
    fn forward(&mut self, input: &[f64]) -> Vec<f64>;
    fn backward(&mut self, d_output: &[f64]);
    fn apply_gradients(&mut self, learning_rate: f64, batch_len: usize);
    fn zero_gradients(&mut self);
    fn infer(&self, input: &[f64]) -> Vec<f64>;
}

/// Configuration for the shared training loop.
#[derive(Debug, Clone, Copy)]
pub struct TrainerConfig {
    /// Fixed epoch budget.
    pub epochs: usize,
    /// Minibatch size.
    pub batch_size: usize,
    /// Gradient-descent step size.
    pub learning_rate: f64,
    /// Seed for shuffling (weight init is seeded by the owning model).
    pub seed: u64,
    /// Optional wall-clock budget; exceeding it aborts training with
    /// `ResourceExhausted`.
    pub budget: Option<Duration>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            epochs: 50,
            batch_size: 32,
            learning_rate: 0.01,
            seed: 42,
            budget: None,
        }
    }
}

impl TrainerConfig {
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }
}

/// Minibatch gradient-descent trainer minimizing mean squared error.
#[derive(Debug, Clone, Default)]
pub struct ModelTrainer {
    config: TrainerConfig,
}

impl ModelTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    /// Train `network` on parallel `inputs`/`targets` slices.
    ///
    /// Returns the loss trajectory summary. Fails with
    /// `NumericalInstability` when an epoch loss goes non-finite and
    /// `ResourceExhausted` when the configured budget runs out.
    pub fn fit<N: TrainableNetwork>(
        &self,
        network: &mut N,
        inputs: &[Vec<f64>],
        targets: &[Vec<f64>],
    ) -> Result<TrainingSummary> {
        if inputs.is_empty() {
            return Err(EngineError::InsufficientData { needed: 1, got: 0 });
        }
        if inputs.len() != targets.len() {
            return Err(EngineError::InvalidParameter(format!(
                "inputs and targets differ in length: {} vs {}",
                inputs.len(),
                targets.len()
            )));
        }

        let started = Instant::now();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut indices: Vec<usize> = (0..inputs.len()).collect();

        let mut final_loss = f64::INFINITY;
        let mut best_loss = f64::INFINITY;

        for epoch in 0..self.config.epochs {
            if let Some(budget) = self.config.budget {
                if started.elapsed() >= budget {
                    return Err(EngineError::ResourceExhausted(format!(
                        "training budget of {budget:?} exhausted at epoch {epoch}"
                    )));
                }
            }

            indices.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for batch in indices.chunks(self.config.batch_size.max(1)) {
                network.zero_gradients();
                for &i in batch {
                    let output = network.forward(&inputs[i]);
                    epoch_loss += mean_squared_error(&targets[i], &output);

                    let n_out = output.len() as f64;
                    let d_output: Vec<f64> = output
                        .iter()
                        .zip(targets[i].iter())
                        .map(|(y, t)| 2.0 * (y - t) / n_out)
                        .collect();
                    network.backward(&d_output);
                }
                network.apply_gradients(self.config.learning_rate, batch.len());
            }

            epoch_loss /= inputs.len() as f64;
            if !epoch_loss.is_finite() {
                return Err(EngineError::NumericalInstability(format!(
                    "non-finite loss at epoch {epoch}"
                )));
            }

            final_loss = epoch_loss;
            if epoch_loss < best_loss {
                best_loss = epoch_loss;
            }
            if epoch % 10 == 0 {
                tracing::debug!(epoch, loss = epoch_loss, "training epoch complete");
            }
        }

        Ok(TrainingSummary {
            final_loss,
            best_loss,
            epochs: self.config.epochs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    /// Minimal one-layer network for exercising the trainer.
    struct Linear {
        layer: Dense,
    }

    impl Linear {
        fn new(seed: u64) -> Self {
            let mut rng = StdRng::seed_from_u64(seed);
            Self {
                layer: Dense::new(1, 1, &mut rng),
            }
        }
    }

    impl TrainableNetwork for Linear {
        fn forward(&mut self, input: &[f64]) -> Vec<f64> {
            self.layer.forward(input)
        }
        fn backward(&mut self, d_output: &[f64]) {
            self.layer.backward(d_output);
        }
        fn apply_gradients(&mut self, learning_rate: f64, batch_len: usize) {
            self.layer.apply_gradients(learning_rate, batch_len);
        }
        fn zero_gradients(&mut self) {
            self.layer.zero_gradients();
        }
        fn infer(&self, input: &[f64]) -> Vec<f64> {
            self.layer.infer(input)
        }
    }

    fn linear_dataset(n: usize) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
        let mut rng = StdRng::seed_from_u64(99);
        let inputs: Vec<Vec<f64>> = (0..n).map(|_| vec![rng.gen_range(-1.0..1.0)]).collect();
        let targets: Vec<Vec<f64>> = inputs.iter().map(|x| vec![2.0 * x[0] + 0.5]).collect();
        (inputs, targets)
    }

    #[test]
    fn trainer_fits_a_linear_map() {
        let (inputs, targets) = linear_dataset(64);
        let mut net = Linear::new(3);

        let config = TrainerConfig {
            epochs: 200,
            batch_size: 16,
            learning_rate: 0.1,
            seed: 1,
            budget: None,
        };
        let summary = ModelTrainer::new(config).fit(&mut net, &inputs, &targets).unwrap();

        assert_eq!(summary.epochs, 200);
        assert!(summary.final_loss < 1e-3, "final loss {}", summary.final_loss);
        assert!(summary.best_loss <= summary.final_loss);

        let y = net.infer(&[0.25]);
        assert!((y[0] - 1.0).abs() < 0.05);
    }

    #[test]
    fn trainer_is_seed_deterministic() {
        let (inputs, targets) = linear_dataset(32);
        let config = TrainerConfig::default().with_epochs(20);

        let mut a = Linear::new(5);
        let mut b = Linear::new(5);
        let sa = ModelTrainer::new(config).fit(&mut a, &inputs, &targets).unwrap();
        let sb = ModelTrainer::new(config).fit(&mut b, &inputs, &targets).unwrap();

        assert_eq!(sa, sb);
        assert_eq!(a.infer(&[0.7]), b.infer(&[0.7]));
    }

    #[test]
    fn trainer_rejects_empty_dataset() {
        let mut net = Linear::new(1);
        let err = ModelTrainer::default().fit(&mut net, &[], &[]);
        assert!(matches!(err, Err(EngineError::InsufficientData { .. })));
    }

    #[test]
    fn trainer_rejects_mismatched_lengths() {
        let mut net = Linear::new(1);
        let err = ModelTrainer::default().fit(&mut net, &[vec![1.0]], &[]);
        assert!(matches!(err, Err(EngineError::InvalidParameter(_))));
    }

    #[test]
    fn trainer_reports_instability_on_nan_input() {
        let mut net = Linear::new(1);
        let inputs = vec![vec![f64::NAN]];
        let targets = vec![vec![1.0]];
        let err = ModelTrainer::default().fit(&mut net, &inputs, &targets);
        assert!(matches!(err, Err(EngineError::NumericalInstability(_))));
    }

    #[test]
    fn trainer_honors_zero_budget() {
        let (inputs, targets) = linear_dataset(8);
        let mut net = Linear::new(1);
        let config = TrainerConfig::default().with_budget(Duration::from_secs(0));
        let err = ModelTrainer::new(config).fit(&mut net, &inputs, &targets);
        assert!(matches!(err, Err(EngineError::ResourceExhausted(_))));
    }
}
