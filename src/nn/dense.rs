//! Fully-connected layer with hand-rolled gradients.

use rand::rngs::StdRng;
use rand::Rng;

/// A dense (fully-connected) layer, `output = W·input + b`.
///
/// `forward` caches the input for the subsequent `backward`; gradients
/// accumulate across a minibatch until `apply_gradients` consumes them.
#[derive(Debug, Clone)]
pub struct Dense {
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
    grad_weights: Vec<Vec<f64>>,
    grad_bias: Vec<f64>,
    input_cache: Vec<f64>,
}

impl Dense {
    /// Create a layer with uniform ±1/√fan_in weight initialization.
    pub fn new(input_dim: usize, output_dim: usize, rng: &mut StdRng) -> Self {
        let bound = 1.0 / (input_dim.max(1) as f64).sqrt();
        let weights = (0..output_dim)
            .map(|_| (0..input_dim).map(|_| rng.gen_range(-bound..bound)).collect())
            .collect();
        Self {
            weights,
            bias: vec![0.0; output_dim],
            grad_weights: vec![vec![0.0; input_dim]; output_dim],
            grad_bias: vec![0.0; output_dim],
            input_cache: Vec::new(),
        }
    }

    pub fn input_dim(&self) -> usize {
        self.weights.first().map(|row| row.len()).unwrap_or(0)
    }

    pub fn output_dim(&self) -> usize {
        self.weights.len()
    }

    /// Forward pass, caching the input for `backward`.
    pub fn forward(&mut self, input: &[f64]) -> Vec<f64> {
        self.input_cache = input.to_vec();
        self.infer(input)
    }

    /// Cache-free forward pass for inference.
    pub fn infer(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(self.bias.iter())
            .map(|(row, b)| row.iter().zip(input.iter()).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect()
    }

    /// Accumulate gradients from the upstream derivative and return the
    /// derivative with respect to the cached input.
    pub fn backward(&mut self, d_output: &[f64]) -> Vec<f64> {
        let input_dim = self.input_dim();
        let mut d_input = vec![0.0; input_dim];

        for (i, &d_out) in d_output.iter().enumerate() {
            self.grad_bias[i] += d_out;
            for j in 0..input_dim {
                self.grad_weights[i][j] += d_out * self.input_cache[j];
                d_input[j] += d_out * self.weights[i][j];
            }
        }
        d_input
    }

    /// Gradient-descent step averaged over the minibatch.
    pub fn apply_gradients(&mut self, learning_rate: f64, batch_len: usize) {
        let scale = learning_rate / batch_len.max(1) as f64;
        for (row, grad_row) in self.weights.iter_mut().zip(self.grad_weights.iter()) {
            for (w, g) in row.iter_mut().zip(grad_row.iter()) {
                *w -= scale * g;
            }
        }
        for (b, g) in self.bias.iter_mut().zip(self.grad_bias.iter()) {
            *b -= scale * g;
        }
    }

    pub fn zero_gradients(&mut self) {
        for row in &mut self.grad_weights {
            row.iter_mut().for_each(|g| *g = 0.0);
        }
        self.grad_bias.iter_mut().for_each(|g| *g = 0.0);
    }
}

/// Element-wise tanh with its backward pass, used between dense layers.
pub fn tanh_forward(pre: &[f64]) -> Vec<f64> {
    pre.iter().map(|x| x.tanh()).collect()
}

/// Derivative through tanh given the forward output.
pub fn tanh_backward(d_output: &[f64], output: &[f64]) -> Vec<f64> {
    d_output
        .iter()
        .zip(output.iter())
        .map(|(d, y)| d * (1.0 - y * y))
        .collect()
}
