//! Shared utility functions.

pub mod stats;

pub use stats::{mean, mean_squared_error, percentile, sample_stddev};
