//! Min-max scaling with exact inverse transform.

/// Parameters of a min-max scaling, kept for the inverse transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingState {
    pub min: f64,
    pub max: f64,
    /// Set when min == max: the scaled series is all zeros instead of a
    /// division by zero.
    pub degenerate: bool,
}

impl ScalingState {
    fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Min-max scale to [0, 1], returning the scaled data and the state needed
/// to invert it. A constant series scales to all zeros with the
/// `degenerate` flag set.
pub fn normalize(values: &[f64]) -> (Vec<f64>, ScalingState) {
    if values.is_empty() {
        let state = ScalingState {
            min: 0.0,
            max: 0.0,
            degenerate: true,
        };
        return (Vec::new(), state);
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let degenerate = (max - min).abs() < 1e-10;

    let state = ScalingState { min, max, degenerate };
    (apply(values, &state), state)
}

/// Scale new data with an existing state.
pub fn apply(values: &[f64], state: &ScalingState) -> Vec<f64> {
    if state.degenerate {
        return vec![0.0; values.len()];
    }
    let range = state.range();
    values.iter().map(|&x| (x - state.min) / range).collect()
}

/// Exact inverse of [`normalize`]/[`apply`]. For a degenerate state every
/// scaled value maps back to the constant `min`.
pub fn denormalize(scaled: &[f64], state: &ScalingState) -> Vec<f64> {
    if state.degenerate {
        return vec![state.min; scaled.len()];
    }
    let range = state.range();
    scaled.iter().map(|&x| x * range + state.min).collect()
}
