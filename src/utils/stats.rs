//! Statistical helpers shared across models and detectors.

/// Arithmetic mean. Zero for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator). Zero below two points.
pub fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Interpolated percentile, `q` in [0, 1]. NaN for an empty slice.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;

    if lower == upper || upper >= sorted.len() {
        sorted[lower.min(sorted.len() - 1)]
    } else {
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// Mean squared error between two equal-length slices.
pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    debug_assert_eq!(actual.len(), predicted.len());
    if actual.is_empty() {
        return 0.0;
    }
    actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_basic() {
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0, 4.0]), 2.5, epsilon = 1e-10);
        assert_relative_eq!(mean(&[]), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn stddev_basic() {
        // Sample std of [1..5] is sqrt(2.5)
        let s = sample_stddev(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_relative_eq!(s, 2.5_f64.sqrt(), epsilon = 1e-10);
    }

    #[test]
    fn stddev_degenerate() {
        assert_relative_eq!(sample_stddev(&[7.0]), 0.0, epsilon = 1e-10);
        assert_relative_eq!(sample_stddev(&[3.0; 10]), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn percentile_interpolates() {
        let values = vec![1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(percentile(&values, 0.0), 1.0, epsilon = 1e-10);
        assert_relative_eq!(percentile(&values, 1.0), 4.0, epsilon = 1e-10);
        assert_relative_eq!(percentile(&values, 0.5), 2.5, epsilon = 1e-10);
    }

    #[test]
    fn percentile_unsorted_input() {
        let values = vec![4.0, 1.0, 3.0, 2.0];
        assert_relative_eq!(percentile(&values, 0.5), 2.5, epsilon = 1e-10);
    }

    #[test]
    fn percentile_empty_is_nan() {
        assert!(percentile(&[], 0.5).is_nan());
    }

    #[test]
    fn mse_basic() {
        let mse = mean_squared_error(&[1.0, 2.0, 3.0], &[1.0, 2.0, 5.0]);
        assert_relative_eq!(mse, 4.0 / 3.0, epsilon = 1e-10);
    }
}
