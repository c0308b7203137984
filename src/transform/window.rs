//! Sliding-window slicing for supervised training and anomaly sequencing.

use crate::error::{EngineError, Result};

/// Slice a series into stride-1 (input, target) training pairs.
///
/// Each pair covers `encoder_len` input points followed by `horizon` target
/// points. Fails with `InsufficientData` when the series is shorter than
/// `encoder_len + horizon`; exactly at that length it yields one pair.
pub fn training_windows(
    values: &[f64],
    encoder_len: usize,
    horizon: usize,
) -> Result<Vec<(Vec<f64>, Vec<f64>)>> {
    if encoder_len == 0 || horizon == 0 {
        return Err(EngineError::InvalidParameter(
            "encoder length and horizon must be positive".to_string(),
        ));
    }
    let needed = encoder_len + horizon;
    if values.len() < needed {
        return Err(EngineError::InsufficientData {
            needed,
            got: values.len(),
        });
    }

    let count = values.len() - needed + 1;
    let mut pairs = Vec::with_capacity(count);
    for start in 0..count {
        let input = values[start..start + encoder_len].to_vec();
        let target = values[start + encoder_len..start + needed].to_vec();
        pairs.push((input, target));
    }
    Ok(pairs)
}

/// Slice a series into stride-1 windows of `seq_len` with no target,
/// as consumed by the reconstruction detector.
///
/// Fails with `InsufficientData` below `seq_len`; exactly at it, one window.
pub fn sequence_windows(values: &[f64], seq_len: usize) -> Result<Vec<Vec<f64>>> {
    if seq_len == 0 {
        return Err(EngineError::InvalidParameter(
            "sequence length must be positive".to_string(),
        ));
    }
    if values.len() < seq_len {
        return Err(EngineError::InsufficientData {
            needed: seq_len,
            got: values.len(),
        });
    }

    Ok(values.windows(seq_len).map(|w| w.to_vec()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn training_windows_stride_one() {
        let values: Vec<f64> = (0..6).map(|i| i as f64).collect();
        let pairs = training_windows(&values, 3, 2).unwrap();

        // 6 - (3 + 2) + 1 = 2 pairs
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, vec![0.0, 1.0, 2.0]);
        assert_eq!(pairs[0].1, vec![3.0, 4.0]);
        assert_eq!(pairs[1].0, vec![1.0, 2.0, 3.0]);
        assert_eq!(pairs[1].1, vec![4.0, 5.0]);
    }

    #[test]
    fn training_windows_boundary_exact() {
        let values: Vec<f64> = (0..5).map(|i| i as f64).collect();

        // Exactly encoder + horizon points: one pair
        let pairs = training_windows(&values, 3, 2).unwrap();
        assert_eq!(pairs.len(), 1);

        // One short: error
        let err = training_windows(&values[..4], 3, 2);
        assert!(matches!(
            err,
            Err(EngineError::InsufficientData { needed: 5, got: 4 })
        ));
    }

    #[test]
    fn training_windows_rejects_zero_lengths() {
        let values = vec![1.0, 2.0, 3.0];
        assert!(matches!(
            training_windows(&values, 0, 2),
            Err(EngineError::InvalidParameter(_))
        ));
        assert!(matches!(
            training_windows(&values, 2, 0),
            Err(EngineError::InvalidParameter(_))
        ));
    }

    #[test]
    fn sequence_windows_stride_one() {
        let values: Vec<f64> = (0..5).map(|i| i as f64).collect();
        let windows = sequence_windows(&values, 3).unwrap();

        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0], vec![0.0, 1.0, 2.0]);
        assert_eq!(windows[2], vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn sequence_windows_boundary_exact() {
        let values = vec![1.0, 2.0, 3.0];
        let windows = sequence_windows(&values, 3).unwrap();
        assert_eq!(windows.len(), 1);

        let err = sequence_windows(&values[..2], 3);
        assert!(matches!(
            err,
            Err(EngineError::InsufficientData { needed: 3, got: 2 })
        ));
    }

    #[test]
    fn sequence_windows_empty_series() {
        let err = sequence_windows(&[], 24);
        assert!(matches!(
            err,
            Err(EngineError::InsufficientData { needed: 24, got: 0 })
        ));
    }
}
