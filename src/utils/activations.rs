//! Row-wise softmax helpers
//!
//! Both helpers work on `(N, K)` logits and subtract each row's maximum
//! before exponentiating, so large logits do not overflow.

use ndarray::{Array2, ArrayView2, Axis};

/// Log-probabilities of each row of `logits`.
///
/// `log_softmax(x)_k = (x_k - max) - ln Σ_j exp(x_j - max)`
pub fn log_softmax_rows(logits: ArrayView2<'_, f64>) -> Array2<f64> {
    let mut out = logits.to_owned();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let max_value = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        row.mapv_inplace(|v| v - max_value);
        let log_sum = row.iter().map(|v| v.exp()).sum::<f64>().ln();
        row.mapv_inplace(|v| v - log_sum);
    }
    out
}

/// Probabilities of each row of `logits`; every row sums to 1.
pub fn softmax_rows(logits: ArrayView2<'_, f64>) -> Array2<f64> {
    log_softmax_rows(logits).mapv(f64::exp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_softmax_uniform_row() {
        let probs = softmax_rows(array![[0.0, 0.0, 0.0, 0.0]].view());
        for &p in probs.iter() {
            assert_relative_eq!(p, 0.25, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let probs = softmax_rows(array![[2.0, 1.0, 0.0], [0.0, 0.0, 5.0]].view());
        for row in probs.rows() {
            assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_softmax_large_logits_stay_finite() {
        let probs = softmax_rows(array![[1000.0, 1000.0], [-1000.0, 0.0]].view());
        assert!(probs.iter().all(|p| p.is_finite()));
        assert_relative_eq!(probs[[0, 0]], 0.5, epsilon = 1e-12);
        assert_relative_eq!(probs[[1, 1]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_log_softmax_matches_log_of_softmax() {
        let logits = array![[0.3, -1.2, 2.5]];
        let log_probs = log_softmax_rows(logits.view());
        let probs = softmax_rows(logits.view());
        for (lp, p) in log_probs.iter().zip(probs.iter()) {
            assert_relative_eq!(*lp, p.ln(), epsilon = 1e-12);
        }
    }
}
