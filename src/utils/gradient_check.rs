//! Finite-difference gradient checking.
//!
//! Every layer computes its backward pass by hand, so the only trustworthy
//! reference is a numerical derivative of the forward pass. These helpers
//! perturb one element at a time and take centered differences.

use crate::error::Result;
use crate::utils::shape::ensure_same_shape;
use crate::Tensor;

/// Centered-difference gradient of the scalar function `f` at `x`.
///
/// Each element is perturbed by `±eps` in turn:
/// `(f(x + eps·e_i) - f(x - eps·e_i)) / (2·eps)`.
pub fn numerical_gradient<F>(mut f: F, x: &Tensor, eps: f64) -> Tensor
where
    F: FnMut(&Tensor) -> f64,
{
    let mut probe = x.clone();
    let mut grad = Tensor::zeros(x.raw_dim());
    for index in ndarray::indices(x.raw_dim()) {
        let original = probe[index.clone()];
        probe[index.clone()] = original + eps;
        let plus = f(&probe);
        probe[index.clone()] = original - eps;
        let minus = f(&probe);
        probe[index.clone()] = original;
        grad[index] = (plus - minus) / (2.0 * eps);
    }
    grad
}

/// Largest elementwise relative error between two tensors of the same shape.
///
/// `|a - b| / max(|a| + |b|, 1e-12)`; elements that are both (near) zero
/// count as a perfect match.
///
/// # Errors
///
/// `ShapeMismatch` when the shapes differ.
pub fn relative_error(a: &Tensor, b: &Tensor) -> Result<f64> {
    ensure_same_shape("relative_error", a.shape(), b.shape())?;
    Ok(a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let denom = (x.abs() + y.abs()).max(1e-12);
            (x - y).abs() / denom
        })
        .fold(0.0, f64::max))
}
