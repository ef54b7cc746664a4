//! Rank-checked views over dynamic tensors.

use ndarray::{ArrayView2, ArrayView4, Ix2, Ix4};

use crate::error::{LayerError, Result};
use crate::Tensor;

/// View `tensor` as `(N, C, H, W)`, failing with `ShapeMismatch` otherwise.
pub fn view4<'a>(tensor: &'a Tensor, operation: &str) -> Result<ArrayView4<'a, f64>> {
    tensor
        .view()
        .into_dimensionality::<Ix4>()
        .map_err(|_| LayerError::shape(operation, "4D (batch, channel, height, width)", tensor.shape()))
}

/// View `tensor` as `(N, F)`, failing with `ShapeMismatch` otherwise.
pub fn view2<'a>(tensor: &'a Tensor, operation: &str) -> Result<ArrayView2<'a, f64>> {
    tensor
        .view()
        .into_dimensionality::<Ix2>()
        .map_err(|_| LayerError::shape(operation, "2D (batch, features)", tensor.shape()))
}

/// Fail with `ShapeMismatch` unless both shapes are identical.
pub(crate) fn ensure_same_shape(operation: &str, expected: &[usize], got: &[usize]) -> Result<()> {
    if expected != got {
        return Err(LayerError::shape(operation, expected, got));
    }
    Ok(())
}
