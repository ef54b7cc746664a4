//! Max and average pooling
//!
//! Every channel is pooled on its own: `(N, C, H, W)` is viewed as a pseudo
//! batch `(N·C, 1, H, W)`, so each patch-matrix column is one window of one
//! channel of one sample.

use log::debug;
use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::config::{PoolParams, PoolType};
use crate::error::Result;
use crate::im2col::{col2im, im2col, output_size};
use crate::layers::Layer;
use crate::utils::shape::{ensure_same_shape, view4};
use crate::Tensor;

/// Index of the largest value; ties go to the first occurrence.
///
/// Forward and backward each call this on identical columns, so they always
/// agree on which element a window routed its gradient to.
fn argmax(column: ArrayView1<'_, f64>) -> usize {
    let mut best = 0;
    for (i, &v) in column.iter().enumerate().skip(1) {
        if v > column[best] {
            best = i;
        }
    }
    best
}

/// Pooling layer without parameters.
pub struct Pooling {
    name: String,
    training: bool,
    trainable: bool,
    pool: PoolParams,
}

impl Pooling {
    /// Create a new pooling layer named `pooling`.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` for a zero window size or stride.
    pub fn new(pool: PoolParams) -> Result<Self> {
        pool.validate()?;
        Ok(Self {
            name: "pooling".to_string(),
            training: true,
            trainable: false,
            pool,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn pool_params(&self) -> &PoolParams {
        &self.pool
    }

    /// Patch matrix of the per-channel pseudo batch, plus the output size.
    fn patches(&self, inputs: &Tensor, operation: &str) -> Result<(Array2<f64>, (usize, usize))> {
        let x = view4(inputs, operation)?;
        let (batch, channels, height, width) = x.dim();
        let dims = output_size(
            height,
            width,
            self.pool.pool_height,
            self.pool.pool_width,
            self.pool.pad,
            self.pool.stride,
        )?;
        let pseudo = x.to_shape((batch * channels, 1, height, width))?;
        let x_col = im2col(
            pseudo.view(),
            self.pool.pool_height,
            self.pool.pool_width,
            self.pool.pad,
            self.pool.stride,
        )?;
        Ok((x_col, dims))
    }
}

impl Layer for Pooling {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_training(&self) -> bool {
        self.training
    }

    fn is_trainable(&self) -> bool {
        self.trainable
    }

    fn forward(&self, inputs: &Tensor) -> Result<Tensor> {
        let (x_col, (out_h, out_w)) = self.patches(inputs, "pooling.forward")?;
        let (batch, channels) = (inputs.shape()[0], inputs.shape()[1]);
        debug!(
            "{}: {:?} forward {:?} -> ({}, {}, {}, {})",
            self.name,
            self.pool.pool_type,
            inputs.shape(),
            batch,
            channels,
            out_h,
            out_w
        );

        let pooled: Array1<f64> = match self.pool.pool_type {
            PoolType::Max => x_col
                .axis_iter(Axis(1))
                .map(|column| column[argmax(column)])
                .collect(),
            PoolType::Avg => x_col.sum_axis(Axis(0)) / x_col.nrows() as f64,
        };

        // Columns run (out_h, out_w, N, C) in row-major order
        let out = pooled
            .to_shape((out_h, out_w, batch, channels))?
            .permuted_axes([2, 3, 0, 1]);
        Ok(out.as_standard_layout().into_owned().into_dyn())
    }

    fn backward(&self, in_grads: &Tensor, inputs: &Tensor) -> Result<Tensor> {
        let (x_col, (out_h, out_w)) = self.patches(inputs, "pooling.backward")?;
        let shape = inputs.shape();
        let (batch, channels, height, width) = (shape[0], shape[1], shape[2], shape[3]);
        ensure_same_shape(
            "pooling.backward",
            &[batch, channels, out_h, out_w],
            in_grads.shape(),
        )?;
        debug!("{}: backward {:?}", self.name, in_grads.shape());

        let g = view4(in_grads, "pooling.backward")?;
        let flat = g
            .permuted_axes([2, 3, 0, 1])
            .to_shape(out_h * out_w * batch * channels)?
            .into_owned();

        let mut dx_col = Array2::<f64>::zeros(x_col.raw_dim());
        match self.pool.pool_type {
            PoolType::Max => {
                for (j, column) in x_col.axis_iter(Axis(1)).enumerate() {
                    dx_col[[argmax(column), j]] = flat[j];
                }
            }
            PoolType::Avg => {
                let scale = 1.0 / x_col.nrows() as f64;
                for (j, mut column) in dx_col.axis_iter_mut(Axis(1)).enumerate() {
                    column.fill(flat[j] * scale);
                }
            }
        }

        let out_grads = col2im(
            dx_col.view(),
            (batch * channels, 1, height, width),
            self.pool.pool_height,
            self.pool.pool_width,
            self.pool.pad,
            self.pool.stride,
        )?;
        Ok(out_grads
            .to_shape((batch, channels, height, width))?
            .into_owned()
            .into_dyn())
    }

    fn set_mode(&mut self, training: bool) {
        self.training = training;
    }

    /// Only the flag changes: pooling owns no parameters either way.
    fn set_trainable(&mut self, trainable: bool) {
        self.trainable = trainable;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array};

    fn pool(pool_type: PoolType, size: usize, stride: usize, pad: usize) -> Pooling {
        Pooling::new(PoolParams::square(pool_type, size, stride, pad)).unwrap()
    }

    #[test]
    fn test_argmax_first_occurrence() {
        let col = array![1.0, 4.0, 4.0, 2.0];
        assert_eq!(argmax(col.view()), 1);
        let flat = array![3.0, 3.0];
        assert_eq!(argmax(flat.view()), 0);
    }

    #[test]
    fn test_max_pool_single_window() {
        let layer = pool(PoolType::Max, 2, 2, 0);
        let x = array![[[[1.0, 3.0], [2.0, 0.0]]]].into_dyn();

        let y = layer.forward(&x).unwrap();
        assert_eq!(y.shape(), &[1, 1, 1, 1]);
        assert_eq!(y[[0, 0, 0, 0]], 3.0);

        let g = array![[[[5.0]]]].into_dyn();
        let dx = layer.backward(&g, &x).unwrap();
        assert_eq!(dx, array![[[[0.0, 5.0], [0.0, 0.0]]]].into_dyn());
    }

    #[test]
    fn test_max_pool_ties_route_to_first() {
        let layer = pool(PoolType::Max, 2, 2, 0);
        let x = array![[[[7.0, 7.0], [7.0, 7.0]]]].into_dyn();
        let dx = layer.backward(&array![[[[1.0]]]].into_dyn(), &x).unwrap();
        assert_eq!(dx, array![[[[1.0, 0.0], [0.0, 0.0]]]].into_dyn());
    }

    #[test]
    fn test_avg_pool_values_and_gradient() {
        let layer = pool(PoolType::Avg, 2, 2, 0);
        let x = Array::from_shape_vec((1, 1, 2, 4), vec![1., 2., 5., 6., 3., 4., 7., 8.])
            .unwrap()
            .into_dyn();
        let y = layer.forward(&x).unwrap();
        assert_eq!(y.shape(), &[1, 1, 1, 2]);
        assert_relative_eq!(y[[0, 0, 0, 0]], 2.5);
        assert_relative_eq!(y[[0, 0, 0, 1]], 6.5);

        let dx = layer.backward(&array![[[[4.0, 8.0]]]].into_dyn(), &x).unwrap();
        let expected = array![[[[1.0, 1.0, 2.0, 2.0], [1.0, 1.0, 2.0, 2.0]]]].into_dyn();
        assert_eq!(dx, expected);
    }

    #[test]
    fn test_pooling_keeps_channels_apart() {
        // Two samples x two channels, each a constant plane
        let layer = pool(PoolType::Max, 2, 2, 0);
        let x = Array::from_shape_fn((2, 2, 2, 2), |(n, c, _, _)| (10 * n + c) as f64).into_dyn();
        let y = layer.forward(&x).unwrap();
        assert_eq!(y.shape(), &[2, 2, 1, 1]);
        assert_eq!(y[[0, 1, 0, 0]], 1.0);
        assert_eq!(y[[1, 0, 0, 0]], 10.0);
        assert_eq!(y[[1, 1, 0, 0]], 11.0);
    }

    #[test]
    fn test_pooling_output_shape_with_padding() {
        let layer = pool(PoolType::Max, 3, 2, 1);
        let x = Tensor::ones(vec![2, 3, 5, 5]);
        let y = layer.forward(&x).unwrap();
        assert_eq!(y.shape(), &[2, 3, 3, 3]);
        let dx = layer.backward(&Tensor::ones(y.raw_dim()), &x).unwrap();
        assert_eq!(dx.shape(), x.shape());
    }

    #[test]
    fn test_pooling_not_trainable() {
        let mut layer = pool(PoolType::Avg, 2, 2, 0);
        assert!(!layer.is_trainable());
        layer.set_trainable(true);
        assert!(layer.is_trainable());
        assert!(layer.get_params("0").is_none());
        assert_eq!(layer.parameter_count(), 0);
    }

    #[test]
    fn test_pooling_rejects_wrong_grad_shape() {
        let layer = pool(PoolType::Max, 2, 2, 0);
        let x = Tensor::ones(vec![1, 1, 4, 4]);
        assert!(layer.backward(&Tensor::ones(vec![1, 1, 3, 3]), &x).is_err());
    }
}
