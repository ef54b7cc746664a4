//! Fully connected layer implementation
//!
//! This module provides an FCLayer (also known as Dense or Linear layer)
//! that performs the transformation: output = input × weights + bias

use log::debug;
use ndarray::{Axis, Ix1};

use crate::error::{LayerError, Result};
use crate::initializers::Initializer;
use crate::layers::parameters::LayerParams;
use crate::layers::Layer;
use crate::params::{Params, SharedParams};
use crate::utils::shape::{ensure_same_shape, view2};
use crate::Tensor;

/// Fully connected layer with weights and bias.
///
/// Performs the linear transformation: y = xW + b
/// where x is the input (batch × in_features),
/// W is the weight matrix (in_features × out_features),
/// and b is the bias vector (out_features).
///
/// # Example
///
/// ```ignore
/// use rust_cnn_layers::initializers::Gaussian;
/// use rust_cnn_layers::layers::{FCLayer, Layer};
///
/// let layer = FCLayer::new(784, 512, &Gaussian::seeded(42))?;
/// assert_eq!(layer.parameter_count(), 784 * 512 + 512);
/// ```
pub struct FCLayer {
    name: String,
    training: bool,
    trainable: bool,
    in_features: usize,
    out_features: usize,
    params: LayerParams,
}

impl FCLayer {
    /// Create a new FCLayer named `fclayer`.
    ///
    /// Weights come from `initializer` with shape `(in_features, out_features)`;
    /// the bias starts at zero.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` if either size is 0, `ShapeMismatch` if the
    /// initializer returns a tensor of the wrong shape.
    pub fn new(
        in_features: usize,
        out_features: usize,
        initializer: &dyn Initializer,
    ) -> Result<Self> {
        if in_features == 0 || out_features == 0 {
            return Err(LayerError::config(
                "fclayer",
                "in_features and out_features must be greater than 0",
            ));
        }
        let weights = initializer.initialize(&[in_features, out_features]);
        ensure_same_shape("fclayer.init", &[in_features, out_features], weights.shape())?;

        Ok(Self {
            name: "fclayer".to_string(),
            training: true,
            trainable: true,
            in_features,
            out_features,
            params: LayerParams::new(weights, Tensor::zeros(vec![out_features])),
        })
    }

    /// Rename the layer (changes its parameter keys).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }
}

impl Layer for FCLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_training(&self) -> bool {
        self.training
    }

    fn is_trainable(&self) -> bool {
        self.trainable
    }

    /// `(N, in) @ (in, out) + (out,) -> (N, out)`
    fn forward(&self, inputs: &Tensor) -> Result<Tensor> {
        let x = view2(inputs, "fclayer.forward")?;
        if x.ncols() != self.in_features {
            return Err(LayerError::shape(
                "fclayer.forward",
                ("N", self.in_features),
                x.dim(),
            ));
        }
        debug!("{}: forward {:?}", self.name, x.dim());

        let weights = self.params.weights.borrow();
        let w = view2(&weights, "fclayer.weights")?;
        let bias = self.params.bias.borrow();
        let b = bias.view().into_dimensionality::<Ix1>()?;
        let outputs = x.dot(&w) + &b;
        Ok(outputs.into_dyn())
    }

    /// `w_grad = xᵀ·g`, `b_grad = Σ_batch g`, `out_grads = g·Wᵀ`
    fn backward(&self, in_grads: &Tensor, inputs: &Tensor) -> Result<Tensor> {
        let x = view2(inputs, "fclayer.backward")?;
        let g = view2(in_grads, "fclayer.backward")?;
        if x.ncols() != self.in_features {
            return Err(LayerError::shape(
                "fclayer.backward",
                ("N", self.in_features),
                x.dim(),
            ));
        }
        ensure_same_shape(
            "fclayer.backward",
            &[x.nrows(), self.out_features],
            in_grads.shape(),
        )?;
        debug!("{}: backward {:?}", self.name, g.dim());

        let out_grads = {
            let weights = self.params.weights.borrow();
            let w = view2(&weights, "fclayer.weights")?;
            g.dot(&w.t())
        };
        let w_grad = x.t().dot(&g);
        let b_grad = g.sum_axis(Axis(0));
        self.params.set_grads(w_grad.into_dyn(), b_grad.into_dyn());

        Ok(out_grads.into_dyn())
    }

    fn update(&mut self, params: &Params) -> Result<()> {
        self.params.apply(&self.name, self.trainable, params)
    }

    fn get_params(&self, prefix: &str) -> Option<(SharedParams, SharedParams)> {
        if self.trainable {
            Some(self.params.handles(prefix, &self.name))
        } else {
            None
        }
    }

    fn set_mode(&mut self, training: bool) {
        self.training = training;
    }

    fn set_trainable(&mut self, trainable: bool) {
        self.trainable = trainable;
    }

    fn parameter_count(&self) -> usize {
        self.params.count()
    }
}
