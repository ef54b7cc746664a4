//! Rectified linear unit.

use log::debug;
use ndarray::Zip;

use crate::error::Result;
use crate::layers::Layer;
use crate::utils::shape::ensure_same_shape;
use crate::Tensor;

/// Elementwise `max(0, x)`.
///
/// The gradient passes where `x >= 0`, so an input of exactly zero still
/// lets its gradient through.
pub struct ReLU {
    name: String,
    training: bool,
    trainable: bool,
}

impl ReLU {
    pub fn new() -> Self {
        Self {
            name: "relu".to_string(),
            training: true,
            trainable: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Default for ReLU {
    fn default() -> Self {
        Self::new()
    }
}

impl Layer for ReLU {
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
        debug!("{}: forward {:?}", self.name, inputs.shape());
        Ok(inputs.mapv(|v| v.max(0.0)))
    }

    fn backward(&self, in_grads: &Tensor, inputs: &Tensor) -> Result<Tensor> {
        ensure_same_shape("relu.backward", inputs.shape(), in_grads.shape())?;
        Ok(Zip::from(inputs)
            .and(in_grads)
            .map_collect(|&x, &g| {
                let pass = if x >= 0.0 { 1.0 } else { 0.0 };
                pass * g
            }))
    }

    fn set_mode(&mut self, training: bool) {
        self.training = training;
    }

    fn set_trainable(&mut self, trainable: bool) {
        self.trainable = trainable;
    }
}
