//! Flatten `(N, C, H, W)` (or any rank) into `(N, C·H·W)`.

use log::debug;
use ndarray::IxDyn;

use crate::error::{LayerError, Result};
use crate::layers::Layer;
use crate::utils::shape::ensure_same_shape;
use crate::Tensor;

pub struct Flatten {
    name: String,
    training: bool,
    trainable: bool,
}

impl Flatten {
    pub fn new() -> Self {
        Self {
            name: "flatten".to_string(),
            training: true,
            trainable: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn flat_dims(inputs: &Tensor, operation: &str) -> Result<(usize, usize)> {
        match inputs.shape() {
            [batch, rest @ ..] => Ok((*batch, rest.iter().product())),
            [] => Err(LayerError::shape(operation, "at least 1 dimension", inputs.shape())),
        }
    }
}

impl Default for Flatten {
    fn default() -> Self {
        Self::new()
    }
}

impl Layer for Flatten {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_training(&self) -> bool {
        self.training
    }

    fn is_trainable(&self) -> bool {
        self.trainable
    }

    /// Returns a fresh tensor; it never aliases `inputs`.
    fn forward(&self, inputs: &Tensor) -> Result<Tensor> {
        let (batch, features) = Self::flat_dims(inputs, "flatten.forward")?;
        debug!("{}: forward {:?} -> ({}, {})", self.name, inputs.shape(), batch, features);
        Ok(inputs.to_shape((batch, features))?.into_owned().into_dyn())
    }

    fn backward(&self, in_grads: &Tensor, inputs: &Tensor) -> Result<Tensor> {
        let (batch, features) = Self::flat_dims(inputs, "flatten.backward")?;
        ensure_same_shape("flatten.backward", &[batch, features], in_grads.shape())?;
        Ok(in_grads.to_shape(IxDyn(inputs.shape()))?.into_owned())
    }

    fn set_mode(&mut self, training: bool) {
        self.training = training;
    }

    fn set_trainable(&mut self, trainable: bool) {
        self.trainable = trainable;
    }
}
