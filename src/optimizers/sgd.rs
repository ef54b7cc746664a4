//! Stochastic Gradient Descent (SGD) optimizer implementation
//!
//! This module provides SGD with optional classical momentum:
//! `v = μ·v − η·g`, `p' = p + v`. With `μ = 0` this is plain
//! `p' = p − η·g`.

use std::collections::BTreeMap;

use crate::error::{LayerError, Result};
use crate::optimizers::Optimizer;
use crate::params::{ParamKey, Params, SharedParams};
use crate::Tensor;

/// Stochastic Gradient Descent optimizer.
///
/// # Example
///
/// ```ignore
/// use rust_cnn_layers::optimizers::{Optimizer, SGD};
///
/// let mut optimizer = SGD::new(0.01).with_momentum(0.9);
/// let new_params = optimizer.step(&params, &grads)?;
/// ```
pub struct SGD {
    learning_rate: f64,
    momentum: f64,
    velocity: BTreeMap<ParamKey, Tensor>,
}

impl SGD {
    /// Creates a new SGD optimizer without momentum.
    ///
    /// Common learning rates range from 0.001 to 0.1, depending on the problem.
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            momentum: 0.0,
            velocity: BTreeMap::new(),
        }
    }

    pub fn with_momentum(mut self, momentum: f64) -> Self {
        self.momentum = momentum;
        self
    }

    pub fn momentum(&self) -> f64 {
        self.momentum
    }
}

impl Optimizer for SGD {
    fn step(&mut self, params: &SharedParams, grads: &SharedParams) -> Result<Params> {
        let mut updated = Params::new();
        for (key, param) in params {
            let param = param.borrow();
            let grad = grads
                .get(key)
                .ok_or_else(|| LayerError::shape(format!("sgd.step({})", key), param.shape(), "no gradient"))?
                .borrow();
            if grad.shape() != param.shape() {
                return Err(LayerError::shape(
                    format!("sgd.step({})", key),
                    param.shape(),
                    grad.shape(),
                ));
            }

            let new_value = if self.momentum == 0.0 {
                &*param - &(&*grad * self.learning_rate)
            } else {
                let velocity = self
                    .velocity
                    .entry(key.clone())
                    .or_insert_with(|| Tensor::zeros(param.raw_dim()));
                *velocity = &*velocity * self.momentum - &*grad * self.learning_rate;
                &*param + &*velocity
            };
            updated.insert(key.clone(), new_value);
        }
        Ok(updated)
    }

    /// Drops the momentum buffers.
    fn reset(&mut self) {
        self.velocity.clear();
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.learning_rate = lr;
    }
}
