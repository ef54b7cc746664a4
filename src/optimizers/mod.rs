//! Optimizer abstractions for layer parameter updates
//!
//! Optimizers consume the `(params, grads)` handles a trainable layer returns
//! from [`Layer::get_params`](crate::layers::Layer::get_params) and produce new
//! parameter values under the same keys, to be passed to
//! [`Layer::update`](crate::layers::Layer::update).
//!
//! # Example
//!
//! ```ignore
//! use rust_cnn_layers::optimizers::{Optimizer, SGD};
//!
//! let mut optimizer = SGD::new(0.01);
//! if let Some((params, grads)) = layer.get_params("0") {
//!     let new_params = optimizer.step(&params, &grads)?;
//!     layer.update(&new_params)?;
//! }
//! ```

pub mod sgd;

pub use sgd::SGD;

use crate::error::Result;
use crate::params::{Params, SharedParams};

/// Core trait for optimizers.
///
/// Some optimizers (like SGD with momentum) keep per-parameter state between
/// steps, keyed by the same [`ParamKey`](crate::params::ParamKey)s.
pub trait Optimizer {
    /// Compute new parameter values from the current values and gradients.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` when a parameter has no gradient of the same shape.
    fn step(&mut self, params: &SharedParams, grads: &SharedParams) -> Result<Params>;

    /// Clear any accumulated state.
    fn reset(&mut self);

    fn learning_rate(&self) -> f64;

    fn set_learning_rate(&mut self, lr: f64);
}
