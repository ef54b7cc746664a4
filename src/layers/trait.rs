//! Layer trait definition for network building blocks
//!
//! This module defines the contract every primitive satisfies so that a
//! network built by stacking layers can be differentiated end-to-end by
//! chaining each layer's local backward pass.

use crate::error::Result;
use crate::params::{Params, SharedParams};
use crate::Tensor;

/// Core trait for network layers.
///
/// A driver calls `forward` on each layer in order, then `backward` in reverse
/// order, threading the gradient from the loss through every layer. An
/// optimizer reads `get_params`, and the values it produces go back in through
/// `update`.
///
/// # State
///
/// `forward` and `backward` take `&self`. Gradients and the dropout mask are
/// layer-owned state kept behind `RefCell`. A layer is used from one thread
/// at a time.
///
/// # Example
///
/// ```ignore
/// let out = layer.forward(&x)?;
/// let loss_grad = loss.backward(&out, &targets)?;
/// let x_grad = layer.backward(&loss_grad, &x)?;
/// if let Some((params, grads)) = layer.get_params("0") {
///     let new_params = optimizer.step(&params, &grads)?;
///     layer.update(&new_params)?;
/// }
/// ```
pub trait Layer {
    /// Name of the layer; the middle part of its parameter keys.
    fn name(&self) -> &str;

    /// Whether the layer is in the training phase.
    fn is_training(&self) -> bool;

    /// Whether the layer exposes learnable parameters.
    fn is_trainable(&self) -> bool;

    /// Forward propagation.
    ///
    /// A function of `inputs` and the current parameters and mode; `inputs`
    /// is never modified.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` when `inputs` does not fit the configured dimensions,
    /// `InvalidConfiguration` when the window geometry cannot be applied.
    fn forward(&self, inputs: &Tensor) -> Result<Tensor>;

    /// Backward propagation.
    ///
    /// `in_grads` is the gradient with respect to this layer's outputs and
    /// `inputs` the tensor given to the matching `forward`. Returns the
    /// gradient with respect to `inputs`, with the same shape. Trainable
    /// layers overwrite their gradient tensors as a side effect.
    fn backward(&self, in_grads: &Tensor, inputs: &Tensor) -> Result<Tensor>;

    /// Replace owned parameters with the entries of `params` addressed to
    /// this layer. No-op for layers without parameters.
    ///
    /// An entry is addressed to the layer when its `layer` part equals
    /// [`name`](Layer::name). A map holding the same kind for that name under
    /// two prefixes is rejected with `InvalidConfiguration` and nothing is
    /// written.
    fn update(&mut self, _params: &Params) -> Result<()> {
        Ok(())
    }

    /// Live handles to the parameters and their gradients, keyed
    /// `{prefix}:{name}/weights` and `{prefix}:{name}/bias`.
    ///
    /// Returns `None` when the layer is not trainable.
    fn get_params(&self, _prefix: &str) -> Option<(SharedParams, SharedParams)> {
        None
    }

    /// Switch between training (`true`) and evaluation (`false`).
    fn set_mode(&mut self, training: bool);

    /// Allow or forbid exposing parameters.
    fn set_trainable(&mut self, trainable: bool);

    /// Number of learnable scalars owned by the layer.
    fn parameter_count(&self) -> usize {
        0
    }
}
