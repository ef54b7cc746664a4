//! Dropout layer implementation for regularization
//!
//! During training each unit is kept with probability `ratio` and scaled by
//! `1 / ratio`, so the expected activation is unchanged. In evaluation mode
//! the layer is the identity.

use std::cell::RefCell;

use log::debug;
use ndarray::{ArrayD, IxDyn};
use ndarray_rand::RandomExt;
use rand::distributions::Bernoulli;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{LayerError, Result};
use crate::layers::Layer;
use crate::utils::shape::ensure_same_shape;
use crate::Tensor;

/// Dropout layer for regularization.
///
/// The mask (values `0` or `1 / ratio`, same shape as the input) is drawn on
/// the first training-mode `forward` and reused by every later `forward` and
/// `backward` until it is cleared, either by [`Dropout::clear_mask`] or by a
/// call to `set_mode`. The random source belongs to the layer; with a seed it
/// is reseeded before each draw, so a seeded layer always draws the same mask
/// for a given shape.
///
/// # Example
///
/// ```ignore
/// use rust_cnn_layers::layers::{Dropout, Layer};
///
/// let mut layer = Dropout::new(0.5, Some(42))?;
/// layer.set_mode(true);  // Enable dropout for training
/// let y = layer.forward(&x)?;
/// let dx = layer.backward(&g, &x)?;
/// ```
pub struct Dropout {
    name: String,
    training: bool,
    trainable: bool,
    ratio: f64,
    seed: Option<u64>,
    mask: RefCell<Option<Tensor>>,
    rng: RefCell<StdRng>,
}

impl Dropout {
    /// Creates a new dropout layer.
    ///
    /// # Arguments
    ///
    /// * `ratio` - Probability of keeping each unit, in `(0, 1]`
    /// * `seed` - Optional seed for reproducible masks
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` if `ratio` is outside `(0, 1]`.
    pub fn new(ratio: f64, seed: Option<u64>) -> Result<Self> {
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(LayerError::config(
                "dropout",
                format!("ratio must be in (0, 1], got {}", ratio),
            ));
        }
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            name: "dropout".to_string(),
            training: true,
            trainable: false,
            ratio,
            seed,
            mask: RefCell::new(None),
            rng: RefCell::new(rng),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Get the keep probability.
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// The mask currently in use, if one has been drawn.
    pub fn mask(&self) -> Option<Tensor> {
        self.mask.borrow().clone()
    }

    /// Forget the cached mask; the next training `forward` draws a new one.
    pub fn clear_mask(&self) {
        self.mask.borrow_mut().take();
    }

    fn draw_mask(&self, shape: &[usize]) -> Result<Tensor> {
        let keep = Bernoulli::new(self.ratio)
            .map_err(|e| LayerError::config("dropout", e.to_string()))?;
        let mut rng = self.rng.borrow_mut();
        if let Some(seed) = self.seed {
            *rng = StdRng::seed_from_u64(seed);
        }
        let scale = 1.0 / self.ratio;
        let kept = ArrayD::<bool>::random_using(IxDyn(shape), keep, &mut *rng);
        Ok(kept.mapv(|k| if k { scale } else { 0.0 }))
    }
}

impl Layer for Dropout {
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
        if !self.training {
            return Ok(inputs.clone());
        }

        let mut cached = self.mask.borrow_mut();
        let mask = match cached.take() {
            Some(m) => m,
            None => {
                debug!("{}: drawing mask {:?}", self.name, inputs.shape());
                self.draw_mask(inputs.shape())?
            }
        };
        let mask = cached.insert(mask);
        ensure_same_shape("dropout.forward", mask.shape(), inputs.shape())?;
        Ok(inputs * &*mask)
    }

    /// Multiplies `in_grads` by the mask the preceding `forward` used.
    ///
    /// # Errors
    ///
    /// `UninitializedState` in training mode when no `forward` has run since
    /// the mask was last cleared.
    fn backward(&self, in_grads: &Tensor, inputs: &Tensor) -> Result<Tensor> {
        ensure_same_shape("dropout.backward", inputs.shape(), in_grads.shape())?;
        if !self.training {
            return Ok(in_grads.clone());
        }

        let mask = self.mask.borrow();
        let m = mask.as_ref().ok_or_else(|| LayerError::UninitializedState {
            operation: "dropout.backward".to_string(),
            reason: "no mask for this phase; call forward before backward".to_string(),
        })?;
        ensure_same_shape("dropout.backward", m.shape(), in_grads.shape())?;
        Ok(in_grads * m)
    }

    /// Switching phase discards the cached mask.
    fn set_mode(&mut self, training: bool) {
        self.training = training;
        self.clear_mask();
    }

    fn set_trainable(&mut self, trainable: bool) {
        self.trainable = trainable;
    }
}
