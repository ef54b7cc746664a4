//! Convolutional Network Building Blocks
//!
//! This library provides layer and loss primitives for composing small
//! feed-forward and convolutional networks. Each primitive implements its
//! forward pass and its reverse-mode gradient by hand; there is no automatic
//! differentiation.
//!
//! # Modules
//!
//! - `layers`: Layer trait and implementations (FCLayer, Convolution, Pooling, etc.)
//! - `loss`: Softmax cross-entropy and L2 weight decay
//! - `im2col`: Sliding-window unrolling used by convolution and pooling
//! - `params`: Parameter keys and the live handles layers hand out
//! - `initializers`: Weight initializers
//! - `optimizers`: Optimizer trait and SGD
//! - `config`: Layer hyperparameters and JSON layer lists
//! - `utils`: Shape helpers, softmax and gradient checking

pub mod config;
pub mod error;
pub mod im2col;
pub mod initializers;
pub mod layers;
pub mod loss;
pub mod optimizers;
pub mod params;
pub mod utils;

/// Dense n-dimensional array of `f64`; spatial tensors are `(N, C, H, W)`,
/// flat ones `(N, F)`.
pub type Tensor = ndarray::ArrayD<f64>;

pub use error::{LayerError, Result};
