//! Layer primitives for small feed-forward and convolutional networks
//!
//! This module provides the Layer trait and its six implementations, each
//! with a hand-written forward and backward pass.

mod r#trait;
pub mod conv2d;
pub mod dense;
pub mod dropout;
pub mod flatten;
pub mod kind;
pub(crate) mod parameters;
pub mod pooling;
pub mod relu;

// Re-export the Layer trait for convenience
pub use r#trait::Layer;
pub use conv2d::Convolution;
pub use dense::FCLayer;
pub use dropout::Dropout;
pub use flatten::Flatten;
pub use kind::LayerKind;
pub use pooling::Pooling;
pub use relu::ReLU;
