//! Error type shared by every layer, loss and helper in the crate.

use thiserror::Error;

/// Failures surfaced by layer, loss and configuration operations.
///
/// Every error is reported to the immediate caller; nothing inside the crate
/// retries or recovers.
#[derive(Error, Debug)]
pub enum LayerError {
    /// A tensor's shape does not fit the layer's configured dimensions.
    #[error("shape mismatch in '{operation}': expected {expected}, got {got}")]
    ShapeMismatch {
        operation: String,
        expected: String,
        got: String,
    },

    /// Hyperparameters that cannot produce a valid computation.
    #[error("invalid configuration in '{operation}': {reason}")]
    InvalidConfiguration { operation: String, reason: String },

    /// An operation needed state that an earlier call should have produced.
    #[error("uninitialized state in '{operation}': {reason}")]
    UninitializedState { operation: String, reason: String },

    #[error(transparent)]
    Layout(#[from] ndarray::ShapeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl LayerError {
    pub(crate) fn shape(
        operation: impl Into<String>,
        expected: impl std::fmt::Debug,
        got: impl std::fmt::Debug,
    ) -> Self {
        LayerError::ShapeMismatch {
            operation: operation.into(),
            expected: format!("{:?}", expected),
            got: format!("{:?}", got),
        }
    }

    pub(crate) fn config(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        LayerError::InvalidConfiguration {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, LayerError>;
