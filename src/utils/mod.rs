//! Shared utilities for the layer and loss implementations
//!
//! This module provides shape-checked tensor views, row-wise softmax helpers
//! and the finite-difference gradient checker used by the test suites.

pub mod activations;
pub mod gradient_check;
pub mod shape;

pub use activations::{log_softmax_rows, softmax_rows};
pub use gradient_check::{numerical_gradient, relative_error};
pub use shape::{view2, view4};
