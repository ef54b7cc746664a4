//! Closed set of layer kinds.

use crate::error::Result;
use crate::layers::{Convolution, Dropout, FCLayer, Flatten, Layer, Pooling, ReLU};
use crate::params::{Params, SharedParams};
use crate::Tensor;

/// Any of the six layer primitives.
///
/// The set is fixed, so heterogeneous layer lists use this enum rather than
/// `Box<dyn Layer>`.
pub enum LayerKind {
    Fc(FCLayer),
    Convolution(Convolution),
    ReLU(ReLU),
    Pooling(Pooling),
    Dropout(Dropout),
    Flatten(Flatten),
}

macro_rules! dispatch {
    ($self:expr, $layer:ident => $body:expr) => {
        match $self {
            LayerKind::Fc($layer) => $body,
            LayerKind::Convolution($layer) => $body,
            LayerKind::ReLU($layer) => $body,
            LayerKind::Pooling($layer) => $body,
            LayerKind::Dropout($layer) => $body,
            LayerKind::Flatten($layer) => $body,
        }
    };
}

impl Layer for LayerKind {
    fn name(&self) -> &str {
        dispatch!(self, l => l.name())
    }

    fn is_training(&self) -> bool {
        dispatch!(self, l => l.is_training())
    }

    fn is_trainable(&self) -> bool {
        dispatch!(self, l => l.is_trainable())
    }

    fn forward(&self, inputs: &Tensor) -> Result<Tensor> {
        dispatch!(self, l => l.forward(inputs))
    }

    fn backward(&self, in_grads: &Tensor, inputs: &Tensor) -> Result<Tensor> {
        dispatch!(self, l => l.backward(in_grads, inputs))
    }

    fn update(&mut self, params: &Params) -> Result<()> {
        dispatch!(self, l => l.update(params))
    }

    fn get_params(&self, prefix: &str) -> Option<(SharedParams, SharedParams)> {
        dispatch!(self, l => l.get_params(prefix))
    }

    fn set_mode(&mut self, training: bool) {
        dispatch!(self, l => l.set_mode(training))
    }

    fn set_trainable(&mut self, trainable: bool) {
        dispatch!(self, l => l.set_trainable(trainable))
    }

    fn parameter_count(&self) -> usize {
        dispatch!(self, l => l.parameter_count())
    }
}

macro_rules! impl_from {
    ($($variant:ident($ty:ty)),*) => {
        $(impl From<$ty> for LayerKind {
            fn from(layer: $ty) -> Self {
                LayerKind::$variant(layer)
            }
        })*
    };
}

impl_from!(
    Fc(FCLayer),
    Convolution(Convolution),
    ReLU(ReLU),
    Pooling(Pooling),
    Dropout(Dropout),
    Flatten(Flatten)
);
