//! Structured parameter keys and the live handles layers hand out.
//!
//! A trainable layer owns its weights, bias and their gradients as
//! [`SharedTensor`] handles. [`Layer::get_params`](crate::layers::Layer::get_params)
//! returns clones of those handles, not copies of the data: a caller holding
//! them sees every later `backward` or `update` on the layer.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::Tensor;

/// Live, shared handle to a tensor owned by a layer.
pub type SharedTensor = Rc<RefCell<Tensor>>;

/// Parameters or gradients as live handles, keyed by [`ParamKey`].
pub type SharedParams = BTreeMap<ParamKey, SharedTensor>;

/// Owned parameter values, e.g. what an optimizer produces for `update`.
pub type Params = BTreeMap<ParamKey, Tensor>;

/// Which of a layer's two parameter tensors a key refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParamKind {
    Weights,
    Bias,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Weights => write!(f, "weights"),
            ParamKind::Bias => write!(f, "bias"),
        }
    }
}

/// Key of one parameter tensor: `{prefix}:{layer}/{kind}` when printed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParamKey {
    pub prefix: String,
    pub layer: String,
    pub kind: ParamKind,
}

impl ParamKey {
    pub fn new(prefix: impl Into<String>, layer: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            prefix: prefix.into(),
            layer: layer.into(),
            kind,
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.prefix, self.layer, self.kind)
    }
}

/// Wrap an owned tensor in a fresh shared handle.
pub fn shared(tensor: Tensor) -> SharedTensor {
    Rc::new(RefCell::new(tensor))
}

/// Copy the current values behind a set of live handles.
pub fn snapshot(params: &SharedParams) -> Params {
    params
        .iter()
        .map(|(key, handle)| (key.clone(), handle.borrow().clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::ArrayD;

    #[test]
    fn test_key_display() {
        let key = ParamKey::new("layer-0", "conv", ParamKind::Weights);
        assert_eq!(key.to_string(), "layer-0:conv/weights");
        let key = ParamKey::new("3", "fclayer", ParamKind::Bias);
        assert_eq!(key.to_string(), "3:fclayer/bias");
    }

    #[test]
    fn test_snapshot_is_detached() {
        let handle = shared(ArrayD::zeros(vec![2]));
        let mut live = SharedParams::new();
        live.insert(ParamKey::new("0", "fc", ParamKind::Bias), handle.clone());

        let snap = snapshot(&live);
        handle.borrow_mut().fill(7.0);

        let key = ParamKey::new("0", "fc", ParamKind::Bias);
        assert_eq!(snap[&key].sum(), 0.0);
        assert_eq!(live[&key].borrow().sum(), 14.0);
    }
}
