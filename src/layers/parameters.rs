//! Weight/bias storage shared by the trainable layers.

use log::warn;

use crate::error::{LayerError, Result};
use crate::params::{shared, ParamKey, ParamKind, Params, SharedParams, SharedTensor};
use crate::Tensor;

/// A layer's weights and bias, each paired with a same-shaped gradient.
///
/// All four live in shared handles that are never swapped out: `update`
/// and `set_grads` replace the contents, so handles returned earlier keep
/// tracking the layer.
pub(crate) struct LayerParams {
    pub weights: SharedTensor,
    pub bias: SharedTensor,
    pub w_grad: SharedTensor,
    pub b_grad: SharedTensor,
}

impl LayerParams {
    pub fn new(weights: Tensor, bias: Tensor) -> Self {
        let w_grad = Tensor::zeros(weights.raw_dim());
        let b_grad = Tensor::zeros(bias.raw_dim());
        Self {
            weights: shared(weights),
            bias: shared(bias),
            w_grad: shared(w_grad),
            b_grad: shared(b_grad),
        }
    }

    pub fn count(&self) -> usize {
        self.weights.borrow().len() + self.bias.borrow().len()
    }

    pub fn set_grads(&self, w_grad: Tensor, b_grad: Tensor) {
        *self.w_grad.borrow_mut() = w_grad;
        *self.b_grad.borrow_mut() = b_grad;
    }

    pub fn handles(&self, prefix: &str, name: &str) -> (SharedParams, SharedParams) {
        let w_key = ParamKey::new(prefix, name, ParamKind::Weights);
        let b_key = ParamKey::new(prefix, name, ParamKind::Bias);

        let mut params = SharedParams::new();
        params.insert(w_key.clone(), self.weights.clone());
        params.insert(b_key.clone(), self.bias.clone());

        let mut grads = SharedParams::new();
        grads.insert(w_key, self.w_grad.clone());
        grads.insert(b_key, self.b_grad.clone());
        (params, grads)
    }

    /// Overwrite weights/bias from the entries of `params` whose key names
    /// this layer. Shapes must not change, and each kind may appear under one
    /// prefix only: two layers sharing a name in one map cannot be told apart.
    pub fn apply(&self, name: &str, trainable: bool, params: &Params) -> Result<()> {
        let mine: Vec<_> = params.iter().filter(|(key, _)| key.layer == name).collect();
        if !trainable {
            if !mine.is_empty() {
                warn!("{}: ignoring {} update entries, layer is not trainable", name, mine.len());
            }
            return Ok(());
        }

        // Validate everything first so a bad entry leaves the layer untouched
        for kind in [ParamKind::Weights, ParamKind::Bias] {
            let prefixes: Vec<&str> = mine
                .iter()
                .filter(|(key, _)| key.kind == kind)
                .map(|(key, _)| key.prefix.as_str())
                .collect();
            if prefixes.len() > 1 {
                return Err(LayerError::config(
                    format!("{}.update", name),
                    format!(
                        "ambiguous {} entries under prefixes {:?}; layers sharing a name need separate maps or distinct names",
                        kind, prefixes
                    ),
                ));
            }
        }
        for (key, value) in &mine {
            let target = match key.kind {
                ParamKind::Weights => &self.weights,
                ParamKind::Bias => &self.bias,
            };
            let current = target.borrow();
            if current.shape() != value.shape() {
                return Err(LayerError::shape(
                    format!("{}.update({})", name, key),
                    current.shape(),
                    value.shape(),
                ));
            }
        }
        for (key, value) in mine {
            let target = match key.kind {
                ParamKind::Weights => &self.weights,
                ParamKind::Bias => &self.bias,
            };
            *target.borrow_mut() = value.clone();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::ArrayD;

    fn store() -> LayerParams {
        LayerParams::new(ArrayD::zeros(vec![2, 3]), ArrayD::zeros(vec![3]))
    }

    #[test]
    fn test_grads_match_param_shapes() {
        let p = store();
        assert_eq!(p.w_grad.borrow().shape(), &[2, 3]);
        assert_eq!(p.b_grad.borrow().shape(), &[3]);
        assert_eq!(p.count(), 9);
    }

    #[test]
    fn test_apply_exact_layer_match() {
        let p = store();
        let mut params = Params::new();
        params.insert(
            ParamKey::new("0", "fc", ParamKind::Weights),
            ArrayD::from_elem(vec![2, 3], 1.0),
        );
        // Another layer whose name merely contains "fc"
        params.insert(
            ParamKey::new("1", "fc_weights", ParamKind::Bias),
            ArrayD::from_elem(vec![3], 5.0),
        );
        p.apply("fc", true, &params).unwrap();
        assert_eq!(p.weights.borrow().sum(), 6.0);
        assert_eq!(p.bias.borrow().sum(), 0.0);
    }

    #[test]
    fn test_apply_rejects_same_name_under_two_prefixes() {
        let p = store();
        let mut params = Params::new();
        params.insert(
            ParamKey::new("0", "fc", ParamKind::Weights),
            ArrayD::from_elem(vec![2, 3], 1.0),
        );
        params.insert(
            ParamKey::new("2", "fc", ParamKind::Weights),
            ArrayD::from_elem(vec![2, 3], 2.0),
        );
        assert!(matches!(
            p.apply("fc", true, &params),
            Err(LayerError::InvalidConfiguration { .. })
        ));
        assert_eq!(p.weights.borrow().sum(), 0.0);
    }

    #[test]
    fn test_apply_rejects_shape_change() {
        let p = store();
        let mut params = Params::new();
        params.insert(
            ParamKey::new("0", "fc", ParamKind::Bias),
            ArrayD::from_elem(vec![4], 1.0),
        );
        assert!(p.apply("fc", true, &params).is_err());
        assert_eq!(p.bias.borrow().len(), 3);
    }

    #[test]
    fn test_apply_ignored_when_not_trainable() {
        let p = store();
        let mut params = Params::new();
        params.insert(
            ParamKey::new("0", "fc", ParamKind::Bias),
            ArrayD::from_elem(vec![3], 1.0),
        );
        p.apply("fc", false, &params).unwrap();
        assert_eq!(p.bias.borrow().sum(), 0.0);
    }
}
