//! Loss primitives: softmax cross-entropy for the data term and L2 weight
//! decay for the parameters.

use std::collections::BTreeMap;

use log::debug;

use crate::error::{LayerError, Result};
use crate::utils::activations::{log_softmax_rows, softmax_rows};
use crate::utils::shape::view2;
use crate::Tensor;

/// Softmax followed by cross-entropy against integer class targets.
#[derive(Debug, Clone)]
pub struct SoftmaxCrossEntropy {
    num_class: usize,
}

impl SoftmaxCrossEntropy {
    pub fn new(num_class: usize) -> Self {
        Self { num_class }
    }

    pub fn num_class(&self) -> usize {
        self.num_class
    }

    fn check(&self, inputs: &Tensor, targets: &[usize], operation: &str) -> Result<()> {
        let logits = view2(inputs, operation)?;
        if logits.ncols() != self.num_class || logits.nrows() != targets.len() {
            return Err(LayerError::shape(
                operation,
                (targets.len(), self.num_class),
                logits.dim(),
            ));
        }
        if let Some(bad) = targets.iter().find(|&&t| t >= self.num_class) {
            return Err(LayerError::config(
                operation,
                format!("target class {} out of range for {} classes", bad, self.num_class),
            ));
        }
        Ok(())
    }

    /// Mean negative log-likelihood of the targets, and the class
    /// probabilities `(N, num_class)`.
    pub fn forward(&self, inputs: &Tensor, targets: &[usize]) -> Result<(f64, Tensor)> {
        self.check(inputs, targets, "softmax_cross_entropy.forward")?;
        let log_probs = log_softmax_rows(view2(inputs, "softmax_cross_entropy.forward")?);
        let batch = targets.len().max(1) as f64;

        let loss = -targets
            .iter()
            .enumerate()
            .map(|(n, &t)| log_probs[[n, t]])
            .sum::<f64>()
            / batch;
        debug!("softmax_cross_entropy: loss {:.6} over {} rows", loss, targets.len());

        Ok((loss, log_probs.mapv(f64::exp).into_dyn()))
    }

    /// `(softmax(inputs) - one_hot(targets)) / N`
    pub fn backward(&self, inputs: &Tensor, targets: &[usize]) -> Result<Tensor> {
        self.check(inputs, targets, "softmax_cross_entropy.backward")?;
        let mut grads = softmax_rows(view2(inputs, "softmax_cross_entropy.backward")?);
        for (n, &t) in targets.iter().enumerate() {
            grads[[n, t]] -= 1.0;
        }
        let batch = targets.len().max(1) as f64;
        Ok((grads / batch).into_dyn())
    }
}

/// L2 weight decay: `0.5 · w · Σ value²` over every tensor it is given.
#[derive(Debug, Clone, Copy)]
pub struct L2 {
    w: f64,
}

impl L2 {
    pub fn new(w: f64) -> Self {
        Self { w }
    }

    pub fn weight(&self) -> f64 {
        self.w
    }

    pub fn forward<K>(&self, params: &BTreeMap<K, Tensor>) -> f64 {
        let squares: f64 = params.values().map(|v| v.mapv(|x| x * x).sum()).sum();
        0.5 * self.w * squares
    }

    /// Gradient `w · value` for every entry, under the same keys.
    pub fn backward<K: Ord + Clone>(&self, params: &BTreeMap<K, Tensor>) -> BTreeMap<K, Tensor> {
        params
            .iter()
            .map(|(k, v)| (k.clone(), v * self.w))
            .collect()
    }
}

impl Default for L2 {
    fn default() -> Self {
        Self::new(0.01)
    }
}
