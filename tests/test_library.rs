//! End-to-end tests for the rust_cnn_layers library
//!
//! Wires the public API together the way a training loop would:
//! - a small conv net built from `LayerKind`s
//! - softmax cross-entropy plus L2 weight decay
//! - SGD steps driven through `get_params` / `update`

use approx::assert_relative_eq;
use rust_cnn_layers::config::{ConvParams, PoolParams, PoolType};
use rust_cnn_layers::initializers::{Gaussian, XavierUniform};
use rust_cnn_layers::layers::{Convolution, Dropout, FCLayer, Flatten, Layer, LayerKind, Pooling, ReLU};
use rust_cnn_layers::loss::{SoftmaxCrossEntropy, L2};
use rust_cnn_layers::optimizers::{Optimizer, SGD};
use rust_cnn_layers::params::snapshot;
use rust_cnn_layers::{Result, Tensor};

struct Net {
    layers: Vec<LayerKind>,
    loss: SoftmaxCrossEntropy,
    decay: L2,
}

impl Net {
    fn new(seed: u64) -> Self {
        let init = Gaussian::new(0.0, 0.3, Some(seed)).unwrap();
        let layers: Vec<LayerKind> = vec![
            Convolution::new(ConvParams::square(1, 4, 3, 1, 1), &init).unwrap().into(),
            ReLU::new().into(),
            Pooling::new(PoolParams::square(PoolType::Max, 2, 2, 0)).unwrap().into(),
            Flatten::new().into(),
            FCLayer::new(16, 2, &XavierUniform::new(Some(seed))).unwrap().into(),
        ];
        Self {
            layers,
            loss: SoftmaxCrossEntropy::new(2),
            decay: L2::new(1e-4),
        }
    }

    // Returns every activation, input first.
    fn forward(&self, x: &Tensor) -> Result<Vec<Tensor>> {
        let mut activations = vec![x.clone()];
        for layer in &self.layers {
            let next = layer.forward(&activations[activations.len() - 1])?;
            activations.push(next);
        }
        Ok(activations)
    }

    fn loss(&self, x: &Tensor, targets: &[usize]) -> Result<f64> {
        let activations = self.forward(x)?;
        let (data, _) = self.loss.forward(&activations[activations.len() - 1], targets)?;
        Ok(data + self.weight_decay())
    }

    fn weight_decay(&self) -> f64 {
        self.layers
            .iter()
            .enumerate()
            .filter_map(|(i, l)| l.get_params(&i.to_string()))
            .map(|(params, _)| self.decay.forward(&snapshot(&params)))
            .sum()
    }

    fn train_step(&mut self, x: &Tensor, targets: &[usize], optimizer: &mut dyn Optimizer) -> Result<f64> {
        let activations = self.forward(x)?;
        let logits = &activations[activations.len() - 1];
        let (data, _) = self.loss.forward(logits, targets)?;
        let value = data + self.weight_decay();

        let mut grad = self.loss.backward(logits, targets)?;
        for (i, layer) in self.layers.iter().enumerate().rev() {
            grad = layer.backward(&grad, &activations[i])?;
        }

        for (i, layer) in self.layers.iter_mut().enumerate() {
            let Some((params, grads)) = layer.get_params(&i.to_string()) else {
                continue;
            };
            for (key, g) in self.decay.backward(&snapshot(&params)) {
                *grads[&key].borrow_mut() += &g;
            }
            let new_params = optimizer.step(&params, &grads)?;
            layer.update(&new_params)?;
        }
        Ok(value)
    }
}

// Vertical bar → class 0, horizontal bar → class 1.
fn bars() -> (Tensor, Vec<usize>) {
    let mut x = Tensor::zeros(vec![4, 1, 4, 4]);
    for n in 0..4 {
        let at = n / 2 + 1;
        for k in 0..4 {
            if n % 2 == 0 {
                x[[n, 0, k, at]] = 1.0;
            } else {
                x[[n, 0, at, k]] = 1.0;
            }
        }
    }
    (x, vec![0, 1, 0, 1])
}

#[test]
fn test_sgd_steps_reduce_loss() {
    let mut net = Net::new(11);
    let (x, targets) = bars();
    let mut optimizer = SGD::new(0.1);

    let initial = net.loss(&x, &targets).unwrap();
    let mut last = initial;
    for _ in 0..30 {
        last = net.train_step(&x, &targets, &mut optimizer).unwrap();
    }
    let trained = net.loss(&x, &targets).unwrap();

    assert!(last.is_finite());
    assert!(trained < initial, "loss went from {} to {}", initial, trained);
}

#[test]
fn test_momentum_steps_reduce_loss() {
    let mut net = Net::new(12);
    let (x, targets) = bars();
    let mut optimizer = SGD::new(0.05).with_momentum(0.9);

    let initial = net.loss(&x, &targets).unwrap();
    for _ in 0..20 {
        net.train_step(&x, &targets, &mut optimizer).unwrap();
    }
    assert!(net.loss(&x, &targets).unwrap() < initial);
}

#[test]
fn test_forward_is_pure() {
    let net = Net::new(13);
    let (x, targets) = bars();
    let before = x.clone();

    let a = net.loss(&x, &targets).unwrap();
    let b = net.loss(&x, &targets).unwrap();
    assert_relative_eq!(a, b);
    assert_eq!(x, before);
}

#[test]
fn test_eval_mode_disables_dropout_in_stack() {
    let mut layers: Vec<LayerKind> = vec![
        FCLayer::new(3, 3, &Gaussian::seeded(1)).unwrap().into(),
        Dropout::new(0.5, Some(1)).unwrap().into(),
    ];
    for layer in layers.iter_mut() {
        layer.set_mode(false);
    }
    assert!(layers.iter().all(|l| !l.is_training()));

    let x = Tensor::ones(vec![2, 3]);
    let fc_out = layers[0].forward(&x).unwrap();
    assert_eq!(layers[1].forward(&fc_out).unwrap(), fc_out);
}

#[test]
fn test_parameter_count_of_stack() {
    let net = Net::new(14);
    let total: usize = net.layers.iter().map(|l| l.parameter_count()).sum();
    // conv: 4·1·3·3 + 4, fc: 16·2 + 2
    assert_eq!(total, 40 + 34);
}
