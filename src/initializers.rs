//! Weight initializers consumed by the FC and convolution constructors.

use std::cell::RefCell;

use ndarray::IxDyn;
use ndarray_rand::rand_distr::{StandardNormal, Uniform};
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{LayerError, Result};
use crate::Tensor;

/// Produces the initial value of a parameter tensor.
pub trait Initializer {
    fn initialize(&self, shape: &[usize]) -> Tensor;
}

fn make_rng(seed: Option<u64>) -> RefCell<StdRng> {
    RefCell::new(match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    })
}

/// Samples every element from `N(mean, std²)`.
///
/// Successive calls continue the same random stream, so two layers built from
/// one seeded initializer get different (but reproducible) weights.
pub struct Gaussian {
    mean: f64,
    std: f64,
    rng: RefCell<StdRng>,
}

impl Gaussian {
    /// # Errors
    ///
    /// `InvalidConfiguration` unless `mean` is finite and `std` is finite and
    /// non-negative.
    pub fn new(mean: f64, std: f64, seed: Option<u64>) -> Result<Self> {
        if !mean.is_finite() || !std.is_finite() || std < 0.0 {
            return Err(LayerError::config(
                "gaussian",
                format!("need finite mean and finite std >= 0, got mean {} std {}", mean, std),
            ));
        }
        Ok(Self {
            mean,
            std,
            rng: make_rng(seed),
        })
    }

    /// `N(0, 0.01²)` with a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            mean: 0.0,
            std: 0.01,
            rng: make_rng(Some(seed)),
        }
    }
}

impl Default for Gaussian {
    fn default() -> Self {
        Self {
            mean: 0.0,
            std: 0.01,
            rng: make_rng(None),
        }
    }
}

impl Initializer for Gaussian {
    fn initialize(&self, shape: &[usize]) -> Tensor {
        let z = Tensor::random_using(IxDyn(shape), StandardNormal, &mut *self.rng.borrow_mut());
        z.mapv(|v| self.mean + self.std * v)
    }
}

/// Xavier/Glorot uniform initialization: `U[-limit, limit]` with
/// `limit = sqrt(6 / (fan_in + fan_out))`.
///
/// For a dense `(in, out)` weight the fans are `in` and `out`. For a
/// convolution weight `(out_c, in_c, kh, kw)` they are `in_c·kh·kw` and
/// `out_c·kh·kw`.
pub struct XavierUniform {
    rng: RefCell<StdRng>,
}

impl XavierUniform {
    pub fn new(seed: Option<u64>) -> Self {
        Self { rng: make_rng(seed) }
    }

    pub fn fans(shape: &[usize]) -> (usize, usize) {
        match shape {
            [fan_in, fan_out] => (*fan_in, *fan_out),
            [out_c, in_c, rest @ ..] => {
                let receptive: usize = rest.iter().product();
                (in_c * receptive, out_c * receptive)
            }
            [n] => (*n, *n),
            [] => (1, 1),
        }
    }
}

impl Initializer for XavierUniform {
    fn initialize(&self, shape: &[usize]) -> Tensor {
        let (fan_in, fan_out) = Self::fans(shape);
        let limit = (6.0 / (fan_in + fan_out).max(1) as f64).sqrt();
        Tensor::random_using(
            IxDyn(shape),
            Uniform::new_inclusive(-limit, limit),
            &mut *self.rng.borrow_mut(),
        )
    }
}

/// Fills every element with the same value.
#[derive(Debug, Clone, Copy)]
pub struct Constant(pub f64);

impl Initializer for Constant {
    fn initialize(&self, shape: &[usize]) -> Tensor {
        Tensor::from_elem(IxDyn(shape), self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaussian_shape_and_determinism() {
        let a = Gaussian::seeded(42).initialize(&[3, 4]);
        let b = Gaussian::seeded(42).initialize(&[3, 4]);
        assert_eq!(a.shape(), &[3, 4]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_gaussian_stream_advances() {
        let init = Gaussian::seeded(7);
        let a = init.initialize(&[5]);
        let b = init.initialize(&[5]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_gaussian_statistics() {
        let w = Gaussian::new(0.0, 0.1, Some(1)).unwrap().initialize(&[100, 100]);
        let mean = w.mean().unwrap_or(1.0);
        let var = w.mapv(|v| (v - mean) * (v - mean)).mean().unwrap_or(0.0);
        assert!(mean.abs() < 0.01, "mean {}", mean);
        assert!((var.sqrt() - 0.1).abs() < 0.01, "std {}", var.sqrt());
    }

    #[test]
    fn test_gaussian_rejects_invalid_std() {
        assert!(matches!(
            Gaussian::new(0.0, -1.0, None),
            Err(LayerError::InvalidConfiguration { .. })
        ));
        assert!(Gaussian::new(0.0, f64::NAN, None).is_err());
        assert!(Gaussian::new(f64::INFINITY, 1.0, None).is_err());
        assert!(Gaussian::new(0.0, 0.0, None).is_ok());
    }

    #[test]
    fn test_xavier_fans() {
        assert_eq!(XavierUniform::fans(&[100, 50]), (100, 50));
        assert_eq!(XavierUniform::fans(&[8, 1, 3, 3]), (9, 72));
    }

    #[test]
    fn test_xavier_bounds() {
        let w = XavierUniform::new(Some(42)).initialize(&[8, 1, 3, 3]);
        let limit = (6.0f64 / 81.0).sqrt();
        assert!(w.iter().all(|v| v.abs() <= limit));
    }

    #[test]
    fn test_constant() {
        let w = Constant(0.5).initialize(&[2, 2]);
        assert!(w.iter().all(|&v| v == 0.5));
    }
}
