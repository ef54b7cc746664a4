//! Layer hyperparameter structures
//!
//! This module provides the hyperparameter structs the convolution and
//! pooling constructors take, and a JSON format describing a list of layers.
//! Each entry builds one layer; wiring layers together is left to the caller.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{LayerError, Result};
use crate::initializers::Initializer;
use crate::layers::{Convolution, Dropout, FCLayer, Flatten, LayerKind, Pooling, ReLU};

/// Convolution hyperparameters.
///
/// # Example
///
/// ```json
/// {
///   "kernel_h": 3,
///   "kernel_w": 3,
///   "stride": 1,
///   "pad": 1,
///   "in_channel": 1,
///   "out_channel": 8
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConvParams {
    /// Height of the kernel
    pub kernel_h: usize,
    /// Width of the kernel
    pub kernel_w: usize,
    /// Pixels between adjacent receptive fields, both directions
    pub stride: usize,
    /// Zero border added to every side of each feature map (default 0)
    #[serde(default)]
    pub pad: usize,
    pub in_channel: usize,
    pub out_channel: usize,
}

impl ConvParams {
    /// Square `kernel × kernel` filters.
    pub fn square(in_channel: usize, out_channel: usize, kernel: usize, pad: usize, stride: usize) -> Self {
        Self {
            kernel_h: kernel,
            kernel_w: kernel,
            stride,
            pad,
            in_channel,
            out_channel,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let checks = [
            (self.kernel_h, "kernel_h"),
            (self.kernel_w, "kernel_w"),
            (self.stride, "stride"),
            (self.in_channel, "in_channel"),
            (self.out_channel, "out_channel"),
        ];
        for (value, field) in checks {
            if value == 0 {
                return Err(LayerError::config(
                    "convolution",
                    format!("{} must be greater than 0", field),
                ));
            }
        }
        Ok(())
    }
}

/// Pooling reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolType {
    Max,
    Avg,
}

/// Pooling hyperparameters.
///
/// # Example
///
/// ```json
/// { "pool_type": "max", "pool_height": 2, "pool_width": 2, "stride": 2, "pad": 0 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PoolParams {
    pub pool_type: PoolType,
    pub pool_height: usize,
    pub pool_width: usize,
    pub stride: usize,
    #[serde(default)]
    pub pad: usize,
}

impl PoolParams {
    pub fn square(pool_type: PoolType, size: usize, stride: usize, pad: usize) -> Self {
        Self {
            pool_type,
            pool_height: size,
            pool_width: size,
            stride,
            pad,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let checks = [
            (self.pool_height, "pool_height"),
            (self.pool_width, "pool_width"),
            (self.stride, "stride"),
        ];
        for (value, field) in checks {
            if value == 0 {
                return Err(LayerError::config(
                    "pooling",
                    format!("{} must be greater than 0", field),
                ));
            }
        }
        Ok(())
    }
}

/// One layer in a JSON layer list, tagged by `layer_type`.
///
/// `name` is optional everywhere and defaults to the layer's usual name.
///
/// ```json
/// [
///   { "layer_type": "convolution", "kernel_h": 3, "kernel_w": 3, "stride": 1,
///     "pad": 1, "in_channel": 1, "out_channel": 4, "name": "conv1" },
///   { "layer_type": "relu" },
///   { "layer_type": "pooling", "pool_type": "max", "pool_height": 2,
///     "pool_width": 2, "stride": 2 },
///   { "layer_type": "flatten" },
///   { "layer_type": "dropout", "ratio": 0.5, "seed": 7 },
///   { "layer_type": "fc", "in_features": 196, "out_features": 10 }
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "layer_type", rename_all = "lowercase")]
pub enum LayerConfig {
    Fc {
        in_features: usize,
        out_features: usize,
        name: Option<String>,
    },
    Convolution {
        #[serde(flatten)]
        params: ConvParams,
        name: Option<String>,
    },
    Relu {
        name: Option<String>,
    },
    Pooling {
        #[serde(flatten)]
        params: PoolParams,
        name: Option<String>,
    },
    Dropout {
        ratio: f64,
        seed: Option<u64>,
        name: Option<String>,
    },
    Flatten {
        name: Option<String>,
    },
}

impl LayerConfig {
    /// Check hyperparameters without building anything.
    pub fn validate(&self) -> Result<()> {
        match self {
            LayerConfig::Fc {
                in_features,
                out_features,
                ..
            } => {
                if *in_features == 0 || *out_features == 0 {
                    return Err(LayerError::config(
                        "fc",
                        "in_features and out_features must be greater than 0",
                    ));
                }
                Ok(())
            }
            LayerConfig::Convolution { params, .. } => params.validate(),
            LayerConfig::Pooling { params, .. } => params.validate(),
            LayerConfig::Dropout { ratio, .. } => {
                if !(*ratio > 0.0 && *ratio <= 1.0) {
                    return Err(LayerError::config(
                        "dropout",
                        format!("ratio must be in (0, 1], got {}", ratio),
                    ));
                }
                Ok(())
            }
            LayerConfig::Relu { .. } | LayerConfig::Flatten { .. } => Ok(()),
        }
    }

    /// Construct the layer this entry describes.
    pub fn build(&self, initializer: &dyn Initializer) -> Result<LayerKind> {
        let layer: LayerKind = match self {
            LayerConfig::Fc {
                in_features,
                out_features,
                name,
            } => {
                let layer = FCLayer::new(*in_features, *out_features, initializer)?;
                let layer = match name {
                    Some(n) => layer.with_name(n.clone()),
                    None => layer,
                };
                layer.into()
            }
            LayerConfig::Convolution { params, name } => {
                let layer = Convolution::new(params.clone(), initializer)?;
                let layer = match name {
                    Some(n) => layer.with_name(n.clone()),
                    None => layer,
                };
                layer.into()
            }
            LayerConfig::Relu { name } => {
                let layer = match name {
                    Some(n) => ReLU::new().with_name(n.clone()),
                    None => ReLU::new(),
                };
                layer.into()
            }
            LayerConfig::Pooling { params, name } => {
                let layer = Pooling::new(params.clone())?;
                let layer = match name {
                    Some(n) => layer.with_name(n.clone()),
                    None => layer,
                };
                layer.into()
            }
            LayerConfig::Dropout { ratio, seed, name } => {
                let layer = Dropout::new(*ratio, *seed)?;
                let layer = match name {
                    Some(n) => layer.with_name(n.clone()),
                    None => layer,
                };
                layer.into()
            }
            LayerConfig::Flatten { name } => {
                let layer = match name {
                    Some(n) => Flatten::new().with_name(n.clone()),
                    None => Flatten::new(),
                };
                layer.into()
            }
        };
        Ok(layer)
    }
}

/// Parse and validate a JSON array of [`LayerConfig`] entries.
pub fn parse_layer_configs(json: &str) -> Result<Vec<LayerConfig>> {
    let configs: Vec<LayerConfig> = serde_json::from_str(json)?;
    for (index, config) in configs.iter().enumerate() {
        config.validate().map_err(|e| match e {
            LayerError::InvalidConfiguration { operation, reason } => {
                LayerError::InvalidConfiguration {
                    operation: format!("layer {} ({})", index, operation),
                    reason,
                }
            }
            other => other,
        })?;
    }
    Ok(configs)
}

/// Loads a list of layer configurations from a JSON file.
///
/// # Examples
///
/// ```no_run
/// use rust_cnn_layers::config::load_layer_configs;
///
/// let layers = load_layer_configs("config/lenet_small.json").unwrap();
/// assert!(!layers.is_empty());
/// ```
pub fn load_layer_configs(path: impl AsRef<Path>) -> Result<Vec<LayerConfig>> {
    let contents = fs::read_to_string(path)?;
    parse_layer_configs(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::initializers::Gaussian;
    use crate::layers::Layer;

    #[test]
    fn test_conv_params_from_json() {
        let params: ConvParams = serde_json::from_str(
            r#"{"kernel_h": 3, "kernel_w": 5, "stride": 2, "in_channel": 3, "out_channel": 16}"#,
        )
        .unwrap();
        assert_eq!(params.kernel_w, 5);
        assert_eq!(params.pad, 0);
    }

    #[test]
    fn test_pool_type_rejects_unknown() {
        let parsed: std::result::Result<PoolParams, _> = serde_json::from_str(
            r#"{"pool_type": "median", "pool_height": 2, "pool_width": 2, "stride": 2}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_parse_and_build_each_kind() {
        let json = r#"[
            {"layer_type": "convolution", "kernel_h": 3, "kernel_w": 3, "stride": 1,
             "pad": 1, "in_channel": 1, "out_channel": 2, "name": "conv1"},
            {"layer_type": "relu"},
            {"layer_type": "pooling", "pool_type": "avg", "pool_height": 2,
             "pool_width": 2, "stride": 2},
            {"layer_type": "flatten"},
            {"layer_type": "dropout", "ratio": 0.5, "seed": 3},
            {"layer_type": "fc", "in_features": 8, "out_features": 3}
        ]"#;
        let configs = parse_layer_configs(json).unwrap();
        assert_eq!(configs.len(), 6);

        let init = Gaussian::seeded(0);
        let names: Vec<String> = configs
            .iter()
            .map(|c| c.build(&init).map(|l| l.name().to_string()))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(names, vec!["conv1", "relu", "pooling", "flatten", "dropout", "fclayer"]);
    }

    #[test]
    fn test_validation_reports_index() {
        let json = r#"[
            {"layer_type": "relu"},
            {"layer_type": "pooling", "pool_type": "max", "pool_height": 2,
             "pool_width": 2, "stride": 0}
        ]"#;
        let err = parse_layer_configs(json).unwrap_err();
        assert!(err.to_string().contains("layer 1"), "{}", err);
    }

    #[test]
    fn test_dropout_ratio_validated() {
        let json = r#"[{"layer_type": "dropout", "ratio": 0.0}]"#;
        assert!(parse_layer_configs(json).is_err());
    }
}
