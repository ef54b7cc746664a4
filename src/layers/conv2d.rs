//! 2D Convolutional layer implementation
//!
//! Convolution is lowered to one matrix product: the input is unrolled with
//! [`im2col`](crate::im2col::im2col) into a patch matrix, multiplied by the
//! filters reshaped to `(out_channel, in_channel·kh·kw)`, and the product is
//! folded back into `(N, out_channel, out_h, out_w)`. The backward pass
//! applies the adjoint of each of those steps, ending in
//! [`col2im`](crate::im2col::col2im).

use log::debug;
use ndarray::{Axis, Ix1};

use crate::config::ConvParams;
use crate::error::{LayerError, Result};
use crate::im2col::{col2im, im2col, output_size};
use crate::initializers::Initializer;
use crate::layers::parameters::LayerParams;
use crate::layers::Layer;
use crate::params::{Params, SharedParams};
use crate::utils::shape::{ensure_same_shape, view4};
use crate::Tensor;

/// 2D convolution with learnable filters, zero padding and a shared stride.
///
/// * `weights` - `(out_channel, in_channel, kernel_h, kernel_w)`
/// * `bias` - `(out_channel,)`
///
/// # Example
///
/// ```ignore
/// use rust_cnn_layers::config::ConvParams;
/// use rust_cnn_layers::initializers::Gaussian;
/// use rust_cnn_layers::layers::Convolution;
///
/// // 1 input channel, 8 filters, 3x3 kernel, padding 1, stride 1
/// let conv = Convolution::new(ConvParams::square(1, 8, 3, 1, 1), &Gaussian::seeded(42))?;
/// ```
pub struct Convolution {
    name: String,
    training: bool,
    trainable: bool,
    conv: ConvParams,
    params: LayerParams,
}

impl Convolution {
    /// Create a new convolution layer named `conv`.
    ///
    /// Filters come from `initializer`; the bias starts at zero.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` for a zero kernel size, stride or channel count.
    pub fn new(conv: ConvParams, initializer: &dyn Initializer) -> Result<Self> {
        conv.validate()?;
        let shape = [conv.out_channel, conv.in_channel, conv.kernel_h, conv.kernel_w];
        let weights = initializer.initialize(&shape);
        ensure_same_shape("conv.init", &shape, weights.shape())?;

        Ok(Self {
            name: "conv".to_string(),
            training: true,
            trainable: true,
            params: LayerParams::new(weights, Tensor::zeros(vec![conv.out_channel])),
            conv,
        })
    }

    /// Rename the layer (changes its parameter keys).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn conv_params(&self) -> &ConvParams {
        &self.conv
    }

    /// Spatial output size for an input of `height × width`.
    pub fn output_dims(&self, height: usize, width: usize) -> Result<(usize, usize)> {
        output_size(
            height,
            width,
            self.conv.kernel_h,
            self.conv.kernel_w,
            self.conv.pad,
            self.conv.stride,
        )
    }

    fn patch_len(&self) -> usize {
        self.conv.in_channel * self.conv.kernel_h * self.conv.kernel_w
    }

    fn check_channels(&self, operation: &str, inputs: &Tensor) -> Result<()> {
        let shape = inputs.shape();
        if shape.len() != 4 || shape[1] != self.conv.in_channel {
            return Err(LayerError::shape(
                operation,
                ("N", self.conv.in_channel, "H", "W"),
                shape,
            ));
        }
        Ok(())
    }
}

impl Layer for Convolution {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_training(&self) -> bool {
        self.training
    }

    fn is_trainable(&self) -> bool {
        self.trainable
    }

    fn forward(&self, inputs: &Tensor) -> Result<Tensor> {
        self.check_channels("conv.forward", inputs)?;
        let x = view4(inputs, "conv.forward")?;
        let (batch, _, height, width) = x.dim();
        let (out_h, out_w) = self.output_dims(height, width)?;
        let out_c = self.conv.out_channel;
        debug!(
            "{}: forward {:?} -> ({}, {}, {}, {})",
            self.name,
            x.dim(),
            batch,
            out_c,
            out_h,
            out_w
        );

        let x_col = im2col(x, self.conv.kernel_h, self.conv.kernel_w, self.conv.pad, self.conv.stride)?;
        let weights = self.params.weights.borrow();
        let w_col = weights.to_shape((out_c, self.patch_len()))?;
        let bias = self.params.bias.borrow();
        let b = bias.view().into_dimensionality::<Ix1>()?;

        // (out_c, out_h·out_w·N), columns ordered spatial-major, batch-minor
        let out = w_col.dot(&x_col) + &b.insert_axis(Axis(1));
        let out = out
            .to_shape((out_c, out_h, out_w, batch))?
            .permuted_axes([3, 0, 1, 2]);
        Ok(out.as_standard_layout().into_owned().into_dyn())
    }

    fn backward(&self, in_grads: &Tensor, inputs: &Tensor) -> Result<Tensor> {
        self.check_channels("conv.backward", inputs)?;
        let x = view4(inputs, "conv.backward")?;
        let (batch, channels, height, width) = x.dim();
        let (out_h, out_w) = self.output_dims(height, width)?;
        let out_c = self.conv.out_channel;
        ensure_same_shape(
            "conv.backward",
            &[batch, out_c, out_h, out_w],
            in_grads.shape(),
        )?;
        let g = view4(in_grads, "conv.backward")?;
        debug!("{}: backward {:?}", self.name, g.dim());

        let b_grad = g
            .sum_axis(Axis(3))
            .sum_axis(Axis(2))
            .sum_axis(Axis(0));

        // (N, out_c, out_h, out_w) -> (out_c, out_h, out_w, N) -> (out_c, out_h·out_w·N)
        let g_col = g
            .permuted_axes([1, 2, 3, 0])
            .to_shape((out_c, out_h * out_w * batch))?
            .into_owned();

        // Recomputed from the raw inputs; nothing is cached by forward
        let x_col = im2col(x, self.conv.kernel_h, self.conv.kernel_w, self.conv.pad, self.conv.stride)?;

        let w_grad = g_col
            .dot(&x_col.t())
            .to_shape((out_c, channels, self.conv.kernel_h, self.conv.kernel_w))?
            .into_owned();

        let dx_col = {
            let weights = self.params.weights.borrow();
            let w_col = weights.to_shape((out_c, self.patch_len()))?;
            w_col.t().dot(&g_col)
        };
        let out_grads = col2im(
            dx_col.view(),
            (batch, channels, height, width),
            self.conv.kernel_h,
            self.conv.kernel_w,
            self.conv.pad,
            self.conv.stride,
        )?;

        self.params.set_grads(w_grad.into_dyn(), b_grad.into_dyn());
        Ok(out_grads.into_dyn())
    }

    fn update(&mut self, params: &Params) -> Result<()> {
        self.params.apply(&self.name, self.trainable, params)
    }

    fn get_params(&self, prefix: &str) -> Option<(SharedParams, SharedParams)> {
        if self.trainable {
            Some(self.params.handles(prefix, &self.name))
        } else {
            None
        }
    }

    fn set_mode(&mut self, training: bool) {
        self.training = training;
    }

    fn set_trainable(&mut self, trainable: bool) {
        self.trainable = trainable;
    }

    fn parameter_count(&self) -> usize {
        self.params.count()
    }
}
