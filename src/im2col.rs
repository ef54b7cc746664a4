//! Sliding-window unrolling of 4D tensors and its additive inverse.
//!
//! `im2col` turns every `kernel_h × kernel_w` window of a padded, strided
//! `(N, C, H, W)` tensor into one column of a 2D patch matrix so that a
//! convolution becomes a single matrix product. `col2im` scatters a patch
//! matrix back, summing contributions where windows overlap. It is the exact
//! adjoint of `im2col`, which is what lets it carry gradients backwards.
//!
//! Layout of the patch matrix, shape `(C·kh·kw, out_h·out_w·N)`:
//!
//! - row `(c·kh + i)·kw + j` holds kernel offset `(i, j)` of channel `c`
//! - column `(y·out_w + x)·N + n` holds output position `(y, x)` of sample `n`
//!
//! The batch index varies fastest along columns. Layers that reshape the
//! product back into a tensor rely on that order.

use log::trace;
use ndarray::{Array2, Array4, ArrayView2, ArrayView4};

use crate::error::{LayerError, Result};

/// Spatial output size of a sliding window.
///
/// Computes `(H + 2·pad − kernel) / stride + 1` along both axes. The division
/// must be exact; a configuration that would leave a remainder is rejected
/// instead of being truncated.
pub fn output_size(
    height: usize,
    width: usize,
    kernel_h: usize,
    kernel_w: usize,
    pad: usize,
    stride: usize,
) -> Result<(usize, usize)> {
    if stride == 0 {
        return Err(LayerError::config("output_size", "stride must be greater than 0"));
    }
    if kernel_h == 0 || kernel_w == 0 {
        return Err(LayerError::config(
            "output_size",
            "kernel size must be greater than 0",
        ));
    }

    let axis = |extent: usize, kernel: usize, name: &str| -> Result<usize> {
        let padded = extent + 2 * pad;
        if padded < kernel {
            return Err(LayerError::config(
                "output_size",
                format!(
                    "kernel {} ({}) exceeds padded input {} ({})",
                    name, kernel, name, padded
                ),
            ));
        }
        if (padded - kernel) % stride != 0 {
            return Err(LayerError::config(
                "output_size",
                format!(
                    "({} + 2*{} - {}) is not divisible by stride {}",
                    extent, pad, kernel, stride
                ),
            ));
        }
        Ok((padded - kernel) / stride + 1)
    };

    Ok((axis(height, kernel_h, "height")?, axis(width, kernel_w, "width")?))
}

/// Maps output position and kernel offset to an input coordinate, or `None`
/// when it falls inside the zero padding.
#[inline]
fn source_index(out: usize, offset: usize, stride: usize, pad: usize, extent: usize) -> Option<usize> {
    let padded = out * stride + offset;
    if padded < pad || padded - pad >= extent {
        None
    } else {
        Some(padded - pad)
    }
}

/// Unroll `input` `(N, C, H, W)` into a `(C·kh·kw, out_h·out_w·N)` patch matrix.
pub fn im2col(
    input: ArrayView4<'_, f64>,
    kernel_h: usize,
    kernel_w: usize,
    pad: usize,
    stride: usize,
) -> Result<Array2<f64>> {
    let (batch, channels, height, width) = input.dim();
    let (out_h, out_w) = output_size(height, width, kernel_h, kernel_w, pad, stride)?;
    trace!(
        "im2col: input {:?} -> patches ({}, {})",
        input.dim(),
        channels * kernel_h * kernel_w,
        out_h * out_w * batch
    );

    let mut cols = Array2::<f64>::zeros((channels * kernel_h * kernel_w, out_h * out_w * batch));
    for c in 0..channels {
        for i in 0..kernel_h {
            for j in 0..kernel_w {
                let row = (c * kernel_h + i) * kernel_w + j;
                for y in 0..out_h {
                    let Some(src_y) = source_index(y, i, stride, pad, height) else {
                        continue;
                    };
                    for x in 0..out_w {
                        let Some(src_x) = source_index(x, j, stride, pad, width) else {
                            continue;
                        };
                        let base = (y * out_w + x) * batch;
                        for n in 0..batch {
                            cols[[row, base + n]] = input[[n, c, src_y, src_x]];
                        }
                    }
                }
            }
        }
    }
    Ok(cols)
}

/// Fold a patch matrix back into a tensor of `shape`, summing overlaps.
///
/// Values that `im2col` would have read from the padding border are dropped.
pub fn col2im(
    cols: ArrayView2<'_, f64>,
    shape: (usize, usize, usize, usize),
    kernel_h: usize,
    kernel_w: usize,
    pad: usize,
    stride: usize,
) -> Result<Array4<f64>> {
    let (batch, channels, height, width) = shape;
    let (out_h, out_w) = output_size(height, width, kernel_h, kernel_w, pad, stride)?;
    let expected = (channels * kernel_h * kernel_w, out_h * out_w * batch);
    if cols.dim() != expected {
        return Err(LayerError::shape("col2im", expected, cols.dim()));
    }
    trace!("col2im: patches {:?} -> tensor {:?}", cols.dim(), shape);

    let mut out = Array4::<f64>::zeros(shape);
    for c in 0..channels {
        for i in 0..kernel_h {
            for j in 0..kernel_w {
                let row = (c * kernel_h + i) * kernel_w + j;
                for y in 0..out_h {
                    let Some(dst_y) = source_index(y, i, stride, pad, height) else {
                        continue;
                    };
                    for x in 0..out_w {
                        let Some(dst_x) = source_index(x, j, stride, pad, width) else {
                            continue;
                        };
                        let base = (y * out_w + x) * batch;
                        for n in 0..batch {
                            out[[n, c, dst_y, dst_x]] += cols[[row, base + n]];
                        }
                    }
                }
            }
        }
    }
    Ok(out)
}
