//! Affine parameter fusion of a normalization into a preceding convolution.

use ndarray::{Array1, Axis};
use snafu::ensure;
use tessera_ir::Tensor;

use crate::error::*;

/// Fold `y = (conv(x) - mean) / sqrt(var + eps) * scale + shift` into the
/// convolution's weight and bias.
///
/// Per output channel `c`:
///
/// ```text
/// r     = 1 / sqrt(var[c] + eps)
/// w'[c] = w[c] * scale[c] * r
/// b'[c] = (b[c] - mean[c]) * r * scale[c] + shift[c]
/// ```
///
/// The channel axis of the weight is 0, or 1 for transposed convolutions.
/// Missing `bias`/`shift` default to zeros and a missing `scale` to ones.
#[allow(clippy::too_many_arguments)]
pub fn fuse_affine_params(
    weight: &Tensor,
    bias: Option<&Tensor>,
    running_mean: &Tensor,
    running_var: &Tensor,
    eps: f64,
    scale: Option<&Tensor>,
    shift: Option<&Tensor>,
    transposed: bool,
) -> Result<(Tensor, Tensor)> {
    ensure!(weight.ndim() >= 2, InvalidWeightRankSnafu { rank: weight.ndim() });
    let channels = running_mean.len();
    let axis = if transposed { 1 } else { 0 };
    ensure!(
        weight.shape()[axis] == channels,
        ChannelMismatchSnafu { what: "convolution weight", expected: channels, actual: weight.shape()[axis] }
    );

    let mean = per_channel("running mean", Some(running_mean), channels, 0.0)?;
    let var = per_channel("running variance", Some(running_var), channels, 0.0)?;
    let scale = per_channel("normalization weight", scale, channels, 1.0)?;
    let shift = per_channel("normalization bias", shift, channels, 0.0)?;
    let bias = per_channel("convolution bias", bias, channels, 0.0)?;

    let eps = eps as f32;
    let rsqrt = var.mapv(|v| (v + eps).sqrt().recip());
    let factor = &scale * &rsqrt;

    let mut fused_weight = weight.clone();
    for (channel, mut lane) in fused_weight.axis_iter_mut(Axis(axis)).enumerate() {
        let f = factor[channel];
        lane.mapv_inplace(|v| v * f);
    }
    let fused_bias = (&bias - &mean) * &rsqrt * &scale + &shift;

    Ok((fused_weight, fused_bias.into_dyn()))
}

/// Flatten a per-channel tensor, or broadcast `fill` when it is absent.
fn per_channel(what: &str, tensor: Option<&Tensor>, channels: usize, fill: f32) -> Result<Array1<f32>> {
    let Some(tensor) = tensor else {
        return Ok(Array1::from_elem(channels, fill));
    };
    ensure!(tensor.len() == channels, ChannelMismatchSnafu { what, expected: channels, actual: tensor.len() });
    Ok(tensor.iter().copied().collect())
}
