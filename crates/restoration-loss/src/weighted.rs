//! Element-wise weighting and reduction shared by the pixel losses.
//!
//! Weights are either the full `[batch, channels, height, width]` shape of the
//! loss map or a single channel `[batch, 1, height, width]` broadcast over all
//! channels. A weighted mean divides by the total weight rather than by the
//! element count:
//!
//! ```text
//! mean = sum(loss * w) / sum(w)          (w has C channels)
//! mean = sum(loss * w) / (sum(w) * C)    (w has 1 channel)
//! ```

use burn::{
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};

use crate::error::{LossError, LossResult};

/// Reduce an unweighted loss map.
pub(crate) fn reduce<B: Backend, const D: usize>(
    loss: Tensor<B, D>,
    reduction: Reduction,
) -> Tensor<B, 1> {
    match reduction {
        Reduction::Mean | Reduction::Auto => loss.mean(),
        Reduction::Sum => loss.sum(),
    }
}

/// Multiply `loss` by `weights`, broadcasting a single weight channel.
pub(crate) fn apply_weights<B: Backend>(
    loss: Tensor<B, 4>,
    weights: Option<Tensor<B, 4>>,
) -> LossResult<Tensor<B, 4>> {
    match weights {
        Some(weights) => {
            let dims = loss.dims();
            Ok(loss * broadcast_weights(dims, weights)?)
        }
        None => Ok(loss),
    }
}

/// Weight and reduce `loss` to a single value.
pub(crate) fn weight_reduce<B: Backend>(
    loss: Tensor<B, 4>,
    weights: Option<Tensor<B, 4>>,
    reduction: Reduction,
) -> LossResult<Tensor<B, 1>> {
    let Some(weights) = weights else {
        return Ok(reduce(loss, reduction));
    };

    let dims = loss.dims();
    let weight_channels = weights.dims()[1];
    let denominator = weights.clone().sum();
    let weighted = loss * broadcast_weights(dims, weights)?;

    Ok(match reduction {
        Reduction::Sum => weighted.sum(),
        Reduction::Mean | Reduction::Auto => {
            let denominator = if weight_channels == dims[1] {
                denominator
            } else {
                denominator.mul_scalar(dims[1] as f64)
            };
            weighted.sum() / denominator
        }
    })
}

fn broadcast_weights<B: Backend>(
    dims: [usize; 4],
    weights: Tensor<B, 4>,
) -> LossResult<Tensor<B, 4>> {
    let [batch, _, height, width] = dims;
    let weight_dims = weights.dims();

    if weight_dims == dims {
        Ok(weights)
    } else if weight_dims == [batch, 1, height, width] {
        Ok(weights.expand(dims))
    } else {
        Err(LossError::ShapeMismatch {
            expected: format!("{dims:?} or {:?}", [batch, 1, height, width]),
            actual: format!("{weight_dims:?}"),
        })
    }
}
