//! Gram matrix of a feature map, used by style losses.

use burn::prelude::*;

/// Compute the Gram matrix of `features`.
///
/// # Shapes
///
/// - features: `[batch, channels, height, width]`
/// - output: `[batch, channels, channels]`
///
/// The result is `F · Fᵀ / (channels · height · width)` with `F` the features
/// flattened to `[batch, channels, height * width]`.
pub fn gram_matrix<B: Backend>(features: Tensor<B, 4>) -> Tensor<B, 3> {
    let [batch, channels, height, width] = features.dims();
    let flat = features.reshape([batch, channels, height * width]);
    let transposed = flat.clone().swap_dims(1, 2);

    flat.matmul(transposed)
        .div_scalar((channels * height * width) as f64)
}
