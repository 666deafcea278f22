//! Additional tensor operations for the restoration losses.
//!
//! This crate provides operations that the losses need but that are not
//! available in the core Burn framework: PyTorch-style L2 normalisation, a
//! zero-filled horizontal shift and the Gram matrix of a feature map.

use burn::prelude::*;

mod gram;
mod normalize;
mod shift;

// Convenient re-exports
#[doc(inline)]
pub use gram::gram_matrix;
#[doc(inline)]
pub use normalize::{l2_normalize, NORMALIZE_EPS};
#[doc(inline)]
pub use shift::shift_columns;

/// Additional operations for 4D image tensors laid out as `[batch, channels, height, width]`.
pub trait TensorExtraOps<B: Backend> {
    /// Scale every vector along `dim` to unit Euclidean length.
    fn l2_normalize(self, dim: usize) -> Self;

    /// Shift the columns by `offset`, filling uncovered columns with zeros.
    fn shift_columns(self, offset: isize) -> Self;

    /// Gram matrix of the channels, normalised by `channels * height * width`.
    fn gram_matrix(self) -> Tensor<B, 3>;
}

impl<B: Backend> TensorExtraOps<B> for Tensor<B, 4> {
    fn l2_normalize(self, dim: usize) -> Self {
        l2_normalize(self, dim)
    }

    fn shift_columns(self, offset: isize) -> Self {
        shift_columns(self, offset)
    }

    fn gram_matrix(self) -> Tensor<B, 3> {
        gram_matrix(self)
    }
}

#[cfg(test)]
mod tests {
    use burn::{
        backend::{Autodiff, NdArray},
        tensor::{Distribution, Tensor},
    };

    use super::*;

    pub type TestBackend = NdArray<f32>;

    #[test]
    fn extra_ops_trait_preserves_image_shape() {
        let device = Default::default();
        let tensor = Tensor::<Autodiff<TestBackend>, 4>::random(
            [2, 3, 4, 5],
            Distribution::Normal(0.0, 1.0),
            &device,
        );

        assert_eq!(tensor.clone().l2_normalize(1).dims(), [2, 3, 4, 5]);
        assert_eq!(tensor.clone().shift_columns(-2).dims(), [2, 3, 4, 5]);
        assert_eq!(tensor.gram_matrix().dims(), [2, 3, 3]);
    }
}
