//! # L2 Normalisation
//!
//! Divides each vector along a dimension by its Euclidean norm, with the norm
//! clamped from below the same way PyTorch's `F.normalize` does.

use burn::prelude::*;

/// Lower bound applied to the norm before dividing.
pub const NORMALIZE_EPS: f64 = 1e-12;

/// Normalise `tensor` to unit L2 norm along `dim`.
///
/// Computes `x / max(||x||_2, NORMALIZE_EPS)`, so an all-zero vector stays zero.
pub fn l2_normalize<B: Backend, const D: usize>(tensor: Tensor<B, D>, dim: usize) -> Tensor<B, D> {
    let norm = tensor
        .clone()
        .mul(tensor.clone())
        .sum_dim(dim)
        .sqrt()
        .clamp_min(NORMALIZE_EPS);

    tensor.div(norm)
}

#[cfg(test)]
mod tests {
    use burn::tensor::{ops::FloatElem, TensorData, Tolerance};

    use super::*;
    use crate::tests::TestBackend;

    type FT = FloatElem<TestBackend>;

    #[test]
    fn l2_normalize_scales_channel_vectors_to_unit_length() {
        let device = Default::default();
        // Two pixels, channel vectors (3, 4) and (0, 5).
        let tensor = Tensor::<TestBackend, 4>::from_data(
            TensorData::from([[[[3.0, 0.0]], [[4.0, 5.0]]]]),
            &device,
        );

        let normalized = l2_normalize(tensor, 1);

        let expected = TensorData::from([[[[0.6, 0.0]], [[0.8, 1.0]]]]);
        normalized
            .into_data()
            .assert_approx_eq::<FT>(&expected, Tolerance::default());
    }

    #[test]
    fn l2_normalize_keeps_zero_vectors_at_zero() {
        let device = Default::default();
        let tensor = Tensor::<TestBackend, 4>::zeros([1, 3, 2, 2], &device);

        let normalized = l2_normalize(tensor, 1);

        let expected = TensorData::from([[
            [[0.0, 0.0], [0.0, 0.0]],
            [[0.0, 0.0], [0.0, 0.0]],
            [[0.0, 0.0], [0.0, 0.0]],
        ]]);
        normalized
            .into_data()
            .assert_approx_eq::<FT>(&expected, Tolerance::default());
    }
}
