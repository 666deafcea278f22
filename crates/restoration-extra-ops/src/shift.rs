//! # Horizontal Shift
//!
//! Moves image columns left or right, filling the uncovered columns with zeros
//! instead of wrapping them around like a roll would.

use burn::prelude::*;

/// Shift the last (width) dimension of `tensor` by `offset` columns.
///
/// Column `j` of the output holds column `j + offset` of the input, or zero
/// when `j + offset` falls outside `[0, width)`.
pub fn shift_columns<B: Backend>(tensor: Tensor<B, 4>, offset: isize) -> Tensor<B, 4> {
    if offset == 0 {
        return tensor;
    }

    let [batch, channels, height, width] = tensor.dims();
    let device = tensor.device();
    let magnitude = offset.unsigned_abs();
    if magnitude >= width {
        return Tensor::zeros([batch, channels, height, width], &device);
    }

    let kept = width - magnitude;
    let fill = Tensor::zeros([batch, channels, height, magnitude], &device);
    if offset > 0 {
        let body = tensor.narrow(3, magnitude, kept);
        Tensor::cat(vec![body, fill], 3)
    } else {
        let body = tensor.narrow(3, 0, kept);
        Tensor::cat(vec![fill, body], 3)
    }
}

#[cfg(test)]
mod tests {
    use burn::tensor::{ops::FloatElem, TensorData, Tolerance};

    use super::*;
    use crate::tests::TestBackend;

    type FT = FloatElem<TestBackend>;

    fn row(device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 4> {
        Tensor::from_data(TensorData::from([[[[1.0, 2.0, 3.0, 4.0]]]]), device)
    }

    #[test]
    fn shift_columns_negative_offset_reads_from_the_left() {
        let device = Default::default();

        let shifted = shift_columns(row(&device), -1);

        let expected = TensorData::from([[[[0.0, 1.0, 2.0, 3.0]]]]);
        shifted
            .into_data()
            .assert_approx_eq::<FT>(&expected, Tolerance::default());
    }

    #[test]
    fn shift_columns_positive_offset_reads_from_the_right() {
        let device = Default::default();

        let shifted = shift_columns(row(&device), 2);

        let expected = TensorData::from([[[[3.0, 4.0, 0.0, 0.0]]]]);
        shifted
            .into_data()
            .assert_approx_eq::<FT>(&expected, Tolerance::default());
    }

    #[test]
    fn shift_columns_beyond_width_yields_zeros() {
        let device = Default::default();

        let shifted = shift_columns(row(&device), -4);

        let expected = TensorData::from([[[[0.0, 0.0, 0.0, 0.0]]]]);
        shifted
            .into_data()
            .assert_approx_eq::<FT>(&expected, Tolerance::default());
    }

    #[test]
    fn shift_columns_zero_offset_is_identity() {
        let device = Default::default();

        let shifted = shift_columns(row(&device), 0);

        shifted
            .into_data()
            .assert_approx_eq::<FT>(&row(&device).into_data(), Tolerance::default());
    }
}
