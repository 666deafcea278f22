//! Weighted total variation regularizer.
//!
//! Penalises the L1 norm of vertical and horizontal neighbour differences:
//!
//! ```text
//! TV = L1(x[:, :, :-1, :], x[:, :, 1:, :], w[:, :, :-1, :])
//!    + L1(x[:, :, :, :-1], x[:, :, :, 1:], w[:, :, :, :-1])
//! ```
//!
//! Each term is reduced on its own, so with `Mean` the result is the sum of
//! the two directional means.

use burn::{
    config::Config,
    module::{Content, DisplaySettings, Module, ModuleDisplay},
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};

use crate::{
    error::{validate_loss_weight, LossError, LossResult},
    l1::L1Loss,
};

/// Configuration for creating a [weighted TV loss](WeightedTvLoss).
#[derive(Config, Debug)]
pub struct WeightedTvLossConfig {
    /// Scale applied to the loss. Default: 1.0
    #[config(default = 1.0)]
    pub loss_weight: f64,
}

impl WeightedTvLossConfig {
    /// Initialize [weighted TV loss](WeightedTvLoss).
    pub fn init(&self) -> LossResult<WeightedTvLoss> {
        validate_loss_weight("WeightedTvLoss", self.loss_weight)?;
        Ok(WeightedTvLoss {
            l1: L1Loss {
                loss_weight: self.loss_weight,
            },
        })
    }
}

/// Weighted total variation loss.
#[derive(Module, Clone, Debug, Default)]
#[module(custom_display)]
pub struct WeightedTvLoss {
    /// L1 criterion applied to neighbour differences.
    pub l1: L1Loss,
}

impl ModuleDisplay for WeightedTvLoss {
    fn custom_settings(&self) -> Option<DisplaySettings> {
        DisplaySettings::new()
            .with_new_line_after_attribute(false)
            .optional()
    }

    fn custom_content(&self, content: Content) -> Option<Content> {
        content.add("loss_weight", &self.l1.loss_weight).optional()
    }
}

impl WeightedTvLoss {
    /// Compute the total variation of `predictions`.
    ///
    /// # Shapes
    ///
    /// - predictions: `[batch_size, channels, height, width]`, height and width at least 2
    /// - weights: `[batch_size, channels | 1, height, width]`
    /// - output: `[1]`
    pub fn forward<B: Backend>(
        &self,
        predictions: Tensor<B, 4>,
        weights: Option<Tensor<B, 4>>,
        reduction: Reduction,
    ) -> LossResult<Tensor<B, 1>> {
        let dims = predictions.dims();
        let [_, _, height, width] = dims;
        if height < 2 || width < 2 {
            return Err(LossError::ShapeMismatch {
                expected: "height and width of at least 2".to_owned(),
                actual: format!("{dims:?}"),
            });
        }

        let (y_weights, x_weights) = match weights {
            Some(weights) => (
                Some(weights.clone().narrow(2, 0, height - 1)),
                Some(weights.narrow(3, 0, width - 1)),
            ),
            None => (None, None),
        };

        let y_diff = self.l1.forward(
            predictions.clone().narrow(2, 0, height - 1),
            predictions.clone().narrow(2, 1, height - 1),
            y_weights,
            reduction.clone(),
        )?;
        let x_diff = self.l1.forward(
            predictions.clone().narrow(3, 0, width - 1),
            predictions.narrow(3, 1, width - 1),
            x_weights,
            reduction,
        )?;

        Ok(x_diff + y_diff)
    }
}

#[cfg(test)]
mod tests {
    use burn::tensor::{ops::FloatElem, TensorData, Tolerance};

    use super::*;
    use crate::tests::TestBackend;

    type FT = FloatElem<TestBackend>;

    fn horizontal_ramp() -> Tensor<TestBackend, 4> {
        Tensor::from_data(
            TensorData::from([[[
                [0.0, 1.0, 2.0],
                [0.0, 1.0, 2.0],
                [0.0, 1.0, 2.0],
            ]]]),
            &Default::default(),
        )
    }

    #[test]
    fn tv_loss_of_constant_image_is_zero() {
        let device = Default::default();
        let loss = WeightedTvLoss::default();
        let pred = Tensor::<TestBackend, 4>::ones([2, 3, 4, 4], &device);

        let result = loss.forward(pred, None, Reduction::Mean).unwrap();

        result
            .into_data()
            .assert_approx_eq::<FT>(&TensorData::from([0.0]), Tolerance::default());
    }

    #[test]
    fn tv_loss_of_ramp_equals_slope() {
        let loss = WeightedTvLoss::default();

        let mean = loss
            .forward(horizontal_ramp(), None, Reduction::Mean)
            .unwrap();
        let sum = loss.forward(horizontal_ramp(), None, Reduction::Sum).unwrap();

        mean.into_data()
            .assert_approx_eq::<FT>(&TensorData::from([1.0]), Tolerance::default());
        // Six horizontal neighbour pairs with difference 1.
        sum.into_data()
            .assert_approx_eq::<FT>(&TensorData::from([6.0]), Tolerance::default());
    }

    #[test]
    fn tv_loss_weights_mask_out_columns() {
        let device = Default::default();
        let loss = WeightedTvLossConfig::new().with_loss_weight(0.5).init().unwrap();
        let weights = Tensor::<TestBackend, 4>::from_data(
            TensorData::from([[[
                [1.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
            ]]]),
            &device,
        );

        let result = loss
            .forward(horizontal_ramp(), Some(weights), Reduction::Sum)
            .unwrap();

        // Only the first column pair of each row contributes: 3 * 1 * 0.5
        result
            .into_data()
            .assert_approx_eq::<FT>(&TensorData::from([1.5]), Tolerance::default());
    }

    #[test]
    fn tv_loss_rejects_single_row_images() {
        let device = Default::default();
        let loss = WeightedTvLoss::default();
        let pred = Tensor::<TestBackend, 4>::ones([1, 1, 1, 4], &device);

        let result = loss.forward(pred, None, Reduction::Mean);

        assert!(matches!(result, Err(LossError::ShapeMismatch { .. })));
    }
}
