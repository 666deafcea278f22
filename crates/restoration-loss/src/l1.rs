//! L1 (mean absolute error) loss.
//!
//! The unreduced loss is `l_n = w_n * |x_n - y_n|` with optional element-wise
//! weights `w`. When reduction is applied:
//! - `Mean`/`Auto`: weighted mean (see the crate docs on weighting)
//! - `Sum`: `sum(L)`
//!
//! The result is scaled by the configured `loss_weight`.

use burn::{
    config::Config,
    module::{Content, DisplaySettings, Module, ModuleDisplay},
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};

use crate::{
    error::{ensure_same_shape, validate_loss_weight, LossResult},
    weighted::{apply_weights, weight_reduce},
};

/// Configuration for creating an [L1 loss](L1Loss).
#[derive(Config, Debug)]
pub struct L1LossConfig {
    /// Scale applied to the loss. Default: 1.0
    #[config(default = 1.0)]
    pub loss_weight: f64,
}

impl L1LossConfig {
    /// Initialize [L1 loss](L1Loss).
    pub fn init(&self) -> LossResult<L1Loss> {
        validate_loss_weight("L1Loss", self.loss_weight)?;
        Ok(L1Loss {
            loss_weight: self.loss_weight,
        })
    }
}

/// L1 (mean absolute error) loss.
#[derive(Module, Clone, Debug)]
#[module(custom_display)]
pub struct L1Loss {
    /// Scale applied to the loss.
    pub loss_weight: f64,
}

impl Default for L1Loss {
    fn default() -> Self {
        Self { loss_weight: 1.0 }
    }
}

impl ModuleDisplay for L1Loss {
    fn custom_settings(&self) -> Option<DisplaySettings> {
        DisplaySettings::new()
            .with_new_line_after_attribute(false)
            .optional()
    }

    fn custom_content(&self, content: Content) -> Option<Content> {
        content.add("loss_weight", &self.loss_weight).optional()
    }
}

impl L1Loss {
    /// Compute the criterion with reduction.
    ///
    /// # Shapes
    ///
    /// - predictions: `[batch_size, channels, height, width]`
    /// - targets: `[batch_size, channels, height, width]`
    /// - weights: `[batch_size, channels | 1, height, width]`
    /// - output: `[1]`
    pub fn forward<B: Backend>(
        &self,
        predictions: Tensor<B, 4>,
        targets: Tensor<B, 4>,
        weights: Option<Tensor<B, 4>>,
        reduction: Reduction,
    ) -> LossResult<Tensor<B, 1>> {
        let loss = Self::elementwise(predictions, targets)?;
        Ok(weight_reduce(loss, weights, reduction)?.mul_scalar(self.loss_weight))
    }

    /// Compute the criterion without reduction.
    ///
    /// # Shapes
    ///
    /// - predictions: `[batch_size, channels, height, width]`
    /// - targets: `[batch_size, channels, height, width]`
    /// - weights: `[batch_size, channels | 1, height, width]`
    /// - output: `[batch_size, channels, height, width]`
    pub fn forward_no_reduction<B: Backend>(
        &self,
        predictions: Tensor<B, 4>,
        targets: Tensor<B, 4>,
        weights: Option<Tensor<B, 4>>,
    ) -> LossResult<Tensor<B, 4>> {
        let loss = Self::elementwise(predictions, targets)?;
        Ok(apply_weights(loss, weights)?.mul_scalar(self.loss_weight))
    }

    fn elementwise<B: Backend>(
        predictions: Tensor<B, 4>,
        targets: Tensor<B, 4>,
    ) -> LossResult<Tensor<B, 4>> {
        ensure_same_shape(predictions.dims(), targets.dims())?;
        Ok((predictions - targets).abs())
    }
}

#[cfg(test)]
mod tests {
    use burn::tensor::{ops::FloatElem, TensorData, Tolerance, Transaction};

    use super::*;
    use crate::{error::LossError, tests::TestBackend};

    type FT = FloatElem<TestBackend>;

    fn pair() -> (Tensor<TestBackend, 4>, Tensor<TestBackend, 4>) {
        let device = Default::default();
        let pred = Tensor::from_data(TensorData::from([[[[2.0, 3.0], [4.0, 5.0]]]]), &device);
        let target = Tensor::from_data(TensorData::from([[[[1.0, 1.0], [1.0, 1.0]]]]), &device);
        (pred, target)
    }

    #[test]
    fn l1_loss_identical_tensors_returns_zero() {
        let loss = L1Loss::default();
        let (pred, _) = pair();

        let result = loss
            .forward(pred.clone(), pred, None, Reduction::Mean)
            .unwrap();

        result
            .into_data()
            .assert_approx_eq::<FT>(&TensorData::from([0.0]), Tolerance::default());
    }

    #[test]
    fn l1_loss_reductions_match_hand_computed_values() {
        let loss = L1Loss::default();
        let (pred, target) = pair();

        let mean = loss
            .forward(pred.clone(), target.clone(), None, Reduction::Mean)
            .unwrap();
        let sum = loss
            .forward(pred.clone(), target.clone(), None, Reduction::Sum)
            .unwrap();
        let none = loss.forward_no_reduction(pred, target, None).unwrap();

        let [mean, sum, none] = Transaction::default()
            .register(mean)
            .register(sum)
            .register(none)
            .execute()
            .try_into()
            .expect("Correct amount of tensor data");

        // 1 + 2 + 3 + 4 = 10
        mean.assert_approx_eq::<FT>(&TensorData::from([2.5]), Tolerance::default());
        sum.assert_approx_eq::<FT>(&TensorData::from([10.0]), Tolerance::default());
        none.assert_approx_eq::<FT>(
            &TensorData::from([[[[1.0, 2.0], [3.0, 4.0]]]]),
            Tolerance::default(),
        );
    }

    #[test]
    fn l1_loss_weighted_mean_ignores_zero_weight_elements() {
        let device = Default::default();
        let loss = L1Loss::default();
        let (pred, target) = pair();
        let weights = Tensor::from_data(TensorData::from([[[[0.0, 0.0], [1.0, 1.0]]]]), &device);

        let result = loss
            .forward(pred, target, Some(weights), Reduction::Mean)
            .unwrap();

        // (3 + 4) / 2
        result
            .into_data()
            .assert_approx_eq::<FT>(&TensorData::from([3.5]), Tolerance::default());
    }

    #[test]
    fn l1_loss_weight_scales_result() {
        let loss = L1LossConfig::new().with_loss_weight(2.0).init().unwrap();
        let (pred, target) = pair();

        let result = loss.forward(pred, target, None, Reduction::Mean).unwrap();

        result
            .into_data()
            .assert_approx_eq::<FT>(&TensorData::from([5.0]), Tolerance::default());
    }

    #[test]
    fn l1_loss_config_negative_weight_is_rejected() {
        let result = L1LossConfig::new().with_loss_weight(-1.0).init();

        assert!(matches!(result, Err(LossError::InvalidConfiguration { .. })));
    }

    #[test]
    fn l1_loss_mismatched_shapes_are_rejected() {
        let device = Default::default();
        let loss = L1Loss::default();
        let pred = Tensor::<TestBackend, 4>::zeros([1, 1, 2, 2], &device);
        let target = Tensor::<TestBackend, 4>::zeros([1, 1, 2, 3], &device);

        let result = loss.forward(pred, target, None, Reduction::Mean);

        assert!(matches!(result, Err(LossError::ShapeMismatch { .. })));
    }

    #[test]
    fn l1_loss_display_shows_loss_weight() {
        let loss = L1LossConfig::new().with_loss_weight(0.5).init().unwrap();

        assert_eq!(format!("{loss}"), "L1Loss {loss_weight: 0.5}");
    }
}
