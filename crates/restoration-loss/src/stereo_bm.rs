//! Stereo block-matching loss.
//!
//! Prediction and ground truth are stereo pairs packed as six channels, the
//! left view in channels `0..3` and the right view in `3..6`. The loss is the
//! L1 distance between the disparity maps the two pairs produce under the same
//! [`DisparityEstimator`]:
//!
//! ```text
//! loss = loss_weight * reduce(|D(pred_l, pred_r) - D(gt_l, gt_r)|)
//! ```
//!
//! Disparity estimation goes through `argmin`, so no gradient reaches the
//! prediction. The loss is a training-time metric rather than a training signal.

use burn::{
    config::Config,
    module::{Content, DisplaySettings, Module, ModuleDisplay},
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};

use crate::{
    disparity::{DisparityEstimator, DisparityEstimatorConfig},
    error::{ensure_channels, ensure_same_shape, validate_loss_weight, LossResult},
    weighted::reduce,
};

/// Channels of a packed stereo pair.
const STEREO_CHANNELS: usize = 6;

/// Configuration for creating a [stereo block-matching loss](StereoBMLoss).
#[derive(Config, Debug)]
pub struct StereoBMLossConfig {
    /// Width of the search window of every candidate shift. Default: 128
    #[config(default = 128)]
    pub num_disparities: usize,

    /// Side of the square matching patch, odd. Default: 21
    #[config(default = 21)]
    pub block_size: usize,

    /// Scale applied to the loss. Default: 1.0
    #[config(default = 1.0)]
    pub loss_weight: f64,
}

impl StereoBMLossConfig {
    /// Initialize [stereo block-matching loss](StereoBMLoss).
    pub fn init(&self) -> LossResult<StereoBMLoss> {
        validate_loss_weight("StereoBMLoss", self.loss_weight)?;
        let estimator = DisparityEstimatorConfig::new()
            .with_num_disparities(self.num_disparities)
            .with_block_size(self.block_size)
            .init()?;

        Ok(StereoBMLoss {
            estimator,
            loss_weight: self.loss_weight,
        })
    }
}

/// L1 distance between block-matching disparity maps of two stereo pairs.
#[derive(Module, Clone, Debug)]
#[module(custom_display)]
pub struct StereoBMLoss {
    /// Estimator shared by prediction and ground truth.
    pub estimator: DisparityEstimator,
    /// Scale applied to the loss.
    pub loss_weight: f64,
}

impl ModuleDisplay for StereoBMLoss {
    fn custom_settings(&self) -> Option<DisplaySettings> {
        DisplaySettings::new()
            .with_new_line_after_attribute(false)
            .optional()
    }

    fn custom_content(&self, content: Content) -> Option<Content> {
        content
            .add("num_disparities", &self.estimator.num_disparities)
            .add("block_size", &self.estimator.block_size)
            .add("loss_weight", &self.loss_weight)
            .optional()
    }
}

impl StereoBMLoss {
    /// Compute the criterion with reduction.
    ///
    /// # Shapes
    ///
    /// - predictions: `[batch_size, 6, height, width]`
    /// - targets: `[batch_size, 6, height, width]`
    /// - output: `[1]`
    pub fn forward<B: Backend>(
        &self,
        predictions: Tensor<B, 4>,
        targets: Tensor<B, 4>,
        reduction: Reduction,
    ) -> LossResult<Tensor<B, 1>> {
        let loss = self.forward_no_reduction(predictions, targets)?;
        Ok(reduce(loss, reduction))
    }

    /// Compute the per-pixel absolute disparity difference.
    ///
    /// # Shapes
    ///
    /// - output: `[batch_size, height, width]`
    pub fn forward_no_reduction<B: Backend>(
        &self,
        predictions: Tensor<B, 4>,
        targets: Tensor<B, 4>,
    ) -> LossResult<Tensor<B, 3>> {
        ensure_same_shape(predictions.dims(), targets.dims())?;
        ensure_channels(predictions.dims(), STEREO_CHANNELS)?;

        let predicted = self.disparity(predictions)?;
        let expected = self.disparity(targets)?;

        Ok((predicted - expected).abs().mul_scalar(self.loss_weight))
    }

    /// Disparity map of a packed stereo pair.
    fn disparity<B: Backend>(&self, pair: Tensor<B, 4>) -> LossResult<Tensor<B, 3>> {
        let left = pair.clone().narrow(1, 0, 3);
        let right = pair.narrow(1, 3, 3);
        self.estimator.estimate(left, right)
    }
}
