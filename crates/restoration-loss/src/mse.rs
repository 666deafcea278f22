//! Mean squared error (L2) loss.
//!
//! The unreduced loss is `l_n = w_n * (x_n - y_n)²`, reduced like
//! [`L1Loss`](crate::L1Loss) and scaled by `loss_weight`.

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

/// Configuration for creating an [MSE loss](MseLoss).
#[derive(Config, Debug)]
pub struct MseLossConfig {
    /// Scale applied to the loss. Default: 1.0
    #[config(default = 1.0)]
    pub loss_weight: f64,
}

impl MseLossConfig {
    /// Initialize [MSE loss](MseLoss).
    pub fn init(&self) -> LossResult<MseLoss> {
        validate_loss_weight("MseLoss", self.loss_weight)?;
        Ok(MseLoss {
            loss_weight: self.loss_weight,
        })
    }
}

/// Mean squared error (L2) loss.
#[derive(Module, Clone, Debug)]
#[module(custom_display)]
pub struct MseLoss {
    /// Scale applied to the loss.
    pub loss_weight: f64,
}

impl Default for MseLoss {
    fn default() -> Self {
        Self { loss_weight: 1.0 }
    }
}

impl ModuleDisplay for MseLoss {
    fn custom_settings(&self) -> Option<DisplaySettings> {
        DisplaySettings::new()
            .with_new_line_after_attribute(false)
            .optional()
    }

    fn custom_content(&self, content: Content) -> Option<Content> {
        content.add("loss_weight", &self.loss_weight).optional()
    }
}

impl MseLoss {
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
        let diff = predictions - targets;
        Ok(diff.clone() * diff)
    }
}
