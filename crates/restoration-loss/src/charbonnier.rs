//! Charbonnier loss, a differentiable variant of L1.
//!
//! Described in "Deep Laplacian Pyramid Networks for Fast and Accurate
//! Super-Resolution". The unreduced loss is:
//!
//! ```text
//! l_n = w_n * sqrt((x_n - y_n)² + eps)
//! ```
//!
//! `eps` controls the curvature near zero.

use burn::{
    config::Config,
    module::{Content, DisplaySettings, Module, ModuleDisplay},
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};

use crate::{
    error::{ensure_same_shape, invalid_configuration, validate_loss_weight, LossResult},
    weighted::{apply_weights, weight_reduce},
};

/// Configuration for creating a [Charbonnier loss](CharbonnierLoss).
#[derive(Config, Debug)]
pub struct CharbonnierLossConfig {
    /// Scale applied to the loss. Default: 1.0
    #[config(default = 1.0)]
    pub loss_weight: f64,

    /// Curvature term added under the square root. Default: 1e-12
    #[config(default = 1e-12)]
    pub eps: f64,
}

impl CharbonnierLossConfig {
    /// Initialize [Charbonnier loss](CharbonnierLoss).
    pub fn init(&self) -> LossResult<CharbonnierLoss> {
        validate_loss_weight("CharbonnierLoss", self.loss_weight)?;
        if !(self.eps.is_finite() && self.eps > 0.0) {
            return Err(invalid_configuration(format!(
                "eps for CharbonnierLoss must be positive, got {}",
                self.eps
            )));
        }

        Ok(CharbonnierLoss {
            loss_weight: self.loss_weight,
            eps: self.eps,
        })
    }
}

/// Charbonnier loss.
#[derive(Module, Clone, Debug)]
#[module(custom_display)]
pub struct CharbonnierLoss {
    /// Scale applied to the loss.
    pub loss_weight: f64,
    /// Curvature term added under the square root.
    pub eps: f64,
}

impl Default for CharbonnierLoss {
    fn default() -> Self {
        Self {
            loss_weight: 1.0,
            eps: 1e-12,
        }
    }
}

impl ModuleDisplay for CharbonnierLoss {
    fn custom_settings(&self) -> Option<DisplaySettings> {
        DisplaySettings::new()
            .with_new_line_after_attribute(false)
            .optional()
    }

    fn custom_content(&self, content: Content) -> Option<Content> {
        content
            .add("loss_weight", &self.loss_weight)
            .add("eps", &self.eps)
            .optional()
    }
}

impl CharbonnierLoss {
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
        let loss = self.elementwise(predictions, targets)?;
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
        let loss = self.elementwise(predictions, targets)?;
        Ok(apply_weights(loss, weights)?.mul_scalar(self.loss_weight))
    }

    fn elementwise<B: Backend>(
        &self,
        predictions: Tensor<B, 4>,
        targets: Tensor<B, 4>,
    ) -> LossResult<Tensor<B, 4>> {
        ensure_same_shape(predictions.dims(), targets.dims())?;
        let diff = predictions - targets;
        Ok((diff.clone() * diff).add_scalar(self.eps).sqrt())
    }
}
