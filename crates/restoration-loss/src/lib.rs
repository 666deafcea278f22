//! Training losses for image restoration and stereo super-resolution.
//!
//! This crate provides the loss functions used to train restoration networks
//! with the Burn deep learning framework. Every loss is backend-agnostic and
//! configured through Burn's `Config` system; construction validates the
//! configuration and returns a [`LossResult`].
//!
//! ## Stereo Losses
//! - **[`StereoBMLoss`]**: L1 distance between block-matching disparity maps of
//!   a predicted and a ground-truth stereo pair packed as six channels
//! - **[`DisparityEstimator`]**: the block-matching estimator behind it, usable on its own
//!
//! ## Pixel-wise Losses
//! - **[`L1Loss`]**, **[`MseLoss`]**, **[`CharbonnierLoss`]**: element-wise
//!   criteria with optional per-pixel weights
//! - **[`WeightedTvLoss`]**: total variation regularizer
//!
//! ## Feature Losses
//! - **[`PerceptualLoss`]**: perceptual and style terms over named activations
//! - **[`LpipsLoss`]**: learned perceptual image patch similarity
//!
//! Both read activations through the [`FeatureExtractor`] trait, so any
//! pretrained network (or closure) producing named feature maps can drive them.
//!
//! ## Weighting
//!
//! Pixel losses accept weights shaped like the loss map or with a single
//! channel broadcast over all channels. With `Reduction::Mean` the weighted sum
//! is divided by the total weight instead of the element count.
//!
//! ## Usage Example
//!
//! ```rust
//! use burn::{backend::NdArray, nn::loss::Reduction, tensor::Tensor};
//! use restoration_loss::{L1LossConfig, StereoBMLossConfig};
//!
//! let device = Default::default();
//! let pixel = L1LossConfig::new().with_loss_weight(0.5).init().unwrap();
//! let stereo = StereoBMLossConfig::new()
//!     .with_num_disparities(4)
//!     .with_block_size(3)
//!     .init()
//!     .unwrap();
//!
//! let pred = Tensor::<NdArray, 4>::ones([1, 6, 8, 8], &device);
//! let gt = Tensor::<NdArray, 4>::zeros([1, 6, 8, 8], &device);
//!
//! let pixel_loss = pixel.forward(pred.clone(), gt.clone(), None, Reduction::Mean).unwrap();
//! let stereo_loss = stereo.forward(pred, gt, Reduction::Mean).unwrap();
//! assert_eq!(pixel_loss.dims(), [1]);
//! assert_eq!(stereo_loss.dims(), [1]);
//! ```

mod charbonnier;
mod disparity;
mod error;
mod feature;
mod l1;
mod lpips;
mod mse;
mod perceptual;
mod stereo_bm;
mod total_variation;
mod weighted;

pub use charbonnier::{CharbonnierLoss, CharbonnierLossConfig};
pub use disparity::{DisparityEstimator, DisparityEstimatorConfig, SearchRange};
pub use error::{LossError, LossResult};
pub use feature::{FeatureExtractor, FeatureMaps};
pub use l1::{L1Loss, L1LossConfig};
pub use lpips::{
    LpipsLinearLayers, LpipsLinearLayersRecord, LpipsLoss, LpipsLossConfig, LpipsNet,
};
pub use mse::{MseLoss, MseLossConfig};
pub use perceptual::{Criterion, PerceptualLoss, PerceptualLossConfig};
pub use stereo_bm::{StereoBMLoss, StereoBMLossConfig};
pub use total_variation::{WeightedTvLoss, WeightedTvLossConfig};

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;

    pub type TestBackend = NdArray<f32>;
}
