//! Feature extraction capability consumed by the deep-feature losses.
//!
//! The pretrained classifiers (VGG, AlexNet) are not part of this crate. A
//! loss only needs named activation maps, so any network, or a closure, that
//! maps an image batch to those maps can drive [`PerceptualLoss`](crate::PerceptualLoss)
//! and [`LpipsLoss`](crate::LpipsLoss).

use std::collections::BTreeMap;

use burn::tensor::{backend::Backend, Tensor};

use crate::error::{LossError, LossResult};

/// Activation maps keyed by layer name, each `[batch, channels, height, width]`.
pub type FeatureMaps<B> = BTreeMap<String, Tensor<B, 4>>;

/// A network that exposes intermediate activations of an image batch.
pub trait FeatureExtractor<B: Backend> {
    /// Run `input` (`[batch, 3, height, width]`) through the network.
    fn extract(&self, input: Tensor<B, 4>) -> FeatureMaps<B>;
}

impl<B, F> FeatureExtractor<B> for F
where
    B: Backend,
    F: Fn(Tensor<B, 4>) -> FeatureMaps<B>,
{
    fn extract(&self, input: Tensor<B, 4>) -> FeatureMaps<B> {
        self(input)
    }
}

/// Remove `layer` from `features`, failing if the extractor did not produce it.
pub(crate) fn take_layer<B: Backend>(
    features: &mut FeatureMaps<B>,
    layer: &str,
) -> LossResult<Tensor<B, 4>> {
    features
        .remove(layer)
        .ok_or_else(|| LossError::MissingFeatureLayer {
            layer: layer.to_owned(),
        })
}
