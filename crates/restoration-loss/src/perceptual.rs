//! Perceptual loss with the commonly paired style loss.
//!
//! Both terms compare activations of a pretrained network:
//!
//! ```text
//! perceptual = perceptual_weight * Σ_l w_l * criterion(φ_l(x), φ_l(gt))
//! style      = style_weight      * Σ_l w_l * criterion(G(φ_l(x)), G(φ_l(gt)))
//! ```
//!
//! where `G` is the Gram matrix. The ground truth is detached before feature
//! extraction, so no gradient flows into it.

use std::{collections::BTreeMap, fmt};

use burn::{
    config::Config,
    tensor::{backend::Backend, Tensor},
};
use restoration_extra_ops::gram_matrix;

use crate::{
    error::{ensure_same_shape, invalid_configuration, LossResult},
    feature::{take_layer, FeatureExtractor},
};

/// Distance used to compare features and Gram matrices.
#[derive(Config, Debug, Copy, PartialEq, Eq)]
pub enum Criterion {
    /// Mean absolute error.
    L1,
    /// Mean squared error.
    L2,
    /// Frobenius norm of the difference.
    Fro,
}

impl Criterion {
    fn distance<B: Backend, const D: usize>(self, lhs: Tensor<B, D>, rhs: Tensor<B, D>) -> Tensor<B, 1> {
        let diff = lhs - rhs;
        match self {
            Self::L1 => diff.abs().mean(),
            Self::L2 => (diff.clone() * diff).mean(),
            Self::Fro => (diff.clone() * diff).sum().sqrt(),
        }
    }
}

/// Configuration for creating a [perceptual loss](PerceptualLoss).
#[derive(Config, Debug)]
pub struct PerceptualLossConfig {
    /// Weight of each feature layer, e.g. `{"conv5_4": 1.0}`.
    pub layer_weights: BTreeMap<String, f64>,

    /// Scale of the perceptual term; the term is skipped when not positive. Default: 1.0
    #[config(default = 1.0)]
    pub perceptual_weight: f64,

    /// Scale of the style term; the term is skipped when not positive. Default: 0.0
    #[config(default = 0.0)]
    pub style_weight: f64,

    /// Distance between features. Default: L1
    #[config(default = "Criterion::L1")]
    pub criterion: Criterion,
}

impl PerceptualLossConfig {
    /// Initialize a [perceptual loss](PerceptualLoss) reading features from `extractor`.
    pub fn init<E>(&self, extractor: E) -> LossResult<PerceptualLoss<E>> {
        if self.layer_weights.is_empty() {
            return Err(invalid_configuration(
                "PerceptualLoss needs at least one feature layer",
            ));
        }
        if let Some((layer, weight)) = self
            .layer_weights
            .iter()
            .find(|(_, weight)| !weight.is_finite())
        {
            return Err(invalid_configuration(format!(
                "weight of layer `{layer}` must be finite, got {weight}"
            )));
        }
        if !(self.perceptual_weight.is_finite() && self.style_weight.is_finite()) {
            return Err(invalid_configuration(format!(
                "perceptual and style weights must be finite, got {} and {}",
                self.perceptual_weight, self.style_weight
            )));
        }

        Ok(PerceptualLoss {
            extractor,
            layer_weights: self.layer_weights.clone(),
            perceptual_weight: self.perceptual_weight,
            style_weight: self.style_weight,
            criterion: self.criterion,
        })
    }
}

/// Perceptual and style loss over the activations of a feature extractor.
pub struct PerceptualLoss<E> {
    extractor: E,
    layer_weights: BTreeMap<String, f64>,
    perceptual_weight: f64,
    style_weight: f64,
    criterion: Criterion,
}

impl<E> fmt::Debug for PerceptualLoss<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerceptualLoss")
            .field("layer_weights", &self.layer_weights)
            .field("perceptual_weight", &self.perceptual_weight)
            .field("style_weight", &self.style_weight)
            .field("criterion", &self.criterion)
            .finish_non_exhaustive()
    }
}

impl<E> PerceptualLoss<E> {
    /// The feature extractor this loss reads from.
    pub const fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Compute the perceptual and style terms.
    ///
    /// Either term is `None` when its weight is not positive.
    ///
    /// # Shapes
    ///
    /// - input: `[batch_size, 3, height, width]`
    /// - target: `[batch_size, 3, height, width]`
    /// - output: `([1], [1])`
    pub fn forward<B: Backend>(
        &self,
        input: Tensor<B, 4>,
        target: Tensor<B, 4>,
    ) -> LossResult<(Option<Tensor<B, 1>>, Option<Tensor<B, 1>>)>
    where
        E: FeatureExtractor<B>,
    {
        ensure_same_shape(target.dims(), input.dims())?;

        let mut input_features = self.extractor.extract(input);
        let mut target_features = self.extractor.extract(target.detach());

        let mut layers = Vec::with_capacity(self.layer_weights.len());
        for (name, &weight) in &self.layer_weights {
            let x = take_layer(&mut input_features, name)?;
            let y = take_layer(&mut target_features, name)?;
            layers.push((x, y, weight));
        }

        let perceptual = if self.perceptual_weight > 0.0 {
            weighted_sum(layers.iter().map(|(x, y, weight)| {
                self.criterion
                    .distance(x.clone(), y.clone())
                    .mul_scalar(*weight)
            }))
            .map(|loss| loss.mul_scalar(self.perceptual_weight))
        } else {
            None
        };

        let style = if self.style_weight > 0.0 {
            weighted_sum(layers.into_iter().map(|(x, y, weight)| {
                self.criterion
                    .distance(gram_matrix(x), gram_matrix(y))
                    .mul_scalar(weight)
            }))
            .map(|loss| loss.mul_scalar(self.style_weight))
        } else {
            None
        };

        Ok((perceptual, style))
    }
}

fn weighted_sum<B: Backend>(terms: impl Iterator<Item = Tensor<B, 1>>) -> Option<Tensor<B, 1>> {
    terms.reduce(|acc, term| acc + term)
}
