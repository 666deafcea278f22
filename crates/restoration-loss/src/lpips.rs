//! Learned Perceptual Image Patch Similarity (LPIPS) loss.
//!
//! Reference: "The Unreasonable Effectiveness of Deep Features as a Perceptual
//! Metric" (<https://arxiv.org/abs/1801.03924>).
//!
//! Five activation maps of a pretrained AlexNet or VGG16 are unit-normalised
//! over channels, their squared difference is projected by a learned 1×1
//! convolution and averaged spatially. The backbone is supplied through
//! [`FeatureExtractor`]; the learned projections live in [`LpipsLinearLayers`].

use std::fmt;

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        Initializer,
    },
    tensor::{backend::Backend, Tensor},
};

use crate::{
    error::{ensure_channels, ensure_same_shape, invalid_configuration, LossResult},
    feature::{take_layer, FeatureExtractor},
};

/// Z-score shift applied to images in `[-1, 1]` before feature extraction.
const SHIFT: [f32; 3] = [-0.030, -0.088, -0.188];
/// Z-score scale applied to images in `[-1, 1]` before feature extraction.
const SCALE: [f32; 3] = [0.458, 0.448, 0.450];
const ACTIVATION_EPS: f64 = 1e-10;

/// Backbone whose activations LPIPS compares.
#[derive(Config, Debug, Copy, PartialEq, Eq)]
pub enum LpipsNet {
    /// AlexNet features.
    Alex,
    /// VGG16 features.
    Vgg,
}

impl LpipsNet {
    /// Layer names the [`FeatureExtractor`] must produce, shallowest first.
    pub const fn layer_names(self) -> [&'static str; 5] {
        match self {
            Self::Alex => ["relu1", "relu2", "relu3", "relu4", "relu5"],
            Self::Vgg => ["relu1_2", "relu2_2", "relu3_3", "relu4_3", "relu5_3"],
        }
    }

    /// Channel count of each tapped layer.
    pub const fn channels(self) -> [usize; 5] {
        match self {
            Self::Alex => [64, 192, 384, 256, 256],
            Self::Vgg => [64, 128, 256, 512, 512],
        }
    }

    /// File name of the published linear-layer checkpoint.
    pub const fn checkpoint_name(self) -> &'static str {
        match self {
            Self::Alex => "lpips_alex.pth",
            Self::Vgg => "lpips_vgg.pth",
        }
    }
}

/// Configuration for creating an [LPIPS loss](LpipsLoss).
#[derive(Config, Debug)]
pub struct LpipsLossConfig {
    /// Backbone the extractor implements. Default: VGG16
    #[config(default = "LpipsNet::Vgg")]
    pub net: LpipsNet,

    /// Per-layer weights, one for each of the five tapped layers.
    #[config(default = "vec![1.0; 5]")]
    pub alpha: Vec<f64>,

    /// Scale of the loss; the loss is skipped when not positive. Default: 1.0
    #[config(default = 1.0)]
    pub perceptual_weight: f64,

    /// Map inputs from `[0, 1]` to `[-1, 1]` before comparing. Default: false
    #[config(default = false)]
    pub use_range_norm: bool,
}

impl LpipsLossConfig {
    /// Initialize an [LPIPS loss](LpipsLoss) with freshly initialized linear layers.
    ///
    /// Replace them with trained weights through [`LpipsLoss::load_linear_record`]
    /// (or `load_pytorch` with the `pretrained` feature) before training.
    pub fn init<B: Backend, E>(
        &self,
        extractor: E,
        device: &B::Device,
    ) -> LossResult<LpipsLoss<B, E>> {
        if self.alpha.len() != 5 {
            return Err(invalid_configuration(format!(
                "LpipsLoss needs 5 layer weights, got {}",
                self.alpha.len()
            )));
        }
        if self.alpha.iter().any(|a| !a.is_finite()) || !self.perceptual_weight.is_finite() {
            return Err(invalid_configuration(format!(
                "LpipsLoss weights must be finite, got alpha {:?} and perceptual weight {}",
                self.alpha, self.perceptual_weight
            )));
        }

        Ok(LpipsLoss {
            extractor,
            lin: LpipsLinearLayers::new(self.net, device),
            net: self.net,
            alpha: self.alpha.clone(),
            perceptual_weight: self.perceptual_weight,
            use_range_norm: self.use_range_norm,
        })
    }
}

/// Learned bias-free 1×1 projections, one per tapped layer.
#[derive(Module, Debug)]
pub struct LpipsLinearLayers<B: Backend> {
    /// Projection of each layer's channels onto a single map.
    pub layers: Vec<Conv2d<B>>,
}

impl<B: Backend> LpipsLinearLayers<B> {
    /// Create the projections for `net` with the default initializer.
    pub fn new(net: LpipsNet, device: &B::Device) -> Self {
        Self::build(net, None, device)
    }

    /// Create the projections for `net` with every weight drawn from `initializer`.
    pub fn with_initializer(net: LpipsNet, initializer: Initializer, device: &B::Device) -> Self {
        Self::build(net, Some(initializer), device)
    }

    fn build(net: LpipsNet, initializer: Option<Initializer>, device: &B::Device) -> Self {
        let layers = net
            .channels()
            .into_iter()
            .map(|channels| {
                let config = Conv2dConfig::new([channels, 1], [1, 1]).with_bias(false);
                let config = match &initializer {
                    Some(initializer) => config.with_initializer(initializer.clone()),
                    None => config,
                };
                config.init(device)
            })
            .collect();

        Self { layers }
    }
}

/// LPIPS loss over the activations of a feature extractor.
pub struct LpipsLoss<B: Backend, E> {
    extractor: E,
    lin: LpipsLinearLayers<B>,
    net: LpipsNet,
    alpha: Vec<f64>,
    perceptual_weight: f64,
    use_range_norm: bool,
}

impl<B: Backend, E> fmt::Debug for LpipsLoss<B, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LpipsLoss")
            .field("net", &self.net)
            .field("alpha", &self.alpha)
            .field("perceptual_weight", &self.perceptual_weight)
            .field("use_range_norm", &self.use_range_norm)
            .finish_non_exhaustive()
    }
}

impl<B: Backend, E> LpipsLoss<B, E> {
    /// Replace the linear layers.
    pub fn with_linear_layers(mut self, lin: LpipsLinearLayers<B>) -> Self {
        self.lin = lin;
        self
    }

    /// Load trained weights into the linear layers.
    pub fn load_linear_record(mut self, record: LpipsLinearLayersRecord<B>) -> Self {
        self.lin = self.lin.load_record(record);
        self
    }

    /// The learned linear layers.
    pub const fn linear_layers(&self) -> &LpipsLinearLayers<B> {
        &self.lin
    }

    /// Load the published `lpips_{alex,vgg}.pth` checkpoint into the linear layers.
    #[cfg(feature = "pretrained")]
    pub fn load_pytorch(
        mut self,
        path: impl AsRef<std::path::Path>,
        device: &B::Device,
    ) -> LossResult<Self> {
        use burn::record::{FullPrecisionSettings, Recorder};
        use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};

        use crate::error::LossError;

        let path = path.as_ref();
        tracing::debug!(path = %path.display(), net = ?self.net, "loading LPIPS linear layers");

        let load_args = LoadArgs::new(path.to_path_buf())
            .with_key_remap("lin([0-9]+)\\.model\\.1\\.(.+)", "layers.$1.$2");
        let record = PyTorchFileRecorder::<FullPrecisionSettings>::default()
            .load(load_args, device)
            .map_err(|e| LossError::WeightLoading {
                reason: format!("{}: {e}", path.display()),
            })?;

        self.lin = self.lin.load_record(record);
        Ok(self)
    }

    /// Compute the LPIPS distance summed over layers and batch.
    ///
    /// Returns `None` when `perceptual_weight` is not positive.
    ///
    /// # Shapes
    ///
    /// - input: `[batch_size, 3, height, width]`
    /// - target: `[batch_size, 3, height, width]`
    /// - output: `[1]`
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
        target: Tensor<B, 4>,
    ) -> LossResult<Option<Tensor<B, 1>>>
    where
        E: FeatureExtractor<B>,
    {
        if self.perceptual_weight <= 0.0 {
            return Ok(None);
        }
        ensure_same_shape(input.dims(), target.dims())?;
        ensure_channels(input.dims(), 3)?;

        let (input, target) = if self.use_range_norm {
            (
                input.sub_scalar(0.5).mul_scalar(2.0),
                target.sub_scalar(0.5).mul_scalar(2.0),
            )
        } else {
            (input, target)
        };

        let mut input_features = self.extractor.extract(z_score(input));
        let mut target_features = self.extractor.extract(z_score(target.detach()));

        let mut total: Option<Tensor<B, 1>> = None;
        for ((layer, lin), alpha) in self
            .net
            .layer_names()
            .into_iter()
            .zip(&self.lin.layers)
            .zip(&self.alpha)
        {
            let x = normalize_activation(take_layer(&mut input_features, layer)?);
            let y = normalize_activation(take_layer(&mut target_features, layer)?);
            let diff = x - y;

            let distance = lin
                .forward(diff.clone() * diff)
                .mean_dim(2)
                .mean_dim(3)
                .sum()
                .mul_scalar(*alpha);

            total = Some(match total {
                Some(total) => total + distance,
                None => distance,
            });
        }

        Ok(total.map(|total| total.mul_scalar(self.perceptual_weight)))
    }
}

fn z_score<B: Backend>(images: Tensor<B, 4>) -> Tensor<B, 4> {
    let device = images.device();
    let dims = images.dims();
    let shift = Tensor::<B, 1>::from_floats(SHIFT, &device)
        .reshape([1, 3, 1, 1])
        .expand(dims);
    let scale = Tensor::<B, 1>::from_floats(SCALE, &device)
        .reshape([1, 3, 1, 1])
        .expand(dims);

    (images - shift) / scale
}

fn normalize_activation<B: Backend>(features: Tensor<B, 4>) -> Tensor<B, 4> {
    let norm = (features.clone() * features.clone())
        .sum_dim(1)
        .sqrt()
        .add_scalar(ACTIVATION_EPS);
    features / norm
}
