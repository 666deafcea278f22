//! Block-matching disparity estimation for stereo pairs.
//!
//! Both views are unit-normalised per pixel across channels, then every
//! candidate horizontal shift of the right view is compared patch by patch
//! against the left view. The arg-min over the patch elements of the absolute
//! difference proposes a disparity, which replaces the stored value only where
//! the stored value falls outside the candidate's search window.

use std::ops::Range;

use burn::{
    config::Config,
    module::{Content, DisplaySettings, Module, ModuleDisplay},
    nn::{Unfold4d, Unfold4dConfig},
    tensor::{backend::Backend, Tensor},
};
use restoration_extra_ops::TensorExtraOps;

use crate::error::{ensure_channels, ensure_same_shape, invalid_configuration, LossResult};

/// Half-open interval `[lower, upper)` of horizontal shifts evaluated for an image width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchRange {
    /// First candidate shift.
    pub lower: isize,
    /// One past the last candidate shift.
    pub upper: isize,
}

impl SearchRange {
    /// Create a range from its bounds.
    pub const fn new(lower: isize, upper: isize) -> Self {
        Self { lower, upper }
    }

    /// Whether no candidate shift is evaluated.
    pub const fn is_empty(&self) -> bool {
        self.lower >= self.upper
    }

    /// Number of candidate shifts.
    pub const fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.upper.abs_diff(self.lower)
        }
    }

    /// The candidate shifts in ascending order.
    pub fn candidates(&self) -> Range<isize> {
        self.lower..self.upper
    }
}

/// Configuration for creating a [disparity estimator](DisparityEstimator).
#[derive(Config, Debug)]
pub struct DisparityEstimatorConfig {
    /// Width of the search window of every candidate. Default: 128
    #[config(default = 128)]
    pub num_disparities: usize,

    /// Side of the square matching patch, odd. Default: 21
    #[config(default = 21)]
    pub block_size: usize,
}

impl DisparityEstimatorConfig {
    /// Initialize a [disparity estimator](DisparityEstimator).
    pub fn init(&self) -> LossResult<DisparityEstimator> {
        if self.num_disparities == 0 {
            return Err(invalid_configuration("num_disparities must be positive"));
        }
        if self.block_size == 0 || self.block_size % 2 == 0 {
            return Err(invalid_configuration(format!(
                "block_size must be positive and odd, got {}",
                self.block_size
            )));
        }

        let padding = self.block_size / 2;
        let unfold = Unfold4dConfig::new([self.block_size, self.block_size])
            .with_padding([padding, padding])
            .init();

        Ok(DisparityEstimator {
            num_disparities: self.num_disparities,
            block_size: self.block_size,
            unfold,
        })
    }
}

/// Per-pixel horizontal disparity by block matching.
#[derive(Module, Clone, Debug)]
#[module(custom_display)]
pub struct DisparityEstimator {
    /// Width of the search window of every candidate.
    pub num_disparities: usize,
    /// Side of the square matching patch.
    pub block_size: usize,
    unfold: Unfold4d,
}

impl ModuleDisplay for DisparityEstimator {
    fn custom_settings(&self) -> Option<DisplaySettings> {
        DisplaySettings::new()
            .with_new_line_after_attribute(false)
            .optional()
    }

    fn custom_content(&self, content: Content) -> Option<Content> {
        content
            .add("num_disparities", &self.num_disparities)
            .add("block_size", &self.block_size)
            .optional()
    }
}

impl DisparityEstimator {
    /// Candidate shifts evaluated for images `width` pixels wide.
    pub fn search_range(&self, width: usize) -> SearchRange {
        let width = width as isize;
        let num_disparities = self.num_disparities as isize;
        let block_size = self.block_size as isize;
        let half = block_size / 2;

        let lower = (half - num_disparities).max(-width + half);
        let upper = (num_disparities * block_size - width - half).min(width - half - width + half);

        SearchRange::new(lower, upper)
    }

    /// Interval holding every value other than the initial zero that
    /// [`estimate`](Self::estimate) can produce for `width`.
    pub fn value_bounds(&self, width: usize) -> Range<isize> {
        let range = self.search_range(width);
        let patch_len = (3 * self.block_size * self.block_size) as isize;
        range.lower..range.upper - 1 + patch_len
    }

    /// Estimate the disparity of `left` relative to `right`.
    ///
    /// An empty search range yields an all-zero map.
    ///
    /// # Shapes
    ///
    /// - left: `[batch_size, 3, height, width]`
    /// - right: `[batch_size, 3, height, width]`
    /// - output: `[batch_size, height, width]`
    pub fn estimate<B: Backend>(
        &self,
        left: Tensor<B, 4>,
        right: Tensor<B, 4>,
    ) -> LossResult<Tensor<B, 3>> {
        ensure_same_shape(left.dims(), right.dims())?;
        ensure_channels(left.dims(), 3)?;

        let [batch, channels, height, width] = left.dims();
        let disparity = Tensor::<B, 4>::zeros([batch, 1, height, width], &left.device());

        let range = self.search_range(width);
        if range.is_empty() {
            tracing::debug!(
                lower = range.lower,
                upper = range.upper,
                width,
                num_disparities = self.num_disparities,
                block_size = self.block_size,
                "empty stereo search range, disparity stays zero"
            );
            return Ok(disparity.reshape([batch, height, width]));
        }
        tracing::trace!(
            candidates = range.len(),
            lower = range.lower,
            upper = range.upper,
            "block matching"
        );

        let patch_len = channels * self.block_size * self.block_size;
        let window = self.num_disparities as f64;
        let left_patches = self.unfold.forward(left.l2_normalize(1));
        let right = right.l2_normalize(1);

        let disparity = range.candidates().fold(disparity, |disparity, shift| {
            let right_patches = self.unfold.forward(right.clone().shift_columns(shift));
            let cost = (left_patches.clone() - right_patches)
                .abs()
                .reshape([batch, patch_len, height, width]);
            let candidate = cost.argmin(1).float().add_scalar(shift as f64);

            let lower = shift as f64;
            let keep = disparity
                .clone()
                .greater_equal_elem(lower)
                .bool_and(disparity.clone().lower_elem(lower + window));

            candidate.mask_where(keep, disparity)
        });

        Ok(disparity.reshape([batch, height, width]))
    }
}
