//! Error types for the restoration losses.

use thiserror::Error;

/// The error type for loss construction and evaluation.
#[derive(Error, Debug)]
pub enum LossError {
    /// A loss was configured with parameters it cannot work with.
    #[error("Invalid loss configuration: {reason}")]
    InvalidConfiguration {
        /// The reason why the configuration is invalid.
        reason: String,
    },

    /// Input tensors do not have the shapes the loss requires.
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// The expected tensor shape.
        expected: String,
        /// The actual tensor shape.
        actual: String,
    },

    /// A feature extractor did not produce a layer the loss reads.
    #[error("Feature layer `{layer}` is missing from the extractor output")]
    MissingFeatureLayer {
        /// Name of the missing layer.
        layer: String,
    },

    /// Pretrained weights could not be loaded.
    #[cfg(feature = "pretrained")]
    #[error("Failed to load weights: {reason}")]
    WeightLoading {
        /// The reason for the loading failure.
        reason: String,
    },
}

/// A specialized `Result` type for loss operations.
pub type LossResult<T> = Result<T, LossError>;

pub(crate) fn invalid_configuration(reason: impl Into<String>) -> LossError {
    LossError::InvalidConfiguration {
        reason: reason.into(),
    }
}

/// Fail unless `actual` equals `expected`.
pub(crate) fn ensure_same_shape<const D: usize>(
    expected: [usize; D],
    actual: [usize; D],
) -> LossResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(LossError::ShapeMismatch {
            expected: format!("{expected:?}"),
            actual: format!("{actual:?}"),
        })
    }
}

/// Fail unless dimension 1 of `dims` holds exactly `channels` channels.
pub(crate) fn ensure_channels<const D: usize>(dims: [usize; D], channels: usize) -> LossResult<()> {
    if dims[1] == channels {
        Ok(())
    } else {
        Err(LossError::ShapeMismatch {
            expected: format!("{channels} channels"),
            actual: format!("{dims:?}"),
        })
    }
}

/// Loss weights scale the reduced loss and must be finite and non-negative.
pub(crate) fn validate_loss_weight(loss: &str, loss_weight: f64) -> LossResult<()> {
    if loss_weight.is_finite() && loss_weight >= 0.0 {
        Ok(())
    } else {
        Err(invalid_configuration(format!(
            "loss weight for {loss} must be finite and non-negative, got {loss_weight}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_mismatch_message_names_both_shapes() {
        let err = ensure_same_shape([1, 3, 4, 4], [1, 3, 4, 5]).unwrap_err();

        assert_eq!(
            err.to_string(),
            "Shape mismatch: expected [1, 3, 4, 4], got [1, 3, 4, 5]"
        );
    }

    #[test]
    fn loss_weight_rejects_negative_and_nan() {
        assert!(validate_loss_weight("L1Loss", 0.0).is_ok());
        assert!(matches!(
            validate_loss_weight("L1Loss", -1.0),
            Err(LossError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            validate_loss_weight("L1Loss", f64::NAN),
            Err(LossError::InvalidConfiguration { .. })
        ));
    }
}
