use thiserror::Error;

use crate::frame::Dimensions;

/// Failures surfaced by the background model and the motion extractor.
///
/// "No motion" is not an error. Extraction reports it as `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MotionError {
    /// Extraction was attempted before any background frame was observed.
    #[error("background model has not observed a frame yet")]
    ModelNotInitialized,

    /// A frame disagrees with the dimensions the model was seeded with.
    #[error("frame dimensions {actual} do not match model dimensions {expected}")]
    DimensionMismatch {
        expected: Dimensions,
        actual: Dimensions,
    },

    /// A configuration value is out of range. Values are never clamped.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Pixel buffer length does not match width x height, or a dimension is zero.
    #[error("invalid frame buffer: expected {expected} bytes, got {actual}")]
    InvalidFrame { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, MotionError>;

/// Reject a threshold outside the 8-bit intensity range.
pub(crate) fn validate_threshold(threshold: i64) -> Result<u8> {
    u8::try_from(threshold).map_err(|_| MotionError::InvalidParameter {
        name: "threshold",
        reason: format!("{} is outside [0, 255]", threshold),
    })
}

/// Reject a decay outside `(0, 1]`. NaN is rejected as well.
pub(crate) fn validate_decay(decay: f32) -> Result<f32> {
    if decay > 0.0 && decay <= 1.0 {
        Ok(decay)
    } else {
        Err(MotionError::InvalidParameter {
            name: "decay",
            reason: format!("{} is outside (0, 1]", decay),
        })
    }
}
