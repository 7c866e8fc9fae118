//! Running-average background estimate.
//!
//! The model keeps one `f32` sample per pixel and blends each new frame in
//! with an exponential moving average:
//!
//! `estimate = estimate * (1 - decay) + frame * decay`
//!
//! The first observed frame seeds the estimate directly. Memory and update
//! cost are O(1) per pixel regardless of session length.
//!
//! The average is lossy. Rounding error accumulates over very long sessions;
//! callers running for days can `reset()` and reseed periodically.

use crate::error::{validate_decay, MotionError, Result};
use crate::frame::{Dimensions, GrayFrame};

/// Default adaptation rate.
pub const DEFAULT_DECAY: f32 = 0.5;

#[derive(Debug, Clone)]
struct Estimate {
    samples: Vec<f32>,
    dimensions: Dimensions,
}

/// Exponentially decaying background estimate for a single stream.
///
/// Each camera stream owns its own model. The estimate is only reachable
/// through the accessors below.
#[derive(Debug, Clone)]
pub struct BackgroundModel {
    decay: f32,
    estimate: Option<Estimate>,
    frames_observed: u64,
}

impl BackgroundModel {
    /// Create an empty model. `decay` must lie in `(0, 1]`.
    pub fn new(decay: f32) -> Result<Self> {
        Ok(Self {
            decay: validate_decay(decay)?,
            estimate: None,
            frames_observed: 0,
        })
    }

    pub fn decay(&self) -> f32 {
        self.decay
    }

    pub fn is_initialized(&self) -> bool {
        self.estimate.is_some()
    }

    /// Dimensions fixed by the seed frame, if any.
    pub fn dimensions(&self) -> Option<Dimensions> {
        self.estimate.as_ref().map(|e| e.dimensions)
    }

    /// Frames folded into the estimate since creation or the last reset.
    pub fn frames_observed(&self) -> u64 {
        self.frames_observed
    }

    /// Read-only view of the floating-point estimate, row-major.
    pub fn estimate(&self) -> Option<&[f32]> {
        self.estimate.as_ref().map(|e| e.samples.as_slice())
    }

    /// Seed the estimate from the first frame, or blend `frame` into it.
    pub fn update(&mut self, frame: &GrayFrame) -> Result<()> {
        let Some(estimate) = self.estimate.as_mut() else {
            self.estimate = Some(Estimate {
                samples: frame.pixels().iter().map(|&p| f32::from(p)).collect(),
                dimensions: frame.dimensions(),
            });
            self.frames_observed = 1;
            log::info!("background model seeded at {}", frame.dimensions());
            return Ok(());
        };

        if estimate.dimensions != frame.dimensions() {
            return Err(MotionError::DimensionMismatch {
                expected: estimate.dimensions,
                actual: frame.dimensions(),
            });
        }

        let keep = 1.0 - self.decay;
        for (sample, &pixel) in estimate.samples.iter_mut().zip(frame.pixels()) {
            *sample = *sample * keep + f32::from(pixel) * self.decay;
        }
        self.frames_observed = self.frames_observed.saturating_add(1);
        Ok(())
    }

    /// Estimate converted to 8-bit, truncating toward zero.
    ///
    /// This is the representation frames are differenced against.
    pub fn snapshot(&self) -> Result<GrayFrame> {
        let estimate = self
            .estimate
            .as_ref()
            .ok_or(MotionError::ModelNotInitialized)?;
        GrayFrame::new(
            estimate.samples.iter().map(|&s| to_u8(s)).collect(),
            estimate.dimensions.width,
            estimate.dimensions.height,
        )
    }

    /// Drop the estimate. The next `update` seeds a fresh one.
    pub fn reset(&mut self) {
        if self.estimate.take().is_some() {
            log::info!(
                "background model reset after {} frames",
                self.frames_observed
            );
        }
        self.frames_observed = 0;
    }
}

impl Default for BackgroundModel {
    fn default() -> Self {
        Self {
            decay: DEFAULT_DECAY,
            estimate: None,
            frames_observed: 0,
        }
    }
}

/// Saturating float to 8-bit conversion that truncates the fraction.
pub(crate) fn to_u8(sample: f32) -> u8 {
    sample as u8
}
