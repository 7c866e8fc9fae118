//! Motion Sentry
//!
//! Background-subtraction motion detection for single-channel camera frames.
//!
//! # Architecture
//!
//! Each frame flows through one stateful detector per stream:
//!
//! 1. **Background model**: a floating-point running average, seeded by the
//!    first frame and blended with an exponential decay afterwards.
//! 2. **Extraction**: absolute difference against the background, binary
//!    threshold, erosion then dilation, external contours.
//! 3. **Aggregation**: one bounding box spanning every contour, or no motion.
//!
//! # Module Structure
//!
//! - `frame`: `GrayFrame` and `Dimensions`
//! - `background`: `BackgroundModel`
//! - `extract`: `MotionExtractor`, `Detection`, `BoundingBox`, `ForegroundMask`
//! - `detector`: `MotionDetector`, the combined per-stream object
//! - `config`: file and environment configuration
//! - `ingest`: frame sources for the capture loop (synthetic, image directory)

pub mod background;
pub mod config;
pub mod detector;
pub mod error;
pub mod extract;
pub mod frame;
pub mod ingest;

pub use background::{BackgroundModel, DEFAULT_DECAY};
pub use config::{DetectorConfig, SourceSettings};
pub use detector::{DetectorStats, MotionDetector};
pub use error::{MotionError, Result};
pub use extract::{
    compute, BoundingBox, Detection, ForegroundMask, MotionExtractor, DEFAULT_MORPH_ITERATIONS,
    DEFAULT_THRESHOLD,
};
pub use frame::{Dimensions, GrayFrame};
pub use ingest::{open_source, FrameSource, ImageDirSource, SourceStats, SyntheticSource};
