//! Stateful detector for one camera stream.
//!
//! `MotionDetector` pairs a `BackgroundModel` with a `MotionExtractor`.
//! `update` and `detect` can be driven independently, or `process` can run
//! both once per frame: detect against the current background, then fold the
//! frame in.

use std::fmt;

use crate::background::BackgroundModel;
use crate::config::DetectorConfig;
use crate::error::Result;
use crate::extract::{Detection, MotionExtractor};
use crate::frame::GrayFrame;

/// Counters for frames passed through `MotionDetector::process`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DetectorStats {
    pub frames_processed: u64,
    pub motion_frames: u64,
}

pub struct MotionDetector {
    background: BackgroundModel,
    extractor: MotionExtractor,
    stats: DetectorStats,
}

impl MotionDetector {
    pub fn new(decay: f32, extractor: MotionExtractor) -> Result<Self> {
        Ok(Self {
            background: BackgroundModel::new(decay)?,
            extractor,
            stats: DetectorStats::default(),
        })
    }

    pub fn from_config(config: &DetectorConfig) -> Result<Self> {
        let extractor = MotionExtractor::new(
            i64::from(config.threshold),
            config.erode_iterations,
            config.dilate_iterations,
        )?;
        Self::new(config.decay, extractor)
    }

    pub fn background(&self) -> &BackgroundModel {
        &self.background
    }

    pub fn extractor(&self) -> &MotionExtractor {
        &self.extractor
    }

    pub fn stats(&self) -> DetectorStats {
        self.stats
    }

    /// Fold `frame` into the background estimate.
    pub fn update(&mut self, frame: &GrayFrame) -> Result<()> {
        self.background.update(frame)
    }

    /// Extract motion with the configured threshold. Does not update the model.
    pub fn detect(&self, frame: &GrayFrame) -> Result<Option<Detection>> {
        self.extractor.compute(frame, &self.background)
    }

    /// Extract motion with a one-off threshold in `[0, 255]`.
    pub fn detect_with_threshold(
        &self,
        frame: &GrayFrame,
        threshold: i64,
    ) -> Result<Option<Detection>> {
        MotionExtractor::new(
            threshold,
            self.extractor.erode_iterations(),
            self.extractor.dilate_iterations(),
        )?
        .compute(frame, &self.background)
    }

    /// Detect against the current background, then update it with `frame`.
    ///
    /// The first frame of a session only seeds the model and yields `Ok(None)`.
    /// A frame that fails detection is not folded into the model.
    pub fn process(&mut self, frame: &GrayFrame) -> Result<Option<Detection>> {
        if !self.background.is_initialized() {
            self.background.update(frame)?;
            self.stats.frames_processed += 1;
            return Ok(None);
        }

        let detection = self.detect(frame)?;
        self.background.update(frame)?;

        self.stats.frames_processed += 1;
        if detection.is_some() {
            self.stats.motion_frames += 1;
        }
        Ok(detection)
    }

    /// Forget the background and counters, for session restarts.
    pub fn reset(&mut self) {
        self.background.reset();
        self.stats = DetectorStats::default();
    }
}

impl Default for MotionDetector {
    fn default() -> Self {
        Self {
            background: BackgroundModel::default(),
            extractor: MotionExtractor::default(),
            stats: DetectorStats::default(),
        }
    }
}

impl fmt::Display for MotionDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MotionDetector(decay={}, threshold={})",
            self.background.decay(),
            self.extractor.threshold()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MotionError;

    fn block_frame(x0: u32, y0: u32) -> GrayFrame {
        GrayFrame::from_fn(64, 48, |x, y| {
            if (x0..x0 + 8).contains(&x) && (y0..y0 + 8).contains(&y) {
                220
            } else {
                30
            }
        })
        .unwrap()
    }

    #[test]
    fn first_process_seeds_only() {
        let mut detector = MotionDetector::default();
        let frame = block_frame(10, 10);
        assert!(detector.process(&frame).unwrap().is_none());
        assert!(detector.background().is_initialized());
        assert_eq!(
            detector.stats(),
            DetectorStats {
                frames_processed: 1,
                motion_frames: 0
            }
        );
    }

    #[test]
    fn process_detects_then_adapts() {
        let mut detector = MotionDetector::new(1.0, MotionExtractor::default()).unwrap();
        detector.process(&GrayFrame::filled(64, 48, 30).unwrap()).unwrap();

        let moved = block_frame(20, 16);
        let detection = detector.process(&moved).unwrap().expect("motion");
        assert_eq!(detection.bbox.x_min, 20);
        assert_eq!(detection.bbox.y_min, 16);

        // decay 1.0 adopts the last frame, so the same frame is now background.
        assert!(detector.process(&moved).unwrap().is_none());
        assert_eq!(detector.stats().motion_frames, 1);
        assert_eq!(detector.stats().frames_processed, 3);
    }

    #[test]
    fn detect_before_seed_fails() {
        let detector = MotionDetector::default();
        assert_eq!(
            detector.detect(&block_frame(0, 0)).unwrap_err(),
            MotionError::ModelNotInitialized
        );
    }

    #[test]
    fn mismatched_frame_is_not_folded_in() {
        let mut detector = MotionDetector::default();
        detector.process(&block_frame(0, 0)).unwrap();
        let other = GrayFrame::filled(32, 32, 0).unwrap();
        assert!(matches!(
            detector.process(&other),
            Err(MotionError::DimensionMismatch { .. })
        ));
        assert_eq!(detector.background().frames_observed(), 1);
        assert_eq!(detector.stats().frames_processed, 1);
    }

    #[test]
    fn one_off_threshold_keeps_morphology() {
        let mut detector = MotionDetector::default();
        detector.update(&GrayFrame::filled(64, 48, 30).unwrap()).unwrap();
        let frame = block_frame(5, 5);
        assert!(detector.detect_with_threshold(&frame, 189).unwrap().is_some());
        assert!(detector.detect_with_threshold(&frame, 190).unwrap().is_none());
        assert!(detector.detect_with_threshold(&frame, 1000).is_err());
    }

    #[test]
    fn reset_clears_session() {
        let mut detector = MotionDetector::default();
        detector.process(&block_frame(0, 0)).unwrap();
        detector.reset();
        assert!(!detector.background().is_initialized());
        assert_eq!(detector.stats(), DetectorStats::default());
    }

    #[test]
    fn display_lists_parameters() {
        let detector = MotionDetector::default();
        assert_eq!(
            detector.to_string(),
            "MotionDetector(decay=0.5, threshold=25)"
        );
    }
}
