//! Foreground extraction against a background estimate.
//!
//! Pipeline per frame:
//! 1. Absolute difference between the 8-bit background and the frame
//! 2. Binary threshold (strictly greater than `threshold` becomes 255)
//! 3. Erosion then dilation with a 3x3 square neighborhood
//! 4. External contours of the cleaned mask
//! 5. One bounding box spanning every contour
//!
//! An empty contour set is reported as `Ok(None)`.

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate, erode};
use serde::Serialize;

use crate::background::{to_u8, BackgroundModel};
use crate::error::{validate_threshold, MotionError, Result};
use crate::frame::{Dimensions, GrayFrame};

pub const DEFAULT_THRESHOLD: u8 = 25;
pub const DEFAULT_MORPH_ITERATIONS: u32 = 2;

const FOREGROUND: u8 = 255;
const BACKGROUND: u8 = 0;

// ----------------------------------------------------------------------------
// Result types
// ----------------------------------------------------------------------------

/// Axis-aligned rectangle in pixel coordinates.
///
/// `x_min`/`y_min` are inclusive, `x_max`/`y_max` exclusive, so a single
/// pixel at `(3, 4)` is `{ x: 3..4, y: 4..5 }`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x_min: u32,
    pub x_max: u32,
    pub y_min: u32,
    pub y_max: u32,
}

impl BoundingBox {
    /// Zero when `x_max <= x_min`.
    pub fn width(&self) -> u32 {
        self.x_max.saturating_sub(self.x_min)
    }

    pub fn height(&self) -> u32 {
        self.y_max.saturating_sub(self.y_min)
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.x_min..self.x_max).contains(&x) && (self.y_min..self.y_max).contains(&y)
    }

    /// Smallest box covering both `self` and `other`.
    fn union(self, other: BoundingBox) -> BoundingBox {
        BoundingBox {
            x_min: self.x_min.min(other.x_min),
            x_max: self.x_max.max(other.x_max),
            y_min: self.y_min.min(other.y_min),
            y_max: self.y_max.max(other.y_max),
        }
    }
}

/// Binary mask with samples of 0 or 255, same size as the source frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForegroundMask {
    image: GrayImage,
}

impl ForegroundMask {
    pub fn dimensions(&self) -> Dimensions {
        let (width, height) = self.image.dimensions();
        Dimensions::new(width, height)
    }

    /// True when `(x, y)` is inside the mask and labeled foreground.
    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.image
            .get_pixel_checked(x, y)
            .is_some_and(|p| p.0[0] == FOREGROUND)
    }

    pub fn foreground_pixels(&self) -> usize {
        self.image.pixels().filter(|p| p.0[0] == FOREGROUND).count()
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_image(self) -> GrayImage {
        self.image
    }
}

/// Motion found in one frame.
#[derive(Clone, Debug)]
pub struct Detection {
    /// Mask after morphological cleanup.
    pub mask: ForegroundMask,
    /// Box spanning all external contours.
    pub bbox: BoundingBox,
    pub contour_count: usize,
    pub foreground_pixels: usize,
}

// ----------------------------------------------------------------------------
// MotionExtractor
// ----------------------------------------------------------------------------

/// Computes foreground masks and bounding boxes against a `BackgroundModel`.
///
/// The extractor never mutates the model. Whether and how often the caller
/// updates the model between frames is up to the capture loop.
#[derive(Clone, Debug)]
pub struct MotionExtractor {
    threshold: u8,
    erode_iterations: u8,
    dilate_iterations: u8,
}

impl MotionExtractor {
    /// `threshold` must lie in `[0, 255]`, iteration counts in `[0, 255]`.
    pub fn new(threshold: i64, erode_iterations: u32, dilate_iterations: u32) -> Result<Self> {
        Ok(Self {
            threshold: validate_threshold(threshold)?,
            erode_iterations: validate_iterations("erode_iterations", erode_iterations)?,
            dilate_iterations: validate_iterations("dilate_iterations", dilate_iterations)?,
        })
    }

    /// Extractor with default morphology and the given threshold.
    pub fn with_threshold(threshold: i64) -> Result<Self> {
        Self::new(
            threshold,
            DEFAULT_MORPH_ITERATIONS,
            DEFAULT_MORPH_ITERATIONS,
        )
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn erode_iterations(&self) -> u32 {
        u32::from(self.erode_iterations)
    }

    pub fn dilate_iterations(&self) -> u32 {
        u32::from(self.dilate_iterations)
    }

    /// Run the extraction pipeline for `frame`.
    ///
    /// Fails with `ModelNotInitialized` before the model has been seeded and
    /// with `DimensionMismatch` when the frame size differs from the model's.
    pub fn compute(
        &self,
        frame: &GrayFrame,
        background: &BackgroundModel,
    ) -> Result<Option<Detection>> {
        let expected = background
            .dimensions()
            .ok_or(MotionError::ModelNotInitialized)?;
        if expected != frame.dimensions() {
            return Err(MotionError::DimensionMismatch {
                expected,
                actual: frame.dimensions(),
            });
        }
        let estimate = background
            .estimate()
            .ok_or(MotionError::ModelNotInitialized)?;

        let binary = self.threshold_difference(frame, estimate);
        let cleaned = self.clean(&binary);

        let contours = external_contours(&cleaned);
        let Some(bbox) = aggregate_bounding_box(&contours) else {
            log::debug!("no contours above threshold {}", self.threshold);
            return Ok(None);
        };

        let mask = ForegroundMask { image: cleaned };
        let foreground_pixels = mask.foreground_pixels();
        log::debug!(
            "{} contours, {} foreground pixels, box x={}..{} y={}..{}",
            contours.len(),
            foreground_pixels,
            bbox.x_min,
            bbox.x_max,
            bbox.y_min,
            bbox.y_max
        );

        Ok(Some(Detection {
            mask,
            bbox,
            contour_count: contours.len(),
            foreground_pixels,
        }))
    }

    /// Steps 1 and 2: difference against the truncated background, then binarize.
    fn threshold_difference(&self, frame: &GrayFrame, estimate: &[f32]) -> GrayImage {
        let width = frame.width() as usize;
        let pixels = frame.pixels();
        GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
            let i = y as usize * width + x as usize;
            if to_u8(estimate[i]).abs_diff(pixels[i]) > self.threshold {
                Luma([FOREGROUND])
            } else {
                Luma([BACKGROUND])
            }
        })
    }

    /// Step 3: `k` iterations with a 3x3 square equal one pass at chessboard distance `k`.
    fn clean(&self, binary: &GrayImage) -> GrayImage {
        let eroded = if self.erode_iterations > 0 {
            erode(binary, Norm::LInf, self.erode_iterations)
        } else {
            binary.clone()
        };
        if self.dilate_iterations > 0 {
            dilate(&eroded, Norm::LInf, self.dilate_iterations)
        } else {
            eroded
        }
    }
}

impl Default for MotionExtractor {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            erode_iterations: DEFAULT_MORPH_ITERATIONS as u8,
            dilate_iterations: DEFAULT_MORPH_ITERATIONS as u8,
        }
    }
}

/// Extract motion from `frame` with default morphology.
///
/// `threshold` outside `[0, 255]` fails with `InvalidParameter`.
pub fn compute(
    frame: &GrayFrame,
    background: &BackgroundModel,
    threshold: i64,
) -> Result<Option<Detection>> {
    MotionExtractor::with_threshold(threshold)?.compute(frame, background)
}

fn validate_iterations(name: &'static str, iterations: u32) -> Result<u8> {
    u8::try_from(iterations).map_err(|_| MotionError::InvalidParameter {
        name,
        reason: format!("{} exceeds 255", iterations),
    })
}

/// Step 4: outermost borders only. Holes and borders nested inside holes are dropped.
///
/// Border following needs a background frame around the mask, otherwise regions
/// touching the left edge come back as holes and a full mask yields nothing. The
/// search runs on a copy padded by one background pixel and the points are
/// shifted back into mask coordinates.
fn external_contours(mask: &GrayImage) -> Vec<Contour<i32>> {
    find_contours::<i32>(&pad_with_background(mask))
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .map(|mut c| {
            for p in &mut c.points {
                p.x -= 1;
                p.y -= 1;
            }
            c
        })
        .collect()
}

fn pad_with_background(mask: &GrayImage) -> GrayImage {
    let (width, height) = mask.dimensions();
    GrayImage::from_fn(width + 2, height + 2, |x, y| {
        if x == 0 || y == 0 || x > width || y > height {
            Luma([BACKGROUND])
        } else {
            *mask.get_pixel(x - 1, y - 1)
        }
    })
}

/// Minimal upright rectangle around one contour's points.
fn contour_bounds(contour: &Contour<i32>) -> Option<BoundingBox> {
    let first = contour.points.first()?;
    let (mut x_min, mut x_max) = (first.x, first.x);
    let (mut y_min, mut y_max) = (first.y, first.y);
    for p in &contour.points[1..] {
        x_min = x_min.min(p.x);
        x_max = x_max.max(p.x);
        y_min = y_min.min(p.y);
        y_max = y_max.max(p.y);
    }
    Some(BoundingBox {
        x_min: x_min.max(0) as u32,
        x_max: (x_max + 1).max(0) as u32,
        y_min: y_min.max(0) as u32,
        y_max: (y_max + 1).max(0) as u32,
    })
}

/// Step 5: fold every contour rectangle into one.
fn aggregate_bounding_box(contours: &[Contour<i32>]) -> Option<BoundingBox> {
    contours
        .iter()
        .filter_map(contour_bounds)
        .reduce(BoundingBox::union)
}
