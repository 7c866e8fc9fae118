//! Grayscale frame container.
//!
//! - `GrayFrame`: one decoded single-channel frame, 8-bit samples, row-major.
//! - `Dimensions`: width x height pair used to check frames against the model.
//!
//! Frames are handed to the detector for the duration of one call and are
//! never retained by it. Decoding and color conversion happen upstream.

use image::GrayImage;
use serde::Serialize;
use std::fmt;

use crate::error::{MotionError, Result};

/// Width and height of a pixel grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of samples in a grid of these dimensions.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// ----------------------------------------------------------------------------
// GrayFrame
// ----------------------------------------------------------------------------

/// Single-channel 8-bit frame. Immutable once constructed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayFrame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl GrayFrame {
    /// Wrap a row-major sample buffer. The length must equal `width * height`.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = width
            .checked_mul(height)
            .map(|count| count as usize)
            .unwrap_or(usize::MAX);
        if width == 0 || height == 0 || data.len() != expected {
            return Err(MotionError::InvalidFrame {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Frame with every sample set to `value`.
    pub fn filled(width: u32, height: u32, value: u8) -> Result<Self> {
        Self::from_fn(width, height, |_, _| value)
    }

    /// Build a frame by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> u8) -> Result<Self> {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self::new(data, width, height)
    }

    pub fn from_image(image: GrayImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    /// Row-major samples.
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Sample at `(x, y)`, or `None` outside the frame.
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}
