//! Synthetic frame source for `stub://` URLs.
//!
//! Renders a static horizontal gradient with a bright square that slides
//! across the frame. Frame 0 contains only the background so it can seed a
//! model. Optional speckle noise flips isolated pixels to random values.

use anyhow::{anyhow, Result};
use rand::Rng;

use super::{FrameSource, SourceStats};
use crate::frame::GrayFrame;

const BLOCK_INTENSITY: u8 = 230;

/// Configuration for a synthetic source.
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub url: String,
    pub width: u32,
    pub height: u32,
    /// Side of the moving square, in pixels.
    pub block_size: u32,
    /// Horizontal pixels moved per frame.
    pub speed: u32,
    /// Fraction of pixels replaced with random noise in each frame.
    pub noise_ratio: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            url: "stub://camera".to_string(),
            width: 320,
            height: 240,
            block_size: 24,
            speed: 4,
            noise_ratio: 0.0005,
        }
    }
}

pub struct SyntheticSource {
    config: SyntheticConfig,
    frame_count: u64,
    connected: bool,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(anyhow!("synthetic source dimensions must be non-zero"));
        }
        if config.block_size == 0
            || config.block_size > config.width
            || config.block_size > config.height
        {
            return Err(anyhow!(
                "block size {} does not fit a {}x{} frame",
                config.block_size,
                config.width,
                config.height
            ));
        }
        if !(0.0..=1.0).contains(&config.noise_ratio) {
            return Err(anyhow!("noise ratio must lie in [0, 1]"));
        }
        Ok(Self {
            config,
            frame_count: 0,
            connected: false,
        })
    }

    /// Top-left corner of the moving block in frame `index`, if any.
    pub fn block_origin(&self, index: u64) -> Option<(u32, u32)> {
        if index == 0 {
            return None;
        }
        let travel = u64::from(self.config.width - self.config.block_size) + 1;
        let x = (index * u64::from(self.config.speed)) % travel;
        let y = (self.config.height - self.config.block_size) / 2;
        Some((x as u32, y))
    }

    fn background(&self, x: u32) -> u8 {
        (40 + x * 60 / self.config.width) as u8
    }

    fn render(&self, index: u64) -> Result<GrayFrame> {
        let block = self.block_origin(index);
        let size = self.config.block_size;
        let noise_ratio = self.config.noise_ratio;
        let mut rng = rand::thread_rng();
        let frame = GrayFrame::from_fn(self.config.width, self.config.height, |x, y| {
            if noise_ratio > 0.0 && rng.gen_bool(noise_ratio) {
                return rng.gen();
            }
            match block {
                Some((bx, by)) if (bx..bx + size).contains(&x) && (by..by + size).contains(&y) => {
                    BLOCK_INTENSITY
                }
                _ => self.background(x),
            }
        })?;
        Ok(frame)
    }
}

impl FrameSource for SyntheticSource {
    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        log::info!("SyntheticSource: connected to {}", self.config.url);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<GrayFrame>> {
        if !self.connected {
            return Err(anyhow!("synthetic source {} not connected", self.config.url));
        }
        let frame = self.render(self.frame_count)?;
        self.frame_count += 1;
        Ok(Some(frame))
    }

    fn is_healthy(&self) -> bool {
        self.connected
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            url: self.config.url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet(width: u32, height: u32) -> SyntheticSource {
        let mut source = SyntheticSource::new(SyntheticConfig {
            width,
            height,
            block_size: 10,
            speed: 5,
            noise_ratio: 0.0,
            ..SyntheticConfig::default()
        })
        .unwrap();
        source.connect().unwrap();
        source
    }

    #[test]
    fn first_frame_is_background_only() {
        let mut source = quiet(100, 50);
        let frame = source.next_frame().unwrap().unwrap();
        assert!(frame.pixels().iter().all(|&p| p < BLOCK_INTENSITY));
    }

    #[test]
    fn block_moves_between_frames() {
        let mut source = quiet(100, 50);
        source.next_frame().unwrap();
        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!(source.block_origin(1), Some((5, 20)));
        assert_eq!(frame.get(5, 20), Some(BLOCK_INTENSITY));
        assert_eq!(frame.get(14, 29), Some(BLOCK_INTENSITY));
        assert_ne!(frame.get(15, 20), Some(BLOCK_INTENSITY));
        assert_eq!(source.stats().frames_captured, 2);
    }

    #[test]
    fn requires_connect() {
        let mut source = SyntheticSource::new(SyntheticConfig::default()).unwrap();
        assert!(!source.is_healthy());
        assert!(source.next_frame().is_err());
    }

    #[test]
    fn rejects_oversized_block() {
        let config = SyntheticConfig {
            width: 8,
            height: 8,
            block_size: 9,
            ..SyntheticConfig::default()
        };
        assert!(SyntheticSource::new(config).is_err());
    }
}
