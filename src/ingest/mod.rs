//! Frame sources for the capture loop.
//!
//! - `stub://<name>`: synthetic scene with a moving block (testing, demos)
//! - local directory: image files decoded in name order
//!
//! Sources hand out decoded grayscale frames one at a time. Network URLs are
//! rejected; streaming transport lives outside this crate.

pub mod image_dir;
pub mod synthetic;

use anyhow::{anyhow, Result};
use std::path::PathBuf;

use crate::config::SourceSettings;
use crate::frame::GrayFrame;

pub use image_dir::ImageDirSource;
pub use synthetic::{SyntheticConfig, SyntheticSource};

/// Statistics for a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub url: String,
}

/// A producer of grayscale frames.
pub trait FrameSource {
    /// Prepare the source. Must be called before `next_frame`.
    fn connect(&mut self) -> Result<()>;

    /// Next frame, or `None` once a finite source is exhausted.
    fn next_frame(&mut self) -> Result<Option<GrayFrame>>;

    fn is_healthy(&self) -> bool;

    fn stats(&self) -> SourceStats;
}

/// Pick a source backend for `settings.url`.
pub fn open_source(settings: &SourceSettings) -> Result<Box<dyn FrameSource>> {
    let url = settings.url.trim();
    if url.is_empty() {
        return Err(anyhow!("source url must not be empty"));
    }
    if url.starts_with("stub://") {
        let config = SyntheticConfig {
            url: url.to_string(),
            width: settings.width,
            height: settings.height,
            ..SyntheticConfig::default()
        };
        return Ok(Box::new(SyntheticSource::new(config)?));
    }
    if url.contains("://") {
        return Err(anyhow!(
            "only stub:// and local directory sources are supported (got {})",
            url
        ));
    }
    Ok(Box::new(ImageDirSource::new(PathBuf::from(url))))
}
