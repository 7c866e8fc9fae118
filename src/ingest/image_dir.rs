//! Directory-of-images frame source.
//!
//! Frames are the image files of one local directory, decoded in file-name
//! order and converted to 8-bit luma. Subdirectories and files without a
//! supported extension are skipped.

use anyhow::{anyhow, Context, Result};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use super::{FrameSource, SourceStats};
use crate::frame::GrayFrame;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

pub struct ImageDirSource {
    dir: PathBuf,
    pending: VecDeque<PathBuf>,
    frame_count: u64,
    connected: bool,
    healthy: bool,
}

impl ImageDirSource {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            pending: VecDeque::new(),
            frame_count: 0,
            connected: false,
            healthy: false,
        }
    }

    /// Files still waiting to be decoded.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl FrameSource for ImageDirSource {
    fn connect(&mut self) -> Result<()> {
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("reading frame directory {}", self.dir.display()))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && has_image_extension(&path) {
                files.push(path);
            }
        }
        files.sort();
        log::info!(
            "ImageDirSource: connected to {} ({} frames)",
            self.dir.display(),
            files.len()
        );
        self.pending = files.into();
        self.connected = true;
        self.healthy = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<GrayFrame>> {
        if !self.connected {
            return Err(anyhow!(
                "image directory {} not connected",
                self.dir.display()
            ));
        }
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };
        let decoded = image::open(&path).with_context(|| format!("decoding {}", path.display()));
        let image = match decoded {
            Ok(image) => image,
            Err(e) => {
                self.healthy = false;
                return Err(e);
            }
        };
        let frame = GrayFrame::from_image(image.to_luma8())?;
        self.frame_count += 1;
        Ok(Some(frame))
    }

    fn is_healthy(&self) -> bool {
        self.healthy
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            url: self.dir.display().to_string(),
        }
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn decodes_frames_in_name_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        GrayImage::from_pixel(6, 4, Luma([200u8])).save(dir.path().join("frame_002.png"))?;
        GrayImage::from_pixel(6, 4, Luma([10u8])).save(dir.path().join("frame_001.png"))?;
        std::fs::write(dir.path().join("notes.txt"), b"not a frame")?;

        let mut source = ImageDirSource::new(dir.path().to_path_buf());
        source.connect()?;
        assert_eq!(source.remaining(), 2);

        let first = source.next_frame()?.expect("first frame");
        assert_eq!(first.get(0, 0), Some(10));
        let second = source.next_frame()?.expect("second frame");
        assert_eq!(second.get(5, 3), Some(200));
        assert!(source.next_frame()?.is_none());
        assert_eq!(source.stats().frames_captured, 2);
        Ok(())
    }

    #[test]
    fn missing_directory_fails_to_connect() {
        let mut source = ImageDirSource::new(PathBuf::from("/nonexistent/motion/frames"));
        assert!(source.connect().is_err());
    }

    #[test]
    fn corrupt_image_marks_source_unhealthy() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("broken.png"), b"definitely not png")?;
        let mut source = ImageDirSource::new(dir.path().to_path_buf());
        source.connect()?;
        assert!(source.next_frame().is_err());
        assert!(!source.is_healthy());
        Ok(())
    }
}
