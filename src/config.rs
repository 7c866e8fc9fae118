use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::background::DEFAULT_DECAY;
use crate::error::{validate_decay, validate_threshold};
use crate::extract::{DEFAULT_MORPH_ITERATIONS, DEFAULT_THRESHOLD};

const DEFAULT_SOURCE_URL: &str = "stub://camera";
const DEFAULT_SOURCE_WIDTH: u32 = 320;
const DEFAULT_SOURCE_HEIGHT: u32 = 240;
const DEFAULT_SOURCE_FPS: u32 = 10;

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    decay: Option<f32>,
    threshold: Option<i64>,
    morphology: Option<MorphologyConfigFile>,
    source: Option<SourceConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct MorphologyConfigFile {
    erode_iterations: Option<u32>,
    dilate_iterations: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
    max_frames: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    pub decay: f32,
    pub threshold: u8,
    pub erode_iterations: u32,
    pub dilate_iterations: u32,
    pub source: SourceSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    /// `stub://<name>` for synthetic frames, otherwise a local directory of images.
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
    /// Stop after this many frames. Zero means no limit.
    pub max_frames: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            decay: DEFAULT_DECAY,
            threshold: DEFAULT_THRESHOLD,
            erode_iterations: DEFAULT_MORPH_ITERATIONS,
            dilate_iterations: DEFAULT_MORPH_ITERATIONS,
            source: SourceSettings::default(),
        }
    }
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_SOURCE_URL.to_string(),
            width: DEFAULT_SOURCE_WIDTH,
            height: DEFAULT_SOURCE_HEIGHT,
            target_fps: DEFAULT_SOURCE_FPS,
            max_frames: 0,
        }
    }
}

impl DetectorConfig {
    /// Load from `MOTION_CONFIG` (if set), then apply `MOTION_*` overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("MOTION_CONFIG")
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Load an optional config file, then apply `MOTION_*` overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => DetectorConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Set the threshold from an unchecked integer. Out-of-range values are rejected.
    pub fn set_threshold(&mut self, threshold: i64) -> Result<()> {
        self.threshold = validate_threshold(threshold)?;
        Ok(())
    }

    fn from_file(file: DetectorConfigFile) -> Result<Self> {
        let defaults = Self::default();
        let threshold = match file.threshold {
            Some(raw) => validate_threshold(raw)?,
            None => defaults.threshold,
        };
        let morphology = file.morphology.unwrap_or_default();
        let source = file.source.unwrap_or_default();
        let source_defaults = SourceSettings::default();
        Ok(Self {
            decay: file.decay.unwrap_or(defaults.decay),
            threshold,
            erode_iterations: morphology
                .erode_iterations
                .unwrap_or(defaults.erode_iterations),
            dilate_iterations: morphology
                .dilate_iterations
                .unwrap_or(defaults.dilate_iterations),
            source: SourceSettings {
                url: source.url.unwrap_or(source_defaults.url),
                width: source.width.unwrap_or(source_defaults.width),
                height: source.height.unwrap_or(source_defaults.height),
                target_fps: source.target_fps.unwrap_or(source_defaults.target_fps),
                max_frames: source.max_frames.unwrap_or(source_defaults.max_frames),
            },
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(decay) = std::env::var("MOTION_DECAY") {
            self.decay = decay
                .trim()
                .parse()
                .map_err(|_| anyhow!("MOTION_DECAY must be a number in (0, 1]"))?;
        }
        if let Ok(threshold) = std::env::var("MOTION_THRESHOLD") {
            let raw: i64 = threshold
                .trim()
                .parse()
                .map_err(|_| anyhow!("MOTION_THRESHOLD must be an integer in [0, 255]"))?;
            self.set_threshold(raw)?;
        }
        if let Ok(url) = std::env::var("MOTION_SOURCE_URL") {
            if !url.trim().is_empty() {
                self.source.url = url;
            }
        }
        if let Ok(max_frames) = std::env::var("MOTION_MAX_FRAMES") {
            self.source.max_frames = max_frames
                .trim()
                .parse()
                .map_err(|_| anyhow!("MOTION_MAX_FRAMES must be a non-negative integer"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        validate_decay(self.decay)?;
        if self.erode_iterations > u32::from(u8::MAX) || self.dilate_iterations > u32::from(u8::MAX)
        {
            return Err(anyhow!("morphology iterations must be at most 255"));
        }
        if self.source.url.trim().is_empty() {
            return Err(anyhow!("source url must not be empty"));
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source dimensions must be greater than zero"));
        }
        if self.source.target_fps == 0 {
            return Err(anyhow!("source target_fps must be >= 1"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<DetectorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
