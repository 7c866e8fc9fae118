//! motion_watch - run the motion detector over a frame source
//!
//! This binary:
//! 1. Loads detector settings (MOTION_CONFIG file, MOTION_* env, flags)
//! 2. Opens a frame source (stub:// synthetic scene or a local image directory)
//! 3. Detects each frame against the running background, then updates it
//! 4. Prints one JSON line per frame with motion

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use motion_sentry::{open_source, BoundingBox, DetectorConfig, MotionDetector, MotionError};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "MOTION_CONFIG")]
    config: Option<PathBuf>,
    /// Frame source: stub://<name> or a directory of images.
    #[arg(long)]
    source: Option<String>,
    /// Background adaptation rate in (0, 1].
    #[arg(long)]
    decay: Option<f32>,
    /// Foreground cutoff in [0, 255].
    #[arg(long)]
    threshold: Option<i64>,
    /// Stop after this many frames (0 = no limit).
    #[arg(long)]
    max_frames: Option<u64>,
    /// Pace frames to the configured target fps.
    #[arg(long, default_value_t = false)]
    realtime: bool,
}

#[derive(Serialize)]
struct MotionEvent {
    frame: u64,
    #[serde(flatten)]
    bbox: BoundingBox,
    contour_count: usize,
    foreground_pixels: usize,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = load_config(&args)?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))
            .context("installing Ctrl-C handler")?;
    }

    let mut source = open_source(&cfg.source)?;
    source.connect()?;

    let mut detector = MotionDetector::from_config(&cfg)?;
    log::info!("motion_watch running: {} source={}", detector, cfg.source.url);

    let frame_interval = Duration::from_secs_f64(1.0 / f64::from(cfg.source.target_fps));
    let mut last_health_log = Instant::now();
    let mut frame_index = 0u64;
    let mut rejected = 0u64;

    while running.load(Ordering::SeqCst) {
        if cfg.source.max_frames > 0 && frame_index >= cfg.source.max_frames {
            log::info!("reached max frames: {}", cfg.source.max_frames);
            break;
        }
        let started = Instant::now();

        let Some(frame) = source.next_frame()? else {
            log::info!("source exhausted");
            break;
        };

        match detector.process(&frame) {
            Ok(Some(detection)) => {
                let event = MotionEvent {
                    frame: frame_index,
                    bbox: detection.bbox,
                    contour_count: detection.contour_count,
                    foreground_pixels: detection.foreground_pixels,
                };
                println!("{}", serde_json::to_string(&event)?);
            }
            Ok(None) => {}
            Err(e @ MotionError::DimensionMismatch { .. }) => {
                rejected += 1;
                log::warn!("frame {} rejected: {}", frame_index, e);
            }
            Err(e) => return Err(e.into()),
        }
        frame_index += 1;

        if last_health_log.elapsed() >= Duration::from_secs(5) {
            let stats = source.stats();
            log::info!(
                "source health={} frames={} url={}",
                source.is_healthy(),
                stats.frames_captured,
                stats.url
            );
            last_health_log = Instant::now();
        }

        if args.realtime {
            if let Some(remaining) = frame_interval.checked_sub(started.elapsed()) {
                std::thread::sleep(remaining);
            }
        }
    }

    let stats = detector.stats();
    log::info!(
        "processed {} frames, {} with motion, {} rejected",
        stats.frames_processed,
        stats.motion_frames,
        rejected
    );
    Ok(())
}

fn load_config(args: &Args) -> Result<DetectorConfig> {
    let mut cfg = DetectorConfig::load_from(args.config.as_deref())?;
    if let Some(source) = &args.source {
        cfg.source.url = source.clone();
    }
    if let Some(decay) = args.decay {
        cfg.decay = decay;
    }
    if let Some(threshold) = args.threshold {
        cfg.set_threshold(threshold)?;
    }
    if let Some(max_frames) = args.max_frames {
        cfg.source.max_frames = max_frames;
    }
    cfg.validate()?;
    Ok(cfg)
}
