use std::io::Write;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use motion_sentry::config::DetectorConfig;
use motion_sentry::MotionDetector;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "MOTION_CONFIG",
        "MOTION_DECAY",
        "MOTION_THRESHOLD",
        "MOTION_SOURCE_URL",
        "MOTION_MAX_FRAMES",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_json_config_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "decay": 0.2,
        "threshold": 40,
        "morphology": { "erode_iterations": 1, "dilate_iterations": 3 },
        "source": {
            "url": "stub://driveway",
            "width": 640,
            "height": 360,
            "target_fps": 15,
            "max_frames": 100
        }
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("MOTION_CONFIG", file.path());
    std::env::set_var("MOTION_THRESHOLD", "30");
    std::env::set_var("MOTION_MAX_FRAMES", "12");

    let cfg = DetectorConfig::load().expect("load config");

    assert_eq!(cfg.decay, 0.2);
    assert_eq!(cfg.threshold, 30);
    assert_eq!(cfg.erode_iterations, 1);
    assert_eq!(cfg.dilate_iterations, 3);
    assert_eq!(cfg.source.url, "stub://driveway");
    assert_eq!(cfg.source.width, 640);
    assert_eq!(cfg.source.height, 360);
    assert_eq!(cfg.source.target_fps, 15);
    assert_eq!(cfg.source.max_frames, 12);

    let detector = MotionDetector::from_config(&cfg).expect("detector");
    assert_eq!(detector.extractor().threshold(), 30);
    assert_eq!(detector.extractor().dilate_iterations(), 3);

    clear_env();
}

#[test]
fn loads_toml_config_by_extension() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
decay = 0.75

[source]
url = "/var/lib/motion/frames"
"#;
    file.write_all(toml.as_bytes()).expect("write config");

    let cfg = DetectorConfig::load_from(Some(file.path())).expect("load config");
    assert_eq!(cfg.decay, 0.75);
    assert_eq!(cfg.threshold, 25);
    assert_eq!(cfg.source.url, "/var/lib/motion/frames");
    assert_eq!(cfg.source.width, 320);

    clear_env();
}

#[test]
fn defaults_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = DetectorConfig::load().expect("load config");
    assert_eq!(cfg, DetectorConfig::default());
}

#[test]
fn rejects_out_of_range_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("MOTION_THRESHOLD", "256");
    assert!(DetectorConfig::load().is_err());
    clear_env();

    std::env::set_var("MOTION_DECAY", "0");
    assert!(DetectorConfig::load().is_err());
    clear_env();

    std::env::set_var("MOTION_DECAY", "fast");
    assert!(DetectorConfig::load().is_err());
    clear_env();
}

#[test]
fn reports_unreadable_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("MOTION_CONFIG", "/nonexistent/motion.json");
    let err = DetectorConfig::load().unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));

    clear_env();
}
