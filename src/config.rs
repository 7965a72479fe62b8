use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::alarm::{AlarmClassSet, DebouncePolicy};
use crate::audio::{OverlapPolicy, DEFAULT_PLAYER_COMMAND};
use crate::ingest::SourceConfig;
use crate::region::{AbsoluteRegion, RatioRegion, RegionSpec};

const DEFAULT_MODEL_PATH: &str = "resources/models/best.onnx";
const DEFAULT_CONF_THRESHOLD: f32 = 0.4;
const DEFAULT_FRAME_SKIP: u32 = 2;
const DEFAULT_IMGSZ: u32 = 640;
const DEFAULT_ROI_THRESHOLD: f32 = 0.5;
const DEFAULT_ALARM_CLASSES: &[u32] = &[0, 1];
const DEFAULT_CLASS_NAMES: &[&str] = &["hand", "spaghetti", "background"];
const DEFAULT_SOUND_PATH: &str = "resources/media/audio.wav";
const DEFAULT_VOLUME: f32 = 1.0;
const DEFAULT_COOLDOWN_SECS: f64 = 1.0;
const DEFAULT_QUEUE_DEPTH: usize = 4;
const DEFAULT_STATUS_INTERVAL_MS: u64 = 500;

/// Print-area region measured on the reference 1920x1080 camera.
const DEFAULT_REGION_PX: (f64, f64, f64, f64) = (364.0, 385.0, 957.0, 586.0);
const REFERENCE_SIZE: (f64, f64) = (1920.0, 1080.0);

/// YOLO input sizes are multiples of the network stride.
const IMGSZ_STRIDE: u32 = 32;

#[derive(Debug, Deserialize, Default)]
struct SentinelConfigFile {
    model_path: Option<String>,
    conf_threshold: Option<f32>,
    frame_skip: Option<u32>,
    imgsz: Option<u32>,
    alarm_region: Option<AbsoluteRegion>,
    alarm_region_ratio: Option<RatioRegion>,
    alarm_region_enabled: Option<bool>,
    roi_crop: Option<bool>,
    roi_threshold: Option<f32>,
    alarm_classes: Option<Vec<u32>>,
    class_names: Option<Vec<String>>,
    alarm_sound_path: Option<PathBuf>,
    alarm_volume: Option<f32>,
    alarm_cooldown: Option<f64>,
    alarm_edge_triggered: Option<bool>,
    alarm_overlap: Option<OverlapPolicy>,
    alarm_queue_depth: Option<usize>,
    player_command: Option<Vec<String>>,
    source: Option<SourceConfigFile>,
    status_interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct SentinelConfig {
    pub detector: DetectorSettings,
    pub region: RegionSettings,
    pub alarm: AlarmSettings,
    pub source: SourceConfig,
    pub status_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub model_path: String,
    pub conf_threshold: f32,
    pub imgsz: u32,
    pub frame_skip: u32,
}

#[derive(Debug, Clone)]
pub struct RegionSettings {
    pub spec: RegionSpec,
    /// Gate detections on the region (and crop to it when `crop` is set).
    pub enabled: bool,
    /// Send only the region to the detector. Ignored when `enabled` is false.
    pub crop: bool,
    pub threshold: f32,
}

#[derive(Debug, Clone)]
pub struct AlarmSettings {
    pub classes: AlarmClassSet,
    pub class_names: Vec<String>,
    pub sound_path: PathBuf,
    /// Passed to the player through the `{volume}` placeholder of
    /// `player_command`. The default command has none.
    pub volume: f32,
    pub cooldown: Duration,
    pub edge_triggered: bool,
    pub overlap: OverlapPolicy,
    pub queue_depth: usize,
    pub player_command: Vec<String>,
}

impl AlarmSettings {
    pub fn debounce(&self) -> DebouncePolicy {
        DebouncePolicy {
            cooldown: self.cooldown,
            edge_triggered: self.edge_triggered,
        }
    }
}

impl Default for SentinelConfig {
    fn default() -> Self {
        let (x, y, w, h) = DEFAULT_REGION_PX;
        let (ref_w, ref_h) = REFERENCE_SIZE;
        Self {
            detector: DetectorSettings {
                model_path: DEFAULT_MODEL_PATH.to_string(),
                conf_threshold: DEFAULT_CONF_THRESHOLD,
                imgsz: DEFAULT_IMGSZ,
                frame_skip: DEFAULT_FRAME_SKIP,
            },
            region: RegionSettings {
                spec: RegionSpec::Ratio(RatioRegion {
                    x: x / ref_w,
                    y: y / ref_h,
                    w: w / ref_w,
                    h: h / ref_h,
                }),
                enabled: true,
                crop: true,
                threshold: DEFAULT_ROI_THRESHOLD,
            },
            alarm: AlarmSettings {
                classes: AlarmClassSet::new(DEFAULT_ALARM_CLASSES.iter().copied()),
                class_names: DEFAULT_CLASS_NAMES.iter().map(|s| s.to_string()).collect(),
                sound_path: PathBuf::from(DEFAULT_SOUND_PATH),
                volume: DEFAULT_VOLUME,
                cooldown: Duration::from_secs_f64(DEFAULT_COOLDOWN_SECS),
                edge_triggered: false,
                overlap: OverlapPolicy::Drop,
                queue_depth: DEFAULT_QUEUE_DEPTH,
                player_command: DEFAULT_PLAYER_COMMAND.iter().map(|s| s.to_string()).collect(),
            },
            source: SourceConfig::default(),
            status_interval: Duration::from_millis(DEFAULT_STATUS_INTERVAL_MS),
        }
    }
}

impl SentinelConfig {
    /// Load configuration.
    ///
    /// The file comes from `path`, or `PRINT_SENTINEL_CONFIG` when no path is
    /// given; without either, defaults are used. `PRINT_SENTINEL_*` variables
    /// override file values.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var("PRINT_SENTINEL_CONFIG")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let file_cfg = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Some(read_config_file(&path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a config file without environment overrides.
    pub fn from_path(path: &Path) -> Result<Self> {
        let mut cfg = Self::from_file(read_config_file(path)?)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SentinelConfigFile) -> Result<Self> {
        let defaults = Self::default();

        let detector = DetectorSettings {
            model_path: file.model_path.unwrap_or(defaults.detector.model_path),
            conf_threshold: file
                .conf_threshold
                .unwrap_or(defaults.detector.conf_threshold),
            imgsz: file.imgsz.unwrap_or(defaults.detector.imgsz),
            frame_skip: file.frame_skip.unwrap_or(defaults.detector.frame_skip),
        };

        // Ratio form wins when both are set.
        let spec = match (file.alarm_region_ratio, file.alarm_region) {
            (Some(ratio), _) => RegionSpec::Ratio(ratio),
            (None, Some(abs)) => RegionSpec::Absolute(abs),
            (None, None) => defaults.region.spec,
        };
        let region = RegionSettings {
            spec,
            enabled: file
                .alarm_region_enabled
                .unwrap_or(defaults.region.enabled),
            crop: file.roi_crop.unwrap_or(defaults.region.crop),
            threshold: file.roi_threshold.unwrap_or(defaults.region.threshold),
        };

        let cooldown_secs = file
            .alarm_cooldown
            .unwrap_or(defaults.alarm.cooldown.as_secs_f64());
        let alarm = AlarmSettings {
            classes: file
                .alarm_classes
                .map(AlarmClassSet::new)
                .unwrap_or(defaults.alarm.classes),
            class_names: file.class_names.unwrap_or(defaults.alarm.class_names),
            sound_path: file.alarm_sound_path.unwrap_or(defaults.alarm.sound_path),
            volume: file.alarm_volume.unwrap_or(defaults.alarm.volume),
            cooldown: cooldown_from_secs(cooldown_secs)?,
            edge_triggered: file
                .alarm_edge_triggered
                .unwrap_or(defaults.alarm.edge_triggered),
            overlap: file.alarm_overlap.unwrap_or(defaults.alarm.overlap),
            queue_depth: file.alarm_queue_depth.unwrap_or(defaults.alarm.queue_depth),
            player_command: file
                .player_command
                .unwrap_or(defaults.alarm.player_command),
        };

        let source_file = file.source.unwrap_or_default();
        let source = SourceConfig {
            url: source_file.url.unwrap_or(defaults.source.url),
            width: source_file.width.unwrap_or(defaults.source.width),
            height: source_file.height.unwrap_or(defaults.source.height),
            fps: source_file.fps.unwrap_or(defaults.source.fps),
        };

        let status_interval = file
            .status_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.status_interval);

        Ok(Self {
            detector,
            region,
            alarm,
            source,
            status_interval,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("PRINT_SENTINEL_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.detector.model_path = path;
            }
        }
        if let Ok(url) = std::env::var("PRINT_SENTINEL_SOURCE_URL") {
            if !url.trim().is_empty() {
                self.source.url = url;
            }
        }
        if let Ok(path) = std::env::var("PRINT_SENTINEL_SOUND_PATH") {
            if !path.trim().is_empty() {
                self.alarm.sound_path = PathBuf::from(path);
            }
        }
        if let Ok(skip) = std::env::var("PRINT_SENTINEL_FRAME_SKIP") {
            self.detector.frame_skip = skip
                .trim()
                .parse()
                .map_err(|_| anyhow!("PRINT_SENTINEL_FRAME_SKIP must be a non-negative integer"))?;
        }
        if let Ok(conf) = std::env::var("PRINT_SENTINEL_CONF_THRESHOLD") {
            self.detector.conf_threshold = conf
                .trim()
                .parse()
                .map_err(|_| anyhow!("PRINT_SENTINEL_CONF_THRESHOLD must be a number"))?;
        }
        if let Ok(secs) = std::env::var("PRINT_SENTINEL_COOLDOWN_SECS") {
            let secs: f64 = secs
                .trim()
                .parse()
                .map_err(|_| anyhow!("PRINT_SENTINEL_COOLDOWN_SECS must be a number of seconds"))?;
            self.alarm.cooldown = cooldown_from_secs(secs)?;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.detector.model_path.trim().is_empty() {
            return Err(anyhow!("model_path must not be empty"));
        }
        check_unit("conf_threshold", self.detector.conf_threshold)?;
        check_unit("roi_threshold", self.region.threshold)?;
        if self.detector.imgsz == 0 || self.detector.imgsz % IMGSZ_STRIDE != 0 {
            return Err(anyhow!(
                "imgsz must be a positive multiple of {}, got {}",
                IMGSZ_STRIDE,
                self.detector.imgsz
            ));
        }
        if !self.alarm.volume.is_finite() || self.alarm.volume < 0.0 {
            return Err(anyhow!("alarm_volume must be >= 0, got {}", self.alarm.volume));
        }
        if self.alarm.queue_depth == 0 {
            return Err(anyhow!("alarm_queue_depth must be at least 1"));
        }
        if self
            .alarm
            .player_command
            .first()
            .map_or(true, |p| p.trim().is_empty())
        {
            return Err(anyhow!("player_command must name a program"));
        }
        if self.source.fps == 0 {
            return Err(anyhow!("source.fps must be greater than zero"));
        }
        if self.alarm.classes.is_empty() {
            log::warn!("alarm_classes is empty; the alarm can never fire");
        }
        if !self.region.enabled && self.region.crop {
            // Crop only applies while gating is on.
            self.region.crop = false;
        }
        Ok(())
    }
}

fn check_unit(name: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(anyhow!("{} must be within [0, 1], got {}", name, value));
    }
    Ok(())
}

fn cooldown_from_secs(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| anyhow!("alarm_cooldown must be a non-negative number of seconds, got {}", secs))
}

fn read_config_file(path: &Path) -> Result<SentinelConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelRect;

    #[test]
    fn defaults_match_reference_setup() {
        let cfg = SentinelConfig::default();
        assert_eq!(cfg.detector.frame_skip, 2);
        assert_eq!(cfg.detector.imgsz, 640);
        assert_eq!(cfg.region.spec.resolve(1920, 1080), PixelRect::new(364, 385, 957, 586));
        assert!(cfg.alarm.classes.contains(0) && cfg.alarm.classes.contains(1));
        assert!(!cfg.alarm.classes.contains(2));
        assert_eq!(cfg.alarm.class_names[1], "spaghetti");
    }

    #[test]
    fn ratio_region_takes_precedence() {
        let file: SentinelConfigFile = serde_json::from_str(
            r#"{
                "alarm_region": {"x": 1, "y": 2, "w": 3, "h": 4},
                "alarm_region_ratio": {"x": 0.1, "y": 0.1, "w": 0.5, "h": 0.5}
            }"#,
        )
        .unwrap();
        let cfg = SentinelConfig::from_file(file).unwrap();
        assert_eq!(cfg.region.spec.resolve(1920, 1080), PixelRect::new(192, 108, 960, 540));
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut cfg = SentinelConfig::default();
        cfg.detector.conf_threshold = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = SentinelConfig::default();
        cfg.detector.imgsz = 630;
        assert!(cfg.validate().is_err());

        let mut cfg = SentinelConfig::default();
        cfg.alarm.player_command.clear();
        assert!(cfg.validate().is_err());

        assert!(cooldown_from_secs(-1.0).is_err());
        assert!(cooldown_from_secs(f64::NAN).is_err());
    }

    #[test]
    fn crop_is_cleared_when_region_disabled() {
        let mut cfg = SentinelConfig::default();
        cfg.region.enabled = false;
        cfg.validate().unwrap();
        assert!(!cfg.region.crop);
    }
}
