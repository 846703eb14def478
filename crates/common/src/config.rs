//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{StitchError, StitchResult};
use crate::frame::FrameSize;

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Output video parameters.
    pub output: OutputConfig,

    /// Transition card defaults.
    pub cards: CardConfig,

    /// Sound effect assets.
    pub assets: AssetConfig,

    /// Input clip discovery and trimming.
    pub clips: ClipConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Output video parameters handed to the encoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output resolution (width x height in pixels).
    pub width: u32,
    pub height: u32,

    /// Output frame rate.
    pub fps: u32,

    /// Video encoder passed to ffmpeg.
    pub video_codec: String,

    /// x264 speed preset.
    pub preset: String,

    /// H.264 profile.
    pub profile: String,

    /// Output pixel format.
    pub pixel_format: String,

    /// Audio encoder passed to ffmpeg.
    pub audio_codec: String,

    /// Sample rate every audio track is resampled to.
    pub audio_sample_rate: u32,

    /// Move the moov atom to the front for streaming playback.
    pub faststart: bool,

    /// Letterbox color behind scaled clips (RGB).
    pub pad_color: [u8; 3],
}

/// Transition card defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    /// Duration of each numbered card.
    pub counter_duration_secs: f64,

    /// Duration of the closing card.
    pub closing_duration_secs: f64,

    /// Title drawn on the first card when none is given on the command line.
    pub default_title: String,

    /// Author credit drawn on the first card when none is given.
    pub default_author: String,

    /// Theme identifier (`p1`..`p6`).
    pub default_theme: String,

    /// Vertical offset applied to the card layout to compensate for
    /// baseline differences between font rasterizers.
    pub baseline_correction_px: i32,

    /// Font files tried in order. Empty means the platform defaults.
    pub font_candidates: Vec<PathBuf>,
}

/// Sound effect assets attached to cards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory the sound effect names are resolved against.
    pub dir: PathBuf,

    /// Sound played at the start of each numbered card.
    pub tick_sound: String,

    /// Sound played at the start of the closing card.
    pub end_sound: String,

    /// Upper bound on the tick sound length.
    pub tick_max_secs: f64,

    /// Upper bound on the end sound length.
    pub end_max_secs: f64,
}

/// Input clip discovery and trimming.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipConfig {
    /// Accepted file extensions, matched case-insensitively.
    pub extensions: Vec<String>,

    /// File name prefixes reserved for outputs and temporaries.
    pub excluded_prefixes: Vec<String>,

    /// Length cut from the end of each clip.
    pub tail_trim_secs: f64,

    /// Clips at or below this duration are not trimmed.
    pub trim_threshold_secs: f64,

    /// Name of the working directory created inside the input directory.
    pub temp_dir_name: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "reelstitch=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs on the console.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,

    /// Targets forced down to `error` regardless of `level`.
    pub quiet_targets: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: FrameSize::VERTICAL_720P.width,
            height: FrameSize::VERTICAL_720P.height,
            fps: 30,
            video_codec: "libx264".to_string(),
            preset: "medium".to_string(),
            profile: "high".to_string(),
            pixel_format: "yuv420p".to_string(),
            audio_codec: "aac".to_string(),
            audio_sample_rate: 44_100,
            faststart: true,
            pad_color: [0, 0, 0],
        }
    }
}

impl OutputConfig {
    pub fn frame_size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            counter_duration_secs: 0.5,
            closing_duration_secs: 2.0,
            default_title: "Today's Joy".to_string(),
            default_author: String::new(),
            default_theme: "p6".to_string(),
            baseline_correction_px: 0,
            font_candidates: Vec::new(),
        }
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            tick_sound: "ding.wav".to_string(),
            end_sound: "end.wav".to_string(),
            tick_max_secs: 0.5,
            end_max_secs: 1.0,
        }
    }
}

impl AssetConfig {
    pub fn tick_path(&self) -> PathBuf {
        self.dir.join(&self.tick_sound)
    }

    pub fn end_path(&self) -> PathBuf {
        self.dir.join(&self.end_sound)
    }
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["mp4".to_string(), "mov".to_string()],
            excluded_prefixes: vec!["merged-".to_string(), "temp_".to_string()],
            tail_trim_secs: 0.1,
            trim_threshold_secs: 1.0,
            temp_dir_name: "temp_transitions".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: Some(PathBuf::from("reelstitch.log")),
            quiet_targets: vec!["png".to_string(), "image".to_string()],
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path. Missing keys take their defaults.
    pub fn load_from(path: &Path) -> StitchResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StitchError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: AppConfig = serde_json::from_str(&content).map_err(|e| {
            StitchError::config(format!("cannot parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the renderer or encoder cannot work with.
    pub fn validate(&self) -> StitchResult<()> {
        let size = self.output.frame_size();
        if !size.is_encodable() {
            return Err(StitchError::config(format!(
                "output size {size} must be non-zero and even (required for yuv420p)"
            )));
        }
        if self.output.fps == 0 {
            return Err(StitchError::config("output fps must be non-zero"));
        }
        if self.output.audio_sample_rate == 0 {
            return Err(StitchError::config("audio sample rate must be non-zero"));
        }
        if !(self.cards.counter_duration_secs > 0.0) || !(self.cards.closing_duration_secs > 0.0)
        {
            return Err(StitchError::config("card durations must be positive"));
        }
        if self.clips.tail_trim_secs < 0.0 {
            return Err(StitchError::config("tail trim must not be negative"));
        }
        if self.clips.extensions.is_empty() {
            return Err(StitchError::config("at least one clip extension is required"));
        }
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("reelstitch").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_short_form_output() {
        let config = AppConfig::default();
        assert_eq!(config.output.frame_size(), FrameSize::new(720, 1280));
        assert_eq!(config.output.fps, 30);
        assert_eq!(config.cards.default_theme, "p6");
        assert!((config.cards.counter_duration_secs - 0.5).abs() < 1e-9);
        assert!((config.cards.closing_duration_secs - 2.0).abs() < 1e-9);
        assert_eq!(config.assets.tick_path(), PathBuf::from("./ding.wav"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "output": { "width": 1080, "height": 1920 } }"#).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.output.frame_size(), FrameSize::new(1080, 1920));
        assert_eq!(config.output.fps, 30);
        assert_eq!(config.clips.temp_dir_name, "temp_transitions");
    }

    #[test]
    fn odd_output_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "output": { "width": 721 } }"#).unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, StitchError::Config { .. }));
    }

    #[test]
    fn non_positive_card_duration_is_rejected() {
        let mut config = AppConfig::default();
        config.cards.closing_duration_secs = 0.0;
        assert!(config.validate().is_err());
    }
}
