//! Media inspection through ffprobe.

use std::path::Path;
use std::process::Command;

use reelstitch_common::error::{StitchError, StitchResult};
use reelstitch_common::frame::FrameSize;

/// What the pipeline needs to know about a media file.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    /// Frame size of the first video stream; `None` for audio-only files.
    pub video_size: Option<FrameSize>,
    pub duration_secs: f64,
    pub has_audio: bool,
}

/// Reads stream metadata from a media file.
pub trait MediaProbe {
    fn probe(&self, path: &Path) -> StitchResult<MediaInfo>;
}

/// [`MediaProbe`] backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary: String,
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self {
            binary: "ffprobe".to_string(),
        }
    }
}

impl FfprobeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }
}

#[derive(serde::Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

impl MediaProbe for FfprobeProbe {
    fn probe(&self, path: &Path) -> StitchResult<MediaInfo> {
        if !path.exists() {
            return Err(StitchError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let out = Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(path)
            .output()
            .map_err(|e| StitchError::clip_decode(format!("failed to run {}: {e}", self.binary)))?;
        if !out.status.success() {
            return Err(StitchError::clip_decode(format!(
                "ffprobe failed for '{}': {}",
                path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        parse_probe_output(&out.stdout).map_err(|e| {
            StitchError::clip_decode(format!("cannot read '{}': {e}", path.display()))
        })
    }
}

fn parse_probe_output(json: &[u8]) -> Result<MediaInfo, String> {
    let parsed: ProbeOut =
        serde_json::from_slice(json).map_err(|e| format!("ffprobe json parse failed: {e}"))?;

    let video_size = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .and_then(|s| match (s.width, s.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some(FrameSize::new(w, h)),
            _ => None,
        });
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    // Container duration first, longest stream as a fallback.
    let duration_secs = parsed
        .format
        .as_ref()
        .and_then(|f| parse_secs(f.duration.as_deref()))
        .or_else(|| {
            parsed
                .streams
                .iter()
                .filter_map(|s| parse_secs(s.duration.as_deref()))
                .reduce(f64::max)
        })
        .ok_or_else(|| "no duration reported".to_string())?;

    Ok(MediaInfo {
        video_size,
        duration_secs,
        has_audio,
    })
}

fn parse_secs(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
}

/// Whether `binary` resolves on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
