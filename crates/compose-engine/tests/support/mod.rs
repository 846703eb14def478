//! Fakes and log capture shared by the pipeline tests.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use reelstitch_common::error::{StitchError, StitchResult};
use reelstitch_common::frame::FrameSize;
use reelstitch_common::AppConfig;
use reelstitch_compose_engine::{
    EncodeSettings, MediaInfo, MediaProbe, Timeline, TimelineEncoder,
};

/// Reports every `.wav` as a short sound, files with `corrupt` in their
/// name as undecodable, and anything else as a landscape clip with audio.
pub struct FakeProbe {
    pub clip_size: FrameSize,
    pub clip_secs: f64,
    pub sound_secs: f64,
}

impl Default for FakeProbe {
    fn default() -> Self {
        Self {
            clip_size: FrameSize::new(1920, 1080),
            clip_secs: 5.0,
            sound_secs: 0.8,
        }
    }
}

impl MediaProbe for FakeProbe {
    fn probe(&self, path: &Path) -> StitchResult<MediaInfo> {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        if name.contains("corrupt") {
            return Err(StitchError::clip_decode(format!("{name}: invalid data")));
        }
        if name.ends_with(".wav") {
            return Ok(MediaInfo {
                video_size: None,
                duration_secs: self.sound_secs,
                has_audio: true,
            });
        }
        Ok(MediaInfo {
            video_size: Some(self.clip_size),
            duration_secs: self.clip_secs,
            has_audio: true,
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum EncoderMode {
    Succeed,
    Fail,
    Panic,
}

/// Writes a placeholder file and remembers what it was asked to encode.
#[derive(Clone)]
pub struct FakeEncoder {
    pub mode: EncoderMode,
    pub calls: Arc<Mutex<Vec<(Timeline, PathBuf)>>>,
}

impl FakeEncoder {
    pub fn new(mode: EncoderMode) -> Self {
        Self {
            mode,
            calls: Arc::default(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl TimelineEncoder for FakeEncoder {
    fn encode(
        &mut self,
        timeline: &Timeline,
        _settings: &EncodeSettings,
        output: &Path,
    ) -> StitchResult<()> {
        // Cards must still be on disk when the encoder reads them.
        for segment in timeline.segments() {
            if let Some(image) = segment.still_image() {
                assert!(image.is_file(), "card {} missing at encode", image.display());
            }
        }
        self.calls
            .lock()
            .unwrap()
            .push((timeline.clone(), output.to_path_buf()));
        match self.mode {
            EncoderMode::Succeed => {
                std::fs::write(output, b"encoded")?;
                Ok(())
            }
            EncoderMode::Fail => Err(StitchError::encode("simulated encoder failure")),
            EncoderMode::Panic => panic!("simulated encoder crash"),
        }
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Config with a small frame, a forced built-in font, and sound assets
/// looked up in `assets_dir`.
pub fn test_config(assets_dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.output.width = 180;
    config.output.height = 320;
    config.assets.dir = assets_dir.to_path_buf();
    config.cards.font_candidates = vec![PathBuf::from("/nonexistent/font.ttf")];
    config.logging.file = None;
    config
}

pub fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"x").unwrap();
    path
}

/// Names of files directly inside `dir` starting with `prefix`.
pub fn files_with_prefix(dir: &Path, prefix: &str) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with(prefix))
        .collect();
    names.sort();
    names
}

#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `f` with logs captured as plain text.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, buffer.contents())
}
