//! Run orchestration: discover clips, interleave cards, encode, clean up.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use reelstitch_card_render::{CardRenderer, CardSpec, GlyphSource, Theme};
use reelstitch_common::config::{AppConfig, ClipConfig};
use reelstitch_common::error::{StitchError, StitchResult};

use crate::card_clip::{CardClipBuilder, SoundEffects};
use crate::encode::{EncodeSettings, FfmpegEncoder, TimelineEncoder};
use crate::janitor::{CleanupReport, ResourceJanitor};
use crate::media::{FfprobeProbe, MediaProbe};
use crate::normalize::ClipNormalizer;
use crate::segment::Timeline;

/// Card images left behind by interrupted runs match this prefix.
pub const CARD_FILE_PREFIX: &str = "transition_";
const CARD_FILE_EXTENSION: &str = "png";

/// Stages of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Preparing,
    ProcessingInputs,
    Finalizing,
    Encoding,
    CleaningUp,
    Done,
    Failed,
}

/// What to merge and how to decorate it.
#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub input_dir: PathBuf,
    /// Defaults to `merged-video-MMDD-HHMM.mp4` inside `input_dir`.
    pub output_path: Option<PathBuf>,
    pub title: String,
    pub author: Option<String>,
    pub theme: Theme,
}

impl MergeRequest {
    pub fn new(input_dir: impl Into<PathBuf>, title: impl Into<String>, theme: Theme) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_path: None,
            title: title.into(),
            author: None,
            theme,
        }
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

/// Outcome of [`TimelineAssembler::run`].
#[derive(Debug, Clone)]
pub struct RunReport {
    /// `Done` or `Failed`.
    pub stage: RunStage,
    pub output_path: Option<PathBuf>,
    pub inputs: usize,
    /// The assembled timeline, possibly partial on failure.
    pub timeline: Timeline,
    pub cards_skipped: usize,
    pub clips_skipped: usize,
    pub cleanup: CleanupReport,
    pub error: Option<String>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.stage == RunStage::Done
    }

    pub fn segments(&self) -> usize {
        self.timeline.len()
    }
}

#[derive(Debug)]
struct RunState {
    stage: RunStage,
    inputs: usize,
    timeline: Timeline,
    cards_skipped: usize,
    clips_skipped: usize,
}

impl RunState {
    fn new() -> Self {
        Self {
            stage: RunStage::Preparing,
            inputs: 0,
            timeline: Timeline::new(),
            cards_skipped: 0,
            clips_skipped: 0,
        }
    }

    fn enter(&mut self, stage: RunStage) {
        tracing::info!(from = ?self.stage, to = ?stage, "Run stage");
        self.stage = stage;
    }
}

/// Drives one merge run end to end.
pub struct TimelineAssembler {
    config: AppConfig,
    probe: Box<dyn MediaProbe>,
    encoder: Box<dyn TimelineEncoder>,
    date_label: Option<String>,
}

impl TimelineAssembler {
    /// Assembler using ffprobe and ffmpeg from `PATH`.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            probe: Box::new(FfprobeProbe::new()),
            encoder: Box::new(FfmpegEncoder::new()),
            date_label: None,
        }
    }

    pub fn with_probe(mut self, probe: impl MediaProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    pub fn with_encoder(mut self, encoder: impl TimelineEncoder + 'static) -> Self {
        self.encoder = Box::new(encoder);
        self
    }

    /// Fixed date for the title box instead of today's.
    pub fn with_date_label(mut self, label: impl Into<String>) -> Self {
        self.date_label = Some(label.into());
        self
    }

    /// Run the whole pipeline.
    ///
    /// Never panics and never returns an error: failures, including panics
    /// inside the pipeline, are logged and reported as `RunStage::Failed`.
    /// Transient files are removed on every path.
    pub fn run(&mut self, request: &MergeRequest) -> RunReport {
        let mut janitor = ResourceJanitor::new();
        let mut state = RunState::new();
        tracing::info!(
            input_dir = %request.input_dir.display(),
            theme = %request.theme.id,
            encoder = self.encoder.name(),
            "Starting merge"
        );

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.execute(request, &mut janitor, &mut state)
        }));

        let failed_in = state.stage;
        state.enter(RunStage::CleaningUp);
        let cleanup = janitor.cleanup();

        let (stage, output_path, error) = match outcome {
            Ok(Ok(path)) => (RunStage::Done, Some(path), None),
            Ok(Err(e)) => {
                tracing::error!(stage = ?failed_in, error = %e, "Merge failed");
                (RunStage::Failed, None, Some(e.to_string()))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(stage = ?failed_in, panic = %message, "Merge aborted by unexpected panic");
                (RunStage::Failed, None, Some(format!("unexpected panic: {message}")))
            }
        };
        state.enter(stage);

        if let Some(path) = &output_path {
            tracing::info!(
                output = %path.display(),
                segments = state.timeline.len(),
                duration_secs = state.timeline.total_duration_secs(),
                "Merge complete"
            );
        }

        RunReport {
            stage,
            output_path,
            inputs: state.inputs,
            timeline: state.timeline,
            cards_skipped: state.cards_skipped,
            clips_skipped: state.clips_skipped,
            cleanup,
            error,
        }
    }

    fn execute(
        &mut self,
        request: &MergeRequest,
        janitor: &mut ResourceJanitor,
        state: &mut RunState,
    ) -> StitchResult<PathBuf> {
        // Registered before anything can fail so leftovers of a crashed run
        // are removed on every path.
        let work_dir = request.input_dir.join(&self.config.clips.temp_dir_name);
        janitor.track_dir(&work_dir);
        janitor.sweep_dir(&request.input_dir, CARD_FILE_PREFIX, CARD_FILE_EXTENSION);

        let inputs = discover_inputs(&request.input_dir, &self.config.clips)?;
        state.inputs = inputs.len();
        tracing::info!(count = inputs.len(), "Discovered input clips");

        let output = match &request.output_path {
            Some(path) => path.clone(),
            None => request
                .input_dir
                .join(default_output_name(chrono::Local::now().naive_local())),
        };
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::create_dir_all(&work_dir)?;

        let frame = self.config.output.frame_size();
        let mut renderer = CardRenderer::new(
            frame,
            GlyphSource::from_candidates(&self.config.cards.font_candidates),
            self.config.cards.baseline_correction_px,
            &work_dir,
        );
        if let Some(label) = &self.date_label {
            renderer = renderer.with_date_label(label.clone());
        }
        let probe = self.probe.as_ref();
        let cards = CardClipBuilder::new(
            renderer,
            probe,
            SoundEffects::from_config(&self.config.assets),
        );
        let normalizer = ClipNormalizer::new(probe, frame, &self.config.clips);

        state.enter(RunStage::ProcessingInputs);
        for (position, input) in inputs.iter().enumerate() {
            let index = position as u32 + 1;
            let mut spec = CardSpec::counter(
                index,
                self.config.cards.counter_duration_secs,
                request.theme,
            );
            if index == 1 {
                spec = spec.with_title(request.title.clone());
                if let Some(author) = &request.author {
                    spec = spec.with_author(author.clone());
                }
            }

            match cards.build(&spec) {
                Ok(segment) => {
                    if let Some(image) = segment.still_image() {
                        janitor.track_file(image);
                    }
                    state.timeline.push(segment);
                }
                Err(e) => {
                    state.cards_skipped += 1;
                    tracing::warn!(index, error = %e, "Skipping card");
                }
            }

            match normalizer.normalize(input, index) {
                Ok(segment) => state.timeline.push(segment),
                Err(e) => {
                    state.clips_skipped += 1;
                    tracing::error!(index, path = %input.display(), error = %e, "Skipping clip");
                }
            }
        }

        state.enter(RunStage::Finalizing);
        let closing = CardSpec::closing(
            inputs.len() as u32 + 1,
            self.config.cards.closing_duration_secs,
            request.theme,
        );
        match cards.build(&closing) {
            Ok(segment) => {
                if let Some(image) = segment.still_image() {
                    janitor.track_file(image);
                }
                state.timeline.push(segment);
            }
            Err(e) => {
                state.cards_skipped += 1;
                tracing::warn!(error = %e, "Skipping closing card");
            }
        }

        state.enter(RunStage::Encoding);
        if state.timeline.is_empty() {
            return Err(StitchError::no_content(
                "no card or clip could be prepared",
            ));
        }
        let settings = EncodeSettings::from_config(&self.config.output);
        self.encoder.encode(&state.timeline, &settings, &output)?;
        if !output.is_file() {
            return Err(StitchError::encode(format!(
                "{} encoder finished without writing {}",
                self.encoder.name(),
                output.display()
            )));
        }
        Ok(output)
    }
}

/// Eligible clips in `dir`, sorted by file name.
///
/// Matches extensions case-insensitively and skips names starting with a
/// reserved prefix (earlier outputs, temp files).
pub fn discover_inputs(dir: &Path, clips: &ClipConfig) -> StitchResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(StitchError::no_input(format!(
            "input directory {} does not exist",
            dir.display()
        )));
    }

    let mut found: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_eligible(path, clips))
        .collect();
    found.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    if found.is_empty() {
        return Err(StitchError::no_input(format!(
            "no {} files in {}",
            clips.extensions.join("/"),
            dir.display()
        )));
    }
    Ok(found)
}

fn is_eligible(path: &Path, clips: &ClipConfig) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if clips
        .excluded_prefixes
        .iter()
        .any(|prefix| name.starts_with(prefix.as_str()))
    {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| clips.extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// `merged-video-MMDD-HHMM.mp4` for the given local time.
pub fn default_output_name(now: NaiveDateTime) -> String {
    format!("merged-video-{}.mp4", now.format("%m%d-%H%M"))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn discovery_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "b.MOV",
            "a.mp4",
            "c.avi",
            "merged-video-0101-1200.mp4",
            "temp_audio.mp4",
            "notes.txt",
        ] {
            touch(dir.path(), name);
        }
        std::fs::create_dir(dir.path().join("d.mp4")).unwrap();

        let found = discover_inputs(dir.path(), &ClipConfig::default()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.mp4", "b.MOV"]);
    }

    #[test]
    fn empty_or_missing_dir_is_no_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_inputs(dir.path(), &ClipConfig::default()).unwrap_err();
        assert!(matches!(err, StitchError::NoInput { .. }));

        let err =
            discover_inputs(&dir.path().join("nope"), &ClipConfig::default()).unwrap_err();
        assert!(matches!(err, StitchError::NoInput { .. }));
    }

    #[test]
    fn default_name_uses_month_day_hour_minute() {
        let at = NaiveDate::from_ymd_opt(2026, 3, 7)
            .and_then(|d| d.and_hms_opt(9, 5, 0))
            .unwrap();
        assert_eq!(default_output_name(at), "merged-video-0307-0905.mp4");
    }

    #[test]
    fn panic_payloads_are_readable() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&String::from("bang")), "bang");
        assert_eq!(panic_message(&42u8), "non-string panic payload");
    }
}
