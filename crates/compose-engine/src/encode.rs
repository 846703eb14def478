//! Encoding a timeline to a video file with ffmpeg.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};

use reelstitch_common::config::OutputConfig;
use reelstitch_common::error::{StitchError, StitchResult};
use reelstitch_common::frame::FrameSize;

use crate::media::command_exists;
use crate::segment::{Segment, Timeline, VisualTrack};

/// Output parameters handed to the encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSettings {
    pub frame: FrameSize,
    pub fps: u32,
    pub video_codec: String,
    pub preset: String,
    pub profile: String,
    pub pixel_format: String,
    pub audio_codec: String,
    pub audio_sample_rate: u32,
    pub faststart: bool,
    pub pad_color: [u8; 3],
}

impl EncodeSettings {
    pub fn from_config(output: &OutputConfig) -> Self {
        Self {
            frame: output.frame_size(),
            fps: output.fps,
            video_codec: output.video_codec.clone(),
            preset: output.preset.clone(),
            profile: output.profile.clone(),
            pixel_format: output.pixel_format.clone(),
            audio_codec: output.audio_codec.clone(),
            audio_sample_rate: output.audio_sample_rate,
            faststart: output.faststart,
            pad_color: output.pad_color,
        }
    }
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self::from_config(&OutputConfig::default())
    }
}

/// Trait for timeline encoders.
pub trait TimelineEncoder {
    /// Write `timeline` to `output`.
    fn encode(
        &mut self,
        timeline: &Timeline,
        settings: &EncodeSettings,
        output: &Path,
    ) -> StitchResult<()>;

    /// Check if this encoder can run on the system.
    fn is_available(&self) -> bool;

    /// Encoder name.
    fn name(&self) -> &str;
}

/// A fully resolved ffmpeg invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodePlan {
    pub args: Vec<String>,
    pub filter_graph: String,
    pub input_count: usize,
    pub expected_duration_secs: f64,
}

/// Build the ffmpeg arguments for `timeline`.
///
/// Each segment becomes one video and one audio chain in a single
/// `filter_complex`, normalized to the same size, rate and sample format,
/// then joined with `concat`.
pub fn build_encode_plan(
    timeline: &Timeline,
    settings: &EncodeSettings,
    output: &Path,
) -> StitchResult<EncodePlan> {
    if timeline.is_empty() {
        return Err(StitchError::no_content("timeline has no segments"));
    }
    if !settings.frame.is_encodable() {
        return Err(StitchError::encode(format!(
            "output size {} must be non-zero and even",
            settings.frame
        )));
    }

    let mut inputs: Vec<String> = Vec::new();
    let mut chains: Vec<String> = Vec::new();
    let mut concat_inputs = String::new();
    let mut input_count = 0usize;

    for (i, segment) in timeline.segments().iter().enumerate() {
        if !(segment.duration_secs.is_finite() && segment.duration_secs > 0.0) {
            return Err(StitchError::encode(format!(
                "segment {i} has non-positive duration {}",
                segment.duration_secs
            )));
        }
        let duration = secs(segment.duration_secs);

        let video_input = input_count;
        input_count += 1;
        match &segment.visual {
            VisualTrack::Still { image_path } => {
                inputs.extend([
                    "-loop".to_string(),
                    "1".to_string(),
                    "-framerate".to_string(),
                    settings.fps.to_string(),
                    "-t".to_string(),
                    duration.clone(),
                    "-i".to_string(),
                    image_path.display().to_string(),
                ]);
            }
            VisualTrack::Video { source_path, .. } => {
                inputs.extend(["-i".to_string(), source_path.display().to_string()]);
            }
        }
        chains.push(video_chain(segment, video_input, i, settings));

        let audio_input = match (&segment.visual, &segment.audio) {
            (_, None) => None,
            // Clip audio comes from the clip file itself.
            (VisualTrack::Video { .. }, Some(_)) => Some(video_input),
            (VisualTrack::Still { .. }, Some(audio)) => {
                inputs.extend(["-i".to_string(), audio.source_path.display().to_string()]);
                input_count += 1;
                Some(input_count - 1)
            }
        };
        chains.push(audio_chain(segment, audio_input, i, settings));

        concat_inputs.push_str(&format!("[v{i}][a{i}]"));
    }

    chains.push(format!(
        "{concat_inputs}concat=n={}:v=1:a=1[outv][outa]",
        timeline.len()
    ));
    let filter_graph = chains.join(";");

    let mut args: Vec<String> = ["-hide_banner", "-nostdin", "-y", "-loglevel", "error"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    args.extend(inputs);
    args.extend([
        "-filter_complex".to_string(),
        filter_graph.clone(),
        "-map".to_string(),
        "[outv]".to_string(),
        "-map".to_string(),
        "[outa]".to_string(),
    ]);
    args.extend(codec_args(settings));
    args.push(output.display().to_string());

    Ok(EncodePlan {
        args,
        filter_graph,
        input_count,
        expected_duration_secs: timeline.total_duration_secs(),
    })
}

fn video_chain(segment: &Segment, input: usize, i: usize, settings: &EncodeSettings) -> String {
    let FrameSize { width, height } = settings.frame;
    let duration = secs(segment.duration_secs);
    let geometry = match &segment.visual {
        VisualTrack::Still { .. } => format!("scale={width}:{height},"),
        VisualTrack::Video {
            placement: Some(p), ..
        } => {
            let [r, g, b] = settings.pad_color;
            format!(
                "scale={}:{},pad={width}:{height}:{}:{}:color=0x{r:02X}{g:02X}{b:02X},",
                p.scaled.width, p.scaled.height, p.x, p.y
            )
        }
        VisualTrack::Video { placement: None, .. } => String::new(),
    };
    format!(
        "[{input}:v]trim=start=0:end={duration},setpts=PTS-STARTPTS,{geometry}setsar=1,fps={},format={}[v{i}]",
        settings.fps, settings.pixel_format
    )
}

fn audio_chain(
    segment: &Segment,
    input: Option<usize>,
    i: usize,
    settings: &EncodeSettings,
) -> String {
    let rate = settings.audio_sample_rate;
    let duration = secs(segment.duration_secs);
    let format = format!("aformat=sample_fmts=fltp:sample_rates={rate}:channel_layouts=stereo");
    match (input, &segment.audio) {
        (Some(input), Some(audio)) => format!(
            "[{input}:a]atrim=start=0:end={},asetpts=PTS-STARTPTS,aresample={rate},{format},apad,atrim=duration={duration}[a{i}]",
            secs(audio.duration_secs.min(segment.duration_secs))
        ),
        _ => format!(
            "anullsrc=channel_layout=stereo:sample_rate={rate},atrim=duration={duration},{format}[a{i}]"
        ),
    }
}

fn codec_args(settings: &EncodeSettings) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-c:v".to_string(),
        settings.video_codec.clone(),
        "-preset".to_string(),
        settings.preset.clone(),
        "-profile:v".to_string(),
        settings.profile.clone(),
        "-pix_fmt".to_string(),
        settings.pixel_format.clone(),
        "-r".to_string(),
        settings.fps.to_string(),
        "-c:a".to_string(),
        settings.audio_codec.clone(),
        "-ar".to_string(),
        settings.audio_sample_rate.to_string(),
        "-strict".to_string(),
        "-2".to_string(),
    ];
    if settings.faststart {
        args.extend(["-movflags".to_string(), "+faststart".to_string()]);
    }
    args
}

fn secs(value: f64) -> String {
    format!("{value:.3}")
}

/// Kills and reaps the child if it is dropped before being waited on.
struct ChildGuard {
    child: Option<Child>,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self { child: Some(child) }
    }

    fn id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    fn take_stderr(&mut self) -> Option<std::process::ChildStderr> {
        self.child.as_mut().and_then(|c| c.stderr.take())
    }

    fn wait(mut self) -> std::io::Result<ExitStatus> {
        match self.child.take() {
            Some(mut child) => child.wait(),
            None => Err(std::io::Error::other("child already reaped")),
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// [`TimelineEncoder`] that shells out to ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: String,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
        }
    }
}

impl FfmpegEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run_ffmpeg(&self, plan: &EncodePlan) -> StitchResult<()> {
        tracing::debug!(args = ?plan.args, "Running ffmpeg");
        let child = Command::new(&self.binary)
            .args(&plan.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| StitchError::encode(format!("Failed to start {}: {e}", self.binary)))?;
        let mut guard = ChildGuard::new(child);

        tracing::info!(
            pid = guard.id(),
            inputs = plan.input_count,
            expected_duration_secs = plan.expected_duration_secs,
            "ffmpeg process started"
        );

        let stderr = guard
            .take_stderr()
            .ok_or_else(|| StitchError::encode("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = std::io::BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let started = std::time::Instant::now();
        let status = guard
            .wait()
            .map_err(|e| StitchError::encode(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(StitchError::encode(format!(
                "ffmpeg failed (status {status}): {}",
                stderr_output.trim()
            )));
        }
        tracing::info!(
            elapsed_secs = started.elapsed().as_secs_f64(),
            "ffmpeg finished"
        );
        Ok(())
    }
}

impl TimelineEncoder for FfmpegEncoder {
    fn encode(
        &mut self,
        timeline: &Timeline,
        settings: &EncodeSettings,
        output: &Path,
    ) -> StitchResult<()> {
        let plan = build_encode_plan(timeline, settings, output)?;
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        tracing::info!(
            output = %output.display(),
            segments = timeline.len(),
            duration_secs = plan.expected_duration_secs,
            size = %settings.frame,
            "Encoding timeline"
        );
        self.run_ffmpeg(&plan)?;

        let written = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(StitchError::encode(format!(
                "ffmpeg reported success but {} is missing or empty",
                output.display()
            )));
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{AudioTrack, Placement};
    use std::path::PathBuf;

    fn sample_timeline() -> Timeline {
        let mut timeline = Timeline::new();
        timeline.push(Segment::card(
            1,
            false,
            PathBuf::from("/w/transition_1.png"),
            0.5,
            Some(AudioTrack {
                source_path: PathBuf::from("/a/ding.wav"),
                duration_secs: 0.5,
            }),
        ));
        let source = FrameSize::new(1920, 1080);
        timeline.push(Segment::clip(
            1,
            PathBuf::from("/in/a.mp4"),
            source,
            Some(Placement::fit(source, FrameSize::VERTICAL_720P)),
            4.9,
            Some(AudioTrack {
                source_path: PathBuf::from("/in/a.mp4"),
                duration_secs: 4.9,
            }),
        ));
        timeline.push(Segment::card(
            2,
            true,
            PathBuf::from("/w/transition_2.png"),
            2.0,
            None,
        ));
        timeline
    }

    #[test]
    fn plan_has_one_input_per_source() {
        let plan = build_encode_plan(
            &sample_timeline(),
            &EncodeSettings::default(),
            Path::new("/out/merged.mp4"),
        )
        .unwrap();

        // card image, tick sound, clip, closing image
        assert_eq!(plan.input_count, 4);
        let inputs: Vec<_> = plan
            .args
            .iter()
            .zip(plan.args.iter().skip(1))
            .filter(|(flag, _)| *flag == "-i")
            .map(|(_, value)| value.as_str())
            .collect();
        assert_eq!(
            inputs,
            vec![
                "/w/transition_1.png",
                "/a/ding.wav",
                "/in/a.mp4",
                "/w/transition_2.png"
            ]
        );
        assert!((plan.expected_duration_secs - 7.4).abs() < 1e-9);
        assert_eq!(plan.args.last().map(String::as_str), Some("/out/merged.mp4"));
    }

    #[test]
    fn filter_graph_letterboxes_and_pads_audio() {
        let plan = build_encode_plan(
            &sample_timeline(),
            &EncodeSettings::default(),
            Path::new("out.mp4"),
        )
        .unwrap();
        let graph = &plan.filter_graph;

        assert!(graph.contains("[0:v]trim=start=0:end=0.500"));
        assert!(graph.contains("[1:a]atrim=start=0:end=0.500"));
        assert!(graph.contains("scale=720:404,pad=720:1280:0:438:color=0x000000"));
        assert!(graph.contains("[2:a]atrim=start=0:end=4.900"));
        assert!(graph.contains("anullsrc=channel_layout=stereo:sample_rate=44100,atrim=duration=2.000"));
        assert!(graph.ends_with("[v0][a0][v1][a1][v2][a2]concat=n=3:v=1:a=1[outv][outa]"));
    }

    #[test]
    fn codec_flags_match_output_config() {
        let plan = build_encode_plan(
            &sample_timeline(),
            &EncodeSettings::default(),
            Path::new("out.mp4"),
        )
        .unwrap();
        let joined = plan.args.join(" ");
        for expected in [
            "-c:v libx264",
            "-preset medium",
            "-profile:v high",
            "-pix_fmt yuv420p",
            "-r 30",
            "-c:a aac",
            "-movflags +faststart",
        ] {
            assert!(joined.contains(expected), "missing {expected}");
        }
    }

    #[test]
    fn passthrough_clip_has_no_scale_or_pad() {
        let mut timeline = Timeline::new();
        timeline.push(Segment::clip(
            1,
            PathBuf::from("v.mp4"),
            FrameSize::VERTICAL_720P,
            None,
            1.0,
            None,
        ));
        let plan =
            build_encode_plan(&timeline, &EncodeSettings::default(), Path::new("o.mp4")).unwrap();
        assert!(!plan.filter_graph.contains("pad="));
        assert!(!plan.filter_graph.contains("scale="));
    }

    #[test]
    fn empty_timeline_is_no_content() {
        let err = build_encode_plan(&Timeline::new(), &EncodeSettings::default(), Path::new("o"))
            .unwrap_err();
        assert!(matches!(err, StitchError::NoContent { .. }));
    }

    #[test]
    fn missing_binary_fails_with_encode_error() {
        let mut encoder = FfmpegEncoder::with_binary("definitely-not-a-real-ffmpeg");
        assert!(!encoder.is_available());
        let dir = tempfile::tempdir().unwrap();
        let err = encoder
            .encode(
                &sample_timeline(),
                &EncodeSettings::default(),
                &dir.path().join("o.mp4"),
            )
            .unwrap_err();
        assert!(matches!(err, StitchError::Encode { .. }));
    }
}
