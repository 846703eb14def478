//! Fitting input clips to the output frame.

use std::path::Path;

use reelstitch_common::config::ClipConfig;
use reelstitch_common::error::{StitchError, StitchResult};
use reelstitch_common::frame::FrameSize;

use crate::media::MediaProbe;
use crate::segment::{AudioTrack, Placement, Segment};

/// Shortest clip the encoder can address; durations are written with
/// millisecond precision.
const MIN_CLIP_SECS: f64 = 0.001;

/// Probes clips and describes how each one maps onto the target frame.
pub struct ClipNormalizer<'a> {
    probe: &'a dyn MediaProbe,
    target: FrameSize,
    tail_trim_secs: f64,
    trim_threshold_secs: f64,
}

impl<'a> ClipNormalizer<'a> {
    pub fn new(probe: &'a dyn MediaProbe, target: FrameSize, clips: &ClipConfig) -> Self {
        Self {
            probe,
            target,
            tail_trim_secs: clips.tail_trim_secs,
            trim_threshold_secs: clips.trim_threshold_secs,
        }
    }

    /// Duration kept from a clip of `source_secs`.
    ///
    /// Clips longer than the threshold lose a short tail; some sources carry
    /// a corrupt final frame.
    pub fn trimmed_duration(&self, source_secs: f64) -> f64 {
        if source_secs > self.trim_threshold_secs {
            source_secs - self.tail_trim_secs
        } else {
            source_secs
        }
    }

    /// Build the segment for input clip number `index`.
    ///
    /// Any probe failure or unusable stream is reported as
    /// [`StitchError::ClipDecode`].
    pub fn normalize(&self, path: &Path, index: u32) -> StitchResult<Segment> {
        let info = self.probe.probe(path).map_err(|e| match e {
            StitchError::ClipDecode { .. } => e,
            other => StitchError::clip_decode(format!("{}: {other}", path.display())),
        })?;

        let source_size = info.video_size.ok_or_else(|| {
            StitchError::clip_decode(format!("{} has no video stream", path.display()))
        })?;
        if !(info.duration_secs.is_finite() && info.duration_secs >= MIN_CLIP_SECS) {
            return Err(StitchError::clip_decode(format!(
                "{} has no playable duration",
                path.display()
            )));
        }

        let duration_secs = self.trimmed_duration(info.duration_secs);
        let placement = (source_size != self.target).then(|| Placement::fit(source_size, self.target));
        let audio = info.has_audio.then(|| AudioTrack {
            source_path: path.to_path_buf(),
            duration_secs,
        });

        match placement {
            Some(p) => tracing::info!(
                index,
                path = %path.display(),
                source = %source_size,
                scaled = %p.scaled,
                offset_x = p.x,
                offset_y = p.y,
                duration_secs,
                "Letterboxing clip"
            ),
            None => tracing::info!(
                index,
                path = %path.display(),
                duration_secs,
                "Clip already at target size"
            ),
        }

        Ok(Segment::clip(
            index,
            path.to_path_buf(),
            source_size,
            placement,
            duration_secs,
            audio,
        ))
    }
}
