//! Timeline data model.
//!
//! A [`Timeline`] is an ordered list of [`Segment`]s. Cards become still
//! segments, input clips become video segments with an optional letterbox
//! [`Placement`]. The encoder turns the whole list into one output file.

use std::path::{Path, PathBuf};

use reelstitch_common::frame::FrameSize;

/// What a segment was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Card { index: u32, is_final: bool },
    Clip { index: u32 },
}

impl SegmentKind {
    pub fn is_card(&self) -> bool {
        matches!(self, SegmentKind::Card { .. })
    }

    pub fn is_clip(&self) -> bool {
        matches!(self, SegmentKind::Clip { .. })
    }
}

/// Where a scaled clip lands inside the target frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub target: FrameSize,
    /// Clip size after uniform scaling.
    pub scaled: FrameSize,
    /// Left edge of the scaled clip.
    pub x: u32,
    /// Top edge of the scaled clip.
    pub y: u32,
}

impl Placement {
    /// Fit `source` inside `target` without cropping.
    ///
    /// The scale is `min(tw/sw, th/sh)`. Scaled dimensions are floored to
    /// even values so the result stays encodable as 4:2:0, and the
    /// remainder is split evenly on both sides.
    pub fn fit(source: FrameSize, target: FrameSize) -> Self {
        let scale = f64::min(
            target.width as f64 / source.width.max(1) as f64,
            target.height as f64 / source.height.max(1) as f64,
        );
        let width = even_floor(source.width as f64 * scale).min(target.width);
        let height = even_floor(source.height as f64 * scale).min(target.height);
        Self {
            target,
            scaled: FrameSize::new(width, height),
            x: (target.width - width) / 2,
            y: (target.height - height) / 2,
        }
    }

    /// Scaled clip fills the frame exactly.
    pub fn is_full_frame(&self) -> bool {
        self.scaled == self.target
    }
}

fn even_floor(value: f64) -> u32 {
    // Tiny epsilon absorbs float error such as 1079.9999999.
    let floored = (value + 1e-6).floor().max(0.0) as u32;
    (floored & !1).max(2)
}

/// Picture source of a segment.
#[derive(Debug, Clone, PartialEq)]
pub enum VisualTrack {
    /// A single image held for the segment duration.
    Still { image_path: PathBuf },
    /// A video file, letterboxed when `placement` is set and passed through
    /// unscaled otherwise.
    Video {
        source_path: PathBuf,
        source_size: FrameSize,
        placement: Option<Placement>,
    },
}

/// Sound attached to the start of a segment.
///
/// Plays from segment time 0 for `duration_secs`; silence fills any
/// remainder of the segment.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    pub source_path: PathBuf,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub visual: VisualTrack,
    pub audio: Option<AudioTrack>,
    pub duration_secs: f64,
    /// Ordinal in the timeline, assigned by [`Timeline::push`].
    pub position: usize,
}

impl Segment {
    pub fn card(
        index: u32,
        is_final: bool,
        image_path: PathBuf,
        duration_secs: f64,
        audio: Option<AudioTrack>,
    ) -> Self {
        Self {
            kind: SegmentKind::Card { index, is_final },
            visual: VisualTrack::Still { image_path },
            audio,
            duration_secs,
            position: 0,
        }
    }

    pub fn clip(
        index: u32,
        source_path: PathBuf,
        source_size: FrameSize,
        placement: Option<Placement>,
        duration_secs: f64,
        audio: Option<AudioTrack>,
    ) -> Self {
        Self {
            kind: SegmentKind::Clip { index },
            visual: VisualTrack::Video {
                source_path,
                source_size,
                placement,
            },
            audio,
            duration_secs,
            position: 0,
        }
    }

    /// Image file backing a still segment.
    pub fn still_image(&self) -> Option<&Path> {
        match &self.visual {
            VisualTrack::Still { image_path } => Some(image_path),
            VisualTrack::Video { .. } => None,
        }
    }
}

/// Ordered segments making up the output video.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    segments: Vec<Segment>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment and stamp its position.
    pub fn push(&mut self, mut segment: Segment) {
        segment.position = self.segments.len();
        self.segments.push(segment);
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn total_duration_secs(&self) -> f64 {
        self.segments.iter().map(|s| s.duration_secs).sum()
    }

    pub fn card_count(&self) -> usize {
        self.segments.iter().filter(|s| s.kind.is_card()).count()
    }

    pub fn clip_count(&self) -> usize {
        self.segments.iter().filter(|s| s.kind.is_clip()).count()
    }

    pub fn kinds(&self) -> Vec<SegmentKind> {
        self.segments.iter().map(|s| s.kind).collect()
    }
}
