//! Reelstitch Compose Engine
//!
//! Turns a folder of clips into one vertical video:
//! - **Segments:** timeline model and letterbox placement
//! - **Media:** ffprobe-backed stream inspection
//! - **Cards:** rendered cards wrapped as timed stills with sound effects
//! - **Normalize:** per-clip fit to the target frame
//! - **Encode:** single-pass ffmpeg filter graph
//! - **Janitor:** scoped removal of transient files
//! - **Assembler:** the run state machine tying it together

pub mod assembler;
pub mod card_clip;
pub mod encode;
pub mod janitor;
pub mod media;
pub mod normalize;
pub mod segment;

pub use assembler::{
    default_output_name, discover_inputs, MergeRequest, RunReport, RunStage, TimelineAssembler,
};
pub use card_clip::{CardClipBuilder, SoundEffects};
pub use encode::{build_encode_plan, EncodePlan, EncodeSettings, FfmpegEncoder, TimelineEncoder};
pub use janitor::{CleanupIssue, CleanupReport, ResourceJanitor};
pub use media::{command_exists, FfprobeProbe, MediaInfo, MediaProbe};
pub use normalize::ClipNormalizer;
pub use segment::{AudioTrack, Placement, Segment, SegmentKind, Timeline, VisualTrack};
