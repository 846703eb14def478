//! Real ffmpeg runs. Skipped when ffmpeg or ffprobe is not on PATH.

mod support;

use std::path::Path;
use std::process::Command;

use reelstitch_card_render::ThemeCatalog;
use reelstitch_common::FrameSize;
use reelstitch_compose_engine::{
    command_exists, FfmpegEncoder, FfprobeProbe, MediaProbe, MergeRequest, TimelineAssembler,
};

fn tools_available() -> bool {
    let ok = command_exists("ffmpeg") && command_exists("ffprobe");
    if !ok {
        eprintln!("skipping: ffmpeg/ffprobe not found on PATH");
    }
    ok
}

fn make_clip(path: &Path, size: &str, secs: f64, with_audio: bool) {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-hide_banner", "-loglevel", "error", "-y", "-f", "lavfi", "-i"])
        .arg(format!("testsrc=size={size}:rate=30:duration={secs}"));
    if with_audio {
        cmd.args(["-f", "lavfi", "-i"])
            .arg(format!("sine=frequency=440:duration={secs}"));
        cmd.args(["-c:a", "aac", "-shortest"]);
    }
    cmd.args(["-c:v", "libx264", "-pix_fmt", "yuv420p"]).arg(path);
    let status = cmd.status().unwrap();
    assert!(status.success(), "could not synthesize {}", path.display());
}

#[test]
fn test_merge_with_real_ffmpeg() {
    if !tools_available() {
        return;
    }
    let input = tempfile::tempdir().unwrap();
    let assets = tempfile::tempdir().unwrap();
    make_clip(&input.path().join("a.mp4"), "320x240", 1.5, true);
    make_clip(&input.path().join("b.mp4"), "180x320", 0.8, false);

    let config = support::test_config(assets.path());
    let mut assembler = TimelineAssembler::new(config)
        .with_probe(FfprobeProbe::new())
        .with_encoder(FfmpegEncoder::new());
    let request = MergeRequest::new(input.path(), "Real", ThemeCatalog::lookup("p4"));
    let report = assembler.run(&request);

    assert!(report.succeeded(), "merge failed: {:?}", report.error);
    let output = report.output_path.unwrap();
    let info = FfprobeProbe::new().probe(&output).unwrap();

    assert_eq!(info.video_size, Some(FrameSize::new(180, 320)));
    assert!(info.has_audio);
    // 0.5 + 1.4 + 0.5 + 0.8 + 2.0
    assert!(
        (info.duration_secs - 5.2).abs() < 0.3,
        "duration {}",
        info.duration_secs
    );
    assert!(!input.path().join("temp_transitions").exists());
}
