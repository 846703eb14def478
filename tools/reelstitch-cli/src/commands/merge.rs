//! Merge a folder of clips.

use std::path::{Path, PathBuf};

use reelstitch_card_render::Theme;
use reelstitch_common::config::AppConfig;
use reelstitch_compose_engine::{
    FfmpegEncoder, FfprobeProbe, MergeRequest, TimelineAssembler, TimelineEncoder,
};

pub struct MergeOptions {
    pub input_dir: PathBuf,
    /// Only the file name is used.
    pub output_name: Option<PathBuf>,
    pub title: String,
    pub author: Option<String>,
    pub theme: Theme,
}

pub fn run(config: AppConfig, opts: MergeOptions) -> anyhow::Result<bool> {
    if !opts.input_dir.exists() {
        std::fs::create_dir_all(&opts.input_dir)?;
        println!("Created input directory: {}", opts.input_dir.display());
    }

    let output = resolve_output(&opts.input_dir, opts.output_name.as_deref());

    println!("Reelstitch");
    println!("{}", "=".repeat(50));
    println!("Input:   {}", opts.input_dir.display());
    match &output {
        Some(path) => println!("Output:  {}", path.display()),
        None => println!("Output:  {}/merged-video-<MMDD-HHMM>.mp4", opts.input_dir.display()),
    }
    println!("Title:   {}", opts.title);
    println!("Author:  {}", opts.author.as_deref().unwrap_or("-"));
    println!("Theme:   {} ({})", opts.theme.id, opts.theme.display_name);
    println!(
        "Frame:   {} @ {} fps",
        config.output.frame_size(),
        config.output.fps
    );
    println!();

    let encoder = FfmpegEncoder::new();
    let probe = FfprobeProbe::new();
    if !encoder.is_available() || !probe.is_available() {
        println!("[FAIL] ffmpeg and ffprobe must be installed and on PATH");
        return Ok(false);
    }

    let mut request = MergeRequest::new(&opts.input_dir, opts.title, opts.theme);
    if let Some(path) = output {
        request = request.with_output(path);
    }
    if let Some(author) = opts.author {
        request = request.with_author(author);
    }

    let mut assembler = TimelineAssembler::new(config)
        .with_probe(probe)
        .with_encoder(encoder);
    let report = assembler.run(&request);

    println!(
        "Inputs: {}  Segments: {}  Duration: {:.1}s",
        report.inputs,
        report.segments(),
        report.timeline.total_duration_secs()
    );
    if report.clips_skipped > 0 || report.cards_skipped > 0 {
        println!(
            "[WARN] Skipped {} clip(s) and {} card(s); see the log for details",
            report.clips_skipped, report.cards_skipped
        );
    }
    for issue in &report.cleanup.issues {
        println!("[WARN] {issue}");
    }

    println!("{}", "=".repeat(50));
    match (&report.output_path, &report.error) {
        (Some(path), _) if report.succeeded() => {
            println!("Merge complete: {}", path.display());
            Ok(true)
        }
        (_, error) => {
            println!(
                "Merge failed: {}",
                error.as_deref().unwrap_or("unknown error")
            );
            Ok(false)
        }
    }
}

/// Place the requested file name inside the input directory.
fn resolve_output(input_dir: &Path, requested: Option<&Path>) -> Option<PathBuf> {
    requested
        .and_then(|p| p.file_name())
        .map(|name| input_dir.join(name))
}
