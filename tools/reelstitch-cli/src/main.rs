//! Reelstitch CLI: merge a folder of short clips into one vertical video.
//!
//! Usage:
//!   reelstitch [-i DIR] [-o NAME] [-t TITLE] [-a AUTHOR] [-c p1..p6]
//!   reelstitch --test            Render the sample cards only

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use reelstitch_card_render::{ThemeCatalog, ThemeId};
use reelstitch_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "reelstitch",
    about = "Stitch short clips into one vertical video with numbered transition cards",
    version,
    author
)]
struct Cli {
    /// Directory holding the .mp4/.mov clips (created if missing)
    #[arg(short, long, default_value = "./downloads")]
    input_dir: PathBuf,

    /// Output file name; the file is always written inside the input directory
    #[arg(short, long)]
    output_path: Option<PathBuf>,

    /// Title shown on the first card
    #[arg(short, long)]
    title: Option<String>,

    /// Author credit shown on the first card
    #[arg(short, long)]
    author: Option<String>,

    #[arg(short = 'c', long, value_name = "THEME", help = theme_help())]
    color_scheme: Option<ThemeId>,

    /// Render the three sample cards into the current directory and exit
    #[arg(long)]
    test: bool,

    /// Configuration file (defaults to the user config location)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log file path
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn theme_help() -> String {
    let names: Vec<String> = ThemeCatalog::all()
        .map(|t| format!("{} = {}", t.id, t.display_name))
        .collect();
    format!("Card color theme ({})", names.join(", "))
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if let Some(file) = &cli.log_file {
        config.logging.file = Some(file.clone());
    }
    reelstitch_common::logging::init_logging(&config.logging);
    tracing::debug!(test_mode = cli.test, input_dir = %cli.input_dir.display(), "Starting reelstitch");

    let theme = match cli.color_scheme {
        Some(id) => ThemeCatalog::get(id),
        None => ThemeCatalog::lookup(&config.cards.default_theme),
    };
    let title = cli
        .title
        .unwrap_or_else(|| config.cards.default_title.clone());
    let author = cli
        .author
        .or_else(|| Some(config.cards.default_author.clone()))
        .filter(|a| !a.trim().is_empty());

    let succeeded = if cli.test {
        commands::preview::run(&config, theme, &title, author.as_deref())?
    } else {
        commands::merge::run(
            config,
            commands::merge::MergeOptions {
                input_dir: cli.input_dir,
                output_name: cli.output_path,
                title,
                author,
                theme,
            },
        )?
    };

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
