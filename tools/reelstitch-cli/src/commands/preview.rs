//! Render the sample cards without touching any video.

use reelstitch_card_render::{CardRenderer, CardSpec, GlyphSource, Theme};
use reelstitch_common::config::AppConfig;

pub fn run(
    config: &AppConfig,
    theme: Theme,
    title: &str,
    author: Option<&str>,
) -> anyhow::Result<bool> {
    let glyphs = GlyphSource::from_candidates(&config.cards.font_candidates);
    match glyphs.resolved_path() {
        Some(path) => println!("Font: {}", path.display()),
        None => println!("Font: built-in bitmap (no system font found)"),
    }
    let renderer = CardRenderer::new(
        config.output.frame_size(),
        glyphs,
        config.cards.baseline_correction_px,
        ".",
    );

    let counter_secs = config.cards.counter_duration_secs;
    let mut intro = CardSpec::counter(1, counter_secs, theme).with_title(title);
    if let Some(author) = author {
        intro = intro.with_author(author);
    }
    let samples = [
        intro,
        CardSpec::counter(2, counter_secs, theme),
        CardSpec::closing(3, config.cards.closing_duration_secs, theme),
    ];

    println!("Rendering sample cards ({})", theme.display_name);
    let mut all_ok = true;
    for spec in &samples {
        match renderer.render(spec) {
            Ok(card) => println!(
                "[OK]   card {} -> {} ({} elements)",
                spec.index,
                card.path.display(),
                card.layout.elements.len()
            ),
            Err(e) => {
                all_ok = false;
                println!("[FAIL] card {}: {e}", spec.index);
            }
        }
    }
    Ok(all_ok)
}
