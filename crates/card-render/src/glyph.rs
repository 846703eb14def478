//! Font resolution and text measurement.
//!
//! [`GlyphSource`] tries an ordered list of font files and hands out
//! [`FontHandle`]s at the requested point size. When no candidate loads,
//! handles fall back to the built-in bitmap font; quality degrades but
//! rendering never fails because of a missing font.

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use ab_glyph::{point, Font, FontArc, FontVec, GlyphId, PxScale, ScaleFont};
use image::{Rgb, RgbImage};

use crate::builtin_font;

/// Ink bounding box of a piece of text.
///
/// `left`/`top` are the offsets of the ink box from the pen origin used by
/// [`FontHandle::draw`], so callers can place ink precisely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextExtent {
    pub width: u32,
    pub height: u32,
    pub left: i32,
    pub top: i32,
}

impl TextExtent {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A font at a fixed size, ready to measure and draw.
#[derive(Clone)]
pub struct FontHandle {
    face: Face,
    point_size: f32,
}

#[derive(Clone)]
enum Face {
    Outline { font: FontArc, scale: PxScale },
    Builtin { dot: u32 },
}

impl std::fmt::Debug for FontHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontHandle")
            .field("point_size", &self.point_size)
            .field("builtin", &self.is_builtin())
            .finish()
    }
}

impl FontHandle {
    fn outline(font: FontArc, point_size: f32) -> Self {
        let units_per_em = font.units_per_em().unwrap_or(1000.0);
        let scale = PxScale::from(point_size * font.height_unscaled() / units_per_em);
        Self {
            face: Face::Outline { font, scale },
            point_size,
        }
    }

    fn builtin(point_size: f32) -> Self {
        Self {
            face: Face::Builtin {
                dot: builtin_font::dot_size(point_size),
            },
            point_size,
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.face, Face::Builtin { .. })
    }

    /// Ink extent of `text`. Whitespace-only text has an empty extent.
    pub fn measure(&self, text: &str) -> TextExtent {
        match &self.face {
            Face::Builtin { dot } => {
                let (width, height) = builtin_font::measure(text, *dot);
                TextExtent {
                    width,
                    height,
                    left: 0,
                    top: 0,
                }
            }
            Face::Outline { font, scale } => outline_extent(font, *scale, text),
        }
    }

    /// Draw `text` so that its ink box starts at `(ink_x, ink_y)`.
    pub fn draw(&self, canvas: &mut RgbImage, ink_x: i32, ink_y: i32, text: &str, color: Rgb<u8>) {
        match &self.face {
            Face::Builtin { dot } => builtin_font::draw(canvas, ink_x, ink_y, text, *dot, color),
            Face::Outline { font, scale } => {
                let extent = outline_extent(font, *scale, text);
                imageproc::drawing::draw_text_mut(
                    canvas,
                    color,
                    ink_x - extent.left,
                    ink_y - extent.top,
                    *scale,
                    font,
                    text,
                );
            }
        }
    }
}

// Mirrors the glyph layout imageproc uses when drawing, so the measured box
// matches the pixels that end up on the canvas.
fn outline_extent(font: &FontArc, scale: PxScale, text: &str) -> TextExtent {
    let scaled = font.as_scaled(scale);
    let mut caret = 0f32;
    let mut last: Option<GlyphId> = None;
    let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
    let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);

    for c in text.chars() {
        let glyph_id = scaled.glyph_id(c);
        let glyph = glyph_id.with_scale_and_position(scale, point(caret, scaled.ascent()));
        caret += scaled.h_advance(glyph_id);
        if let Some(outlined) = font.outline_glyph(glyph) {
            if let Some(prev) = last {
                caret += scaled.kern(glyph_id, prev);
            }
            last = Some(glyph_id);
            let bounds = outlined.px_bounds();
            min_x = min_x.min(bounds.min.x);
            min_y = min_y.min(bounds.min.y);
            max_x = max_x.max(bounds.max.x);
            max_y = max_y.max(bounds.max.y);
        }
    }

    if last.is_none() {
        return TextExtent::default();
    }
    TextExtent {
        width: (max_x - min_x).round().max(0.0) as u32,
        height: (max_y - min_y).round().max(0.0) as u32,
        left: min_x.round() as i32,
        top: min_y.round() as i32,
    }
}

/// Platform-aware font provider.
pub struct GlyphSource {
    candidates: Vec<PathBuf>,
    resolved: OnceCell<Option<(PathBuf, FontArc)>>,
}

impl GlyphSource {
    /// Use `candidates` in order; the first that loads wins.
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self {
            candidates,
            resolved: OnceCell::new(),
        }
    }

    /// Candidates for the host operating system.
    pub fn platform_default() -> Self {
        Self::new(platform_font_candidates())
    }

    /// Configured candidates, or the platform defaults when none are set.
    pub fn from_candidates(configured: &[PathBuf]) -> Self {
        if configured.is_empty() {
            Self::platform_default()
        } else {
            Self::new(configured.to_vec())
        }
    }

    /// A source that always yields the built-in bitmap font.
    pub fn builtin_only() -> Self {
        Self::new(Vec::new())
    }

    /// Path of the outline font in use, if any candidate loaded.
    pub fn resolved_path(&self) -> Option<&Path> {
        self.resolve().as_ref().map(|(path, _)| path.as_path())
    }

    /// A renderable font at `point_size`. Never fails.
    pub fn get_font(&self, point_size: f32) -> FontHandle {
        match self.resolve() {
            Some((_, font)) => FontHandle::outline(font.clone(), point_size),
            None => FontHandle::builtin(point_size),
        }
    }

    fn resolve(&self) -> &Option<(PathBuf, FontArc)> {
        self.resolved.get_or_init(|| {
            for path in &self.candidates {
                match load_font(path) {
                    Ok(font) => {
                        tracing::debug!(path = %path.display(), "Loaded card font");
                        return Some((path.clone(), font));
                    }
                    Err(reason) => {
                        tracing::debug!(path = %path.display(), %reason, "Font candidate rejected");
                    }
                }
            }
            tracing::warn!(
                candidates = self.candidates.len(),
                "No candidate font could be loaded; using built-in bitmap font"
            );
            None
        })
    }
}

fn load_font(path: &Path) -> Result<FontArc, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    // Index 0 selects the first face of .ttc collections and is a no-op otherwise.
    let font = FontVec::try_from_vec_and_index(bytes, 0).map_err(|e| e.to_string())?;
    Ok(FontArc::new(font))
}

/// Ordered font files tried on the host operating system.
pub fn platform_font_candidates() -> Vec<PathBuf> {
    let paths: &[&str] = if cfg!(target_os = "windows") {
        &["C:\\Windows\\Fonts\\msyh.ttc", "C:\\Windows\\Fonts\\simhei.ttf"]
    } else if cfg!(target_os = "macos") {
        &[
            "/System/Library/Fonts/PingFang.ttc",
            "/System/Library/Fonts/Supplemental/STHeiti Medium.ttc",
            "/Library/Fonts/Microsoft/msyh.ttf",
            "msyh.ttf",
        ]
    } else {
        &[
            "/usr/share/fonts/truetype/msttcorefonts/msyh.ttf",
            "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "msyh.ttf",
        ]
    };
    paths.iter().map(PathBuf::from).collect()
}
