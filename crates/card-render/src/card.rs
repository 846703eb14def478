//! Transition and closing card rendering.
//!
//! A counter card shows the clip number inside a ring. Card 1 additionally
//! carries a dated title box above the ring and an author credit below it.
//! The closing card shows three call-to-action lines stacked in the middle
//! of the frame.

use std::path::PathBuf;

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use reelstitch_common::error::{StitchError, StitchResult};
use reelstitch_common::frame::FrameSize;

use crate::glyph::{FontHandle, GlyphSource, TextExtent};
use crate::theme::Theme;

const NUMERAL_PT: f32 = 80.0;
const RING_STROKE_PX: i32 = 5;
const RING_RADIUS_FACTOR: f32 = 0.8;

const AUTHOR_PT: f32 = 40.0;
const AUTHOR_GAP_PX: i32 = 320;

const TITLE_PT: f32 = 60.0;
const TITLE_PADDING_PX: i32 = 20;
const TITLE_BOX_STROKE_PX: i32 = 3;
const TITLE_BOX_GAP_PX: i32 = 320;

const CLOSING_PT: f32 = 80.0;
const CLOSING_BLOCK_MARGIN_PX: i32 = 100;
const CLOSING_LINE_GAP_PX: i32 = 50;

/// Call-to-action lines of the closing card, top to bottom.
pub const CLOSING_LINES: [&str; 3] = [
    "\u{2605} Like & Support \u{2605}",
    "\u{2606} Follow & Save \u{2606}",
    "\u{25C6} Share & Repost \u{25C6}",
];

/// Everything needed to render one card.
#[derive(Debug, Clone, PartialEq)]
pub struct CardSpec {
    /// 1-based card number.
    pub index: u32,
    pub duration_secs: f64,
    pub is_final: bool,
    /// Drawn in the title box of card 1.
    pub title: Option<String>,
    /// Drawn as `@author` under the ring of card 1.
    pub author: Option<String>,
    pub theme: Theme,
}

impl CardSpec {
    /// A numbered card shown before a clip.
    pub fn counter(index: u32, duration_secs: f64, theme: Theme) -> Self {
        Self {
            index,
            duration_secs,
            is_final: false,
            title: None,
            author: None,
            theme,
        }
    }

    /// The call-to-action card appended after the last clip.
    pub fn closing(index: u32, duration_secs: f64, theme: Theme) -> Self {
        Self {
            is_final: true,
            ..Self::counter(index, duration_secs, theme)
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Whether the title box and author credit belong on this card.
    ///
    /// Keyed on the card number alone: whichever input sorts first gets them.
    pub fn is_intro(&self) -> bool {
        !self.is_final && self.index == 1
    }

    /// File name of the persisted image.
    pub fn file_name(&self) -> String {
        format!("transition_{}.png", self.index)
    }

    pub fn validate(&self) -> StitchResult<()> {
        if self.index == 0 {
            return Err(StitchError::card_render("card index must be at least 1"));
        }
        if !(self.duration_secs.is_finite() && self.duration_secs > 0.0) {
            return Err(StitchError::card_render(format!(
                "card {} has non-positive duration {}",
                self.index, self.duration_secs
            )));
        }
        Ok(())
    }
}

/// Pixel rectangle of a drawn element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl ElementRect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    /// Horizontal center, doubled to stay integral.
    pub fn center_x2(&self) -> i32 {
        2 * self.x + self.width as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Ring,
    Numeral,
    TitleBox,
    Date,
    Title,
    Author,
    ClosingLine,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardElement {
    pub kind: ElementKind,
    pub text: Option<String>,
    pub bounds: ElementRect,
}

/// Record of what was drawn where.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardLayout {
    pub elements: Vec<CardElement>,
}

impl CardLayout {
    fn push(&mut self, kind: ElementKind, text: Option<&str>, bounds: ElementRect) {
        self.elements.push(CardElement {
            kind,
            text: text.map(str::to_string),
            bounds,
        });
    }

    pub fn count(&self, kind: ElementKind) -> usize {
        self.elements.iter().filter(|e| e.kind == kind).count()
    }

    pub fn find(&self, kind: ElementKind) -> Option<&CardElement> {
        self.elements.iter().find(|e| e.kind == kind)
    }

    pub fn of_kind(&self, kind: ElementKind) -> impl Iterator<Item = &CardElement> {
        self.elements.iter().filter(move |e| e.kind == kind)
    }
}

/// A card image that has been written to disk.
#[derive(Debug, Clone)]
pub struct RenderedCard {
    pub index: u32,
    pub image: RgbImage,
    /// Transient file; whoever receives the card owns its removal.
    pub path: PathBuf,
    pub layout: CardLayout,
}

/// Draws cards onto a fixed-size canvas and saves them as PNG.
pub struct CardRenderer {
    frame: FrameSize,
    glyphs: GlyphSource,
    correction_px: i32,
    out_dir: PathBuf,
    date_label: Option<String>,
}

impl CardRenderer {
    /// `correction_px` shifts the ring center vertically to compensate for
    /// baseline differences between font rasterizers.
    pub fn new(
        frame: FrameSize,
        glyphs: GlyphSource,
        correction_px: i32,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            frame,
            glyphs,
            correction_px,
            out_dir: out_dir.into(),
            date_label: None,
        }
    }

    /// Use a fixed date label instead of today's `MM-DD`.
    pub fn with_date_label(mut self, label: impl Into<String>) -> Self {
        self.date_label = Some(label.into());
        self
    }

    /// Path the card for `spec` is written to.
    pub fn card_path(&self, spec: &CardSpec) -> PathBuf {
        self.out_dir.join(spec.file_name())
    }

    /// Render and save one card.
    pub fn render(&self, spec: &CardSpec) -> StitchResult<RenderedCard> {
        match self.try_render(spec) {
            Ok(card) => {
                tracing::debug!(
                    index = spec.index,
                    is_final = spec.is_final,
                    path = %card.path.display(),
                    "Rendered card"
                );
                Ok(card)
            }
            Err(e) => {
                tracing::error!(index = spec.index, error = %e, "Failed to render card");
                Err(e)
            }
        }
    }

    fn try_render(&self, spec: &CardSpec) -> StitchResult<RenderedCard> {
        spec.validate()?;
        if self.frame.width == 0 || self.frame.height == 0 {
            return Err(StitchError::card_render(format!(
                "canvas size {} is empty",
                self.frame
            )));
        }

        let mut canvas =
            RgbImage::from_pixel(self.frame.width, self.frame.height, spec.theme.background);
        let mut layout = CardLayout::default();
        let ink = spec.theme.text;

        if spec.is_final {
            self.draw_closing(&mut canvas, &mut layout, ink)?;
        } else {
            self.draw_counter(&mut canvas, &mut layout, spec, ink)?;
        }

        std::fs::create_dir_all(&self.out_dir).map_err(|e| {
            StitchError::card_render(format!("cannot create {}: {e}", self.out_dir.display()))
        })?;
        let path = self.card_path(spec);
        canvas
            .save(&path)
            .map_err(|e| StitchError::card_render(format!("cannot save {}: {e}", path.display())))?;

        Ok(RenderedCard {
            index: spec.index,
            image: canvas,
            path,
            layout,
        })
    }

    fn draw_counter(
        &self,
        canvas: &mut RgbImage,
        layout: &mut CardLayout,
        spec: &CardSpec,
        ink: Rgb<u8>,
    ) -> StitchResult<()> {
        let font = self.glyphs.get_font(NUMERAL_PT);
        let numeral = spec.index.to_string();
        let extent = font.measure(&numeral);
        if extent.is_empty() {
            return Err(StitchError::card_render(format!(
                "font produced no glyphs for numeral {numeral}"
            )));
        }

        let radius =
            (extent.width.max(extent.height) as f32 * RING_RADIUS_FACTOR).round() as i32;
        let cx = self.frame.width as i32 / 2;
        let cy = self.frame.height as i32 / 2 + self.correction_px;

        // Stroke grows inward from the outer radius.
        for r in (radius - RING_STROKE_PX + 1).max(1)..=radius {
            draw_hollow_circle_mut(canvas, (cx, cy), r, ink);
        }
        let diameter = (2 * radius + 1) as u32;
        layout.push(
            ElementKind::Ring,
            None,
            ElementRect::new(cx - radius, cy - radius, diameter, diameter),
        );

        let numeral_rect = centered_rect(cx, cy - extent.height as i32 / 2, extent);
        font.draw(canvas, numeral_rect.x, numeral_rect.y, &numeral, ink);
        layout.push(ElementKind::Numeral, Some(numeral.as_str()), numeral_rect);

        if !spec.is_intro() {
            return Ok(());
        }

        if let Some(author) = spec.author.as_deref().filter(|a| !a.is_empty()) {
            let credit = format!("@{author}");
            let font = self.glyphs.get_font(AUTHOR_PT);
            let top = cy + radius + AUTHOR_GAP_PX;
            let rect = draw_centered_line(canvas, &font, cx, top, &credit, ink);
            layout.push(ElementKind::Author, Some(credit.as_str()), rect);
        }

        self.draw_title_box(canvas, layout, spec, cx, cy - radius - TITLE_BOX_GAP_PX, ink);
        Ok(())
    }

    fn draw_title_box(
        &self,
        canvas: &mut RgbImage,
        layout: &mut CardLayout,
        spec: &CardSpec,
        cx: i32,
        box_top: i32,
        ink: Rgb<u8>,
    ) {
        let font = self.glyphs.get_font(TITLE_PT);
        let date = self
            .date_label
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%m-%d").to_string());
        let title = spec.title.as_deref().unwrap_or("");

        let date_extent = font.measure(&date);
        let title_extent = font.measure(title);
        let box_w = date_extent.width.max(title_extent.width) as i32 + 2 * TITLE_PADDING_PX;
        let box_h =
            date_extent.height as i32 + title_extent.height as i32 + 3 * TITLE_PADDING_PX;
        let box_rect = ElementRect::new(cx - box_w / 2, box_top, box_w as u32, box_h as u32);

        for k in 0..TITLE_BOX_STROKE_PX {
            let w = box_w - 2 * k;
            let h = box_h - 2 * k;
            if w <= 0 || h <= 0 {
                break;
            }
            draw_hollow_rect_mut(
                canvas,
                Rect::at(box_rect.x + k, box_rect.y + k).of_size(w as u32, h as u32),
                ink,
            );
        }
        layout.push(ElementKind::TitleBox, None, box_rect);

        let date_top = box_top + TITLE_PADDING_PX;
        let date_rect = draw_centered_line(canvas, &font, cx, date_top, &date, ink);
        layout.push(ElementKind::Date, Some(date.as_str()), date_rect);

        if !title_extent.is_empty() {
            let title_top = date_top + date_extent.height as i32 + TITLE_PADDING_PX;
            let title_rect = draw_centered_line(canvas, &font, cx, title_top, title, ink);
            layout.push(ElementKind::Title, Some(title), title_rect);
        }
    }

    fn draw_closing(
        &self,
        canvas: &mut RgbImage,
        layout: &mut CardLayout,
        ink: Rgb<u8>,
    ) -> StitchResult<()> {
        let font = self.glyphs.get_font(CLOSING_PT);
        let extents: Vec<TextExtent> = CLOSING_LINES.iter().map(|l| font.measure(l)).collect();
        if extents.iter().any(TextExtent::is_empty) {
            return Err(StitchError::card_render(
                "font produced no glyphs for a closing line",
            ));
        }

        let total: i32 = extents.iter().map(|e| e.height as i32).sum();
        let cx = self.frame.width as i32 / 2;
        let mut top = (self.frame.height as i32 - total - CLOSING_BLOCK_MARGIN_PX) / 2;
        for (line, extent) in CLOSING_LINES.into_iter().zip(&extents) {
            let rect = draw_centered_line(canvas, &font, cx, top, line, ink);
            layout.push(ElementKind::ClosingLine, Some(line), rect);
            top += extent.height as i32 + CLOSING_LINE_GAP_PX;
        }
        Ok(())
    }
}

fn centered_rect(cx: i32, top: i32, extent: TextExtent) -> ElementRect {
    ElementRect::new(
        cx - extent.width as i32 / 2,
        top,
        extent.width,
        extent.height,
    )
}

fn draw_centered_line(
    canvas: &mut RgbImage,
    font: &FontHandle,
    cx: i32,
    top: i32,
    text: &str,
    ink: Rgb<u8>,
) -> ElementRect {
    let rect = centered_rect(cx, top, font.measure(text));
    font.draw(canvas, rect.x, rect.y, text, ink);
    rect
}
