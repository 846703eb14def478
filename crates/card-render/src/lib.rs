//! Reelstitch Card Renderer
//!
//! Synthesizes the still images placed between clips:
//! - **Themes:** fixed background/text color pairings
//! - **Glyphs:** font resolution with a built-in bitmap fallback
//! - **Cards:** numbered counter cards (with the intro title box and
//!   author credit on card 1) and the closing call-to-action card

mod builtin_font;
pub mod card;
pub mod glyph;
pub mod theme;

pub use card::*;
pub use glyph::*;
pub use theme::*;
