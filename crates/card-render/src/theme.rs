//! Card color themes.
//!
//! Six fixed background/text pairings selectable by id (`p1`..`p6`).
//! Unknown ids resolve to `p6`.

use std::fmt;
use std::str::FromStr;

use image::Rgb;
use serde::{Deserialize, Serialize};

/// Identifier of a built-in theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeId {
    P1,
    P2,
    P3,
    P4,
    P5,
    P6,
}

impl ThemeId {
    pub const ALL: [ThemeId; 6] = [
        ThemeId::P1,
        ThemeId::P2,
        ThemeId::P3,
        ThemeId::P4,
        ThemeId::P5,
        ThemeId::P6,
    ];

    /// Theme used when an id is not recognized.
    pub const FALLBACK: ThemeId = ThemeId::P6;

    pub fn as_str(self) -> &'static str {
        match self {
            ThemeId::P1 => "p1",
            ThemeId::P2 => "p2",
            ThemeId::P3 => "p3",
            ThemeId::P4 => "p4",
            ThemeId::P5 => "p5",
            ThemeId::P6 => "p6",
        }
    }
}

impl fmt::Display for ThemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ThemeId::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown theme '{s}' (expected one of p1..p6)"))
    }
}

/// Resolved theme colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub id: ThemeId,
    pub background: Rgb<u8>,
    pub text: Rgb<u8>,
    pub display_name: &'static str,
}

/// Static theme table.
pub struct ThemeCatalog;

impl ThemeCatalog {
    /// Look up a theme by id string, falling back to `p6`.
    pub fn lookup(id: &str) -> Theme {
        match id.parse::<ThemeId>() {
            Ok(id) => Self::get(id),
            Err(_) => {
                tracing::debug!(requested = id, fallback = %ThemeId::FALLBACK, "Unknown theme id");
                Self::get(ThemeId::FALLBACK)
            }
        }
    }

    pub fn get(id: ThemeId) -> Theme {
        let (background, text, display_name) = match id {
            ThemeId::P1 => (0xFFFFFF, 0x333333, "Classic Light"),
            ThemeId::P2 => (0xF5F5F5, 0x2C3E50, "Soft Gray"),
            ThemeId::P3 => (0xFFF8F0, 0x8B4513, "Warm"),
            ThemeId::P4 => (0xF0F8FF, 0x1B4F72, "Cool"),
            ThemeId::P5 => (0x333333, 0xFFFFFF, "Modern Charcoal"),
            ThemeId::P6 => (0x000000, 0xFFFFFF, "Classic Dark"),
        };
        Theme {
            id,
            background: hex_rgb(background),
            text: hex_rgb(text),
            display_name,
        }
    }

    pub fn all() -> impl Iterator<Item = Theme> {
        ThemeId::ALL.into_iter().map(Self::get)
    }
}

fn hex_rgb(value: u32) -> Rgb<u8> {
    Rgb([(value >> 16) as u8, (value >> 8) as u8, value as u8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_ids_resolve_to_exact_colors() {
        let warm = ThemeCatalog::lookup("p3");
        assert_eq!(warm.id, ThemeId::P3);
        assert_eq!(warm.background, Rgb([0xFF, 0xF8, 0xF0]));
        assert_eq!(warm.text, Rgb([0x8B, 0x45, 0x13]));
        assert_eq!(warm.display_name, "Warm");

        let charcoal = ThemeCatalog::lookup("p5");
        assert_eq!(charcoal.background, Rgb([0x33, 0x33, 0x33]));
        assert_eq!(charcoal.text, Rgb([0xFF, 0xFF, 0xFF]));
    }

    #[test]
    fn every_id_round_trips_through_lookup() {
        for id in ThemeId::ALL {
            assert_eq!(ThemeCatalog::lookup(id.as_str()), ThemeCatalog::get(id));
        }
        assert_eq!(ThemeCatalog::all().count(), 6);
    }

    #[test]
    fn unknown_id_falls_back_to_black_and_white() {
        let theme = ThemeCatalog::lookup("neon");
        assert_eq!(theme.id, ThemeId::P6);
        assert_eq!(theme.background, Rgb([0, 0, 0]));
        assert_eq!(theme.text, Rgb([255, 255, 255]));
    }

    proptest! {
        #[test]
        fn lookup_is_total_and_deterministic(id in ".{0,12}") {
            let first = ThemeCatalog::lookup(&id);
            let second = ThemeCatalog::lookup(&id);
            prop_assert_eq!(first, second);
            if id.trim().parse::<ThemeId>().is_err() {
                prop_assert_eq!(first.id, ThemeId::P6);
            }
        }
    }
}
