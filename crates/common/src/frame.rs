//! Output frame geometry.

use serde::{Deserialize, Serialize};

/// Pixel dimensions of the output video; every segment is normalized to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    /// Default vertical short-form target (9:16).
    pub const VERTICAL_720P: FrameSize = FrameSize {
        width: 720,
        height: 1280,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height.max(1) as f64
    }

    /// Both dimensions non-zero and even, as required for yuv420p output.
    pub fn is_encodable(&self) -> bool {
        self.width > 0 && self.height > 0 && self.width % 2 == 0 && self.height % 2 == 0
    }
}

impl Default for FrameSize {
    fn default() -> Self {
        Self::VERTICAL_720P
    }
}

impl std::fmt::Display for FrameSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_vertical_nine_by_sixteen() {
        let size = FrameSize::default();
        assert_eq!(size.to_string(), "720x1280");
        assert!((size.aspect_ratio() - 9.0 / 16.0).abs() < 1e-9);
    }

    #[test]
    fn odd_or_zero_sizes_are_not_encodable() {
        assert!(FrameSize::new(720, 1280).is_encodable());
        assert!(!FrameSize::new(721, 1280).is_encodable());
        assert!(!FrameSize::new(0, 1280).is_encodable());
    }
}
