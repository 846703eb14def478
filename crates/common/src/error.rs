//! Error types shared across Reelstitch crates.

use std::path::PathBuf;

/// Top-level error type for Reelstitch operations.
///
/// Per-item failures (`CardRender`, `ClipDecode`, `MissingAsset`) are
/// contained by the assembler; the remaining variants abort a run.
#[derive(Debug, thiserror::Error)]
pub enum StitchError {
    #[error("No input clips: {message}")]
    NoInput { message: String },

    #[error("Card render error: {message}")]
    CardRender { message: String },

    #[error("Clip decode error: {message}")]
    ClipDecode { message: String },

    #[error("Missing asset: {path}")]
    MissingAsset { path: PathBuf },

    #[error("No content: {message}")]
    NoContent { message: String },

    #[error("Encode error: {message}")]
    Encode { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using StitchError.
pub type StitchResult<T> = Result<T, StitchError>;

impl StitchError {
    pub fn no_input(msg: impl Into<String>) -> Self {
        Self::NoInput {
            message: msg.into(),
        }
    }

    pub fn card_render(msg: impl Into<String>) -> Self {
        Self::CardRender {
            message: msg.into(),
        }
    }

    pub fn clip_decode(msg: impl Into<String>) -> Self {
        Self::ClipDecode {
            message: msg.into(),
        }
    }

    pub fn missing_asset(path: impl Into<PathBuf>) -> Self {
        Self::MissingAsset { path: path.into() }
    }

    pub fn no_content(msg: impl Into<String>) -> Self {
        Self::NoContent {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether the error concerns a single card, clip, or asset and the run
    /// may continue without it.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::CardRender { .. } | Self::ClipDecode { .. } | Self::MissingAsset { .. }
        )
    }
}
