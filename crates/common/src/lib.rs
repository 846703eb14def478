//! Reelstitch Common Utilities
//!
//! Shared infrastructure for all Reelstitch crates:
//! - Error types and result aliases
//! - Frame geometry shared by the renderer and the compose engine
//! - Tracing/logging initialization
//! - Configuration loading

pub mod config;
pub mod error;
pub mod frame;
pub mod logging;

pub use config::*;
pub use error::*;
pub use frame::*;
