pub mod merge;
pub mod preview;
