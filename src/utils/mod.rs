//! Cross-platform helpers shared across the engine.

pub mod archive;
pub mod platform;
