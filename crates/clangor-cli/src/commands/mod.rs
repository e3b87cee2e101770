//! CLI command implementations.

pub mod matrix;
pub mod presets;
pub mod render;
