//! Utility modules for rust_chomp

pub mod visualization;

pub use visualization::{circle_outline, colors, PathStyle, PointStyle, Visualizer};
