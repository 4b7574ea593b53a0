//! RustChomp - covariant trajectory optimization for a planar point robot
//!
//! This crate implements CHOMP: a discretized trajectory between a fixed
//! start and goal is refined step by step by covariant gradient descent on
//! a smoothness plus obstacle cost. An interactive session layer drives the
//! optimizer once per tick and lets circular obstacles be added or dragged
//! between steps.

// Core modules
pub mod common;
pub mod utils;

// Algorithm modules
pub mod path_planning;
pub mod mission_planning;

// Re-export common types for convenience
pub use common::{CircleObstacle, ObstacleSet, Path2D, Point2D};
pub use common::{TrajectoryOptimizer, Visualizable, WorkspacePotential};
pub use common::{ChompError, ChompResult};
pub use path_planning::chomp::{run_chomp, ChompConfig, ChompOptimizer, Trajectory};
