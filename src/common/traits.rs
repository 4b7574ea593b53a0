//! Common traits defining interfaces for trajectory optimization

use crate::common::error::ChompResult;
use crate::common::types::ObstacleSet;
use crate::path_planning::chomp::Trajectory;

/// Trait for local trajectory optimizers (CHOMP and friends)
pub trait TrajectoryOptimizer {
    /// Per-step diagnostics returned by the optimizer
    type Report;

    /// Advance the interior waypoints by one descent step
    fn step(&mut self, trajectory: &mut Trajectory, obstacles: &ObstacleSet)
        -> ChompResult<Self::Report>;
}

/// Scalar workspace potential of a single circular obstacle
///
/// Both methods take the distance from the obstacle center and the
/// obstacle radius. Implementations must return zero cost and zero
/// derivative outside their influence radius, and a cost that grows
/// toward the center.
pub trait WorkspacePotential {
    /// Distance from the center beyond which the potential vanishes
    fn influence_radius(&self, radius: f64) -> f64;

    /// Potential value
    fn cost(&self, distance: f64, radius: f64) -> f64;

    /// Derivative of the potential with respect to the distance
    fn cost_derivative(&self, distance: f64, radius: f64) -> f64;
}

/// Trait for visualizable state
pub trait Visualizable {
    /// Draw current state to visualizer
    fn visualize(&self, vis: &mut crate::utils::Visualizer);
}
