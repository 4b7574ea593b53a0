//! CHOMP (Covariant Hamiltonian Optimization for Motion Planning)
//!
//! Local trajectory optimizer for a point robot in the plane. The path is
//! discretized into `nq` interior waypoints between a fixed start and goal;
//! each step descends a smoothness plus obstacle cost along the covariant
//! gradient, i.e. the raw gradient preconditioned by the inverse of the
//! finite-difference metric, so updates spread smoothly along the path.
//!
//! Reference: Ratliff, N., Zucker, M., Bagnell, J. A., & Srinivasa, S. (2009).
//! "CHOMP: Gradient Optimization Techniques for Efficient Motion Planning"

pub mod config;
pub mod obstacle_cost;
pub mod optimizer;
pub mod smoothness;
pub mod trajectory;

pub use config::ChompConfig;
pub use obstacle_cost::{
    functional_term, obstacle_cost, pointwise_term, ObstacleGradientMode, ObstaclePotential,
    ObstacleTerm, PotentialShape, VelocityScheme,
};
pub use optimizer::{run_chomp, ChompOptimizer, OptimizeReport, StepReport};
pub use smoothness::{MetricCache, SmoothnessMetric};
pub use trajectory::{Configuration, Trajectory};
