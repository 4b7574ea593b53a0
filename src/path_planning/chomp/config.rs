//! Optimizer parameters

use crate::common::{ChompError, ChompResult};
use super::obstacle_cost::{ObstacleGradientMode, ObstaclePotential};

/// Configuration for the CHOMP optimizer
#[derive(Debug, Clone, PartialEq)]
pub struct ChompConfig {
    /// Step regularizer; each update moves by `(1/eta) · A⁻¹ g`
    pub eta: f64,
    /// Weight of the obstacle gradient relative to smoothness
    pub lambda: f64,
    /// Obstacle potential shape and safety margin
    pub potential: ObstaclePotential,
    /// Pointwise or functional obstacle gradient
    pub gradient_mode: ObstacleGradientMode,
    /// Iteration cap for [`super::ChompOptimizer::optimize`]
    pub max_iterations: usize,
    /// Stop `optimize` once the update norm drops below this (0 disables)
    pub tolerance: f64,
}

impl Default for ChompConfig {
    fn default() -> Self {
        Self {
            eta: 100.0,
            lambda: 1.0,
            potential: ObstaclePotential::default(),
            gradient_mode: ObstacleGradientMode::Pointwise,
            max_iterations: 500,
            tolerance: 1e-6,
        }
    }
}

impl ChompConfig {
    pub fn with_eta(mut self, eta: f64) -> Self {
        self.eta = eta;
        self
    }

    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    pub fn with_potential(mut self, potential: ObstaclePotential) -> Self {
        self.potential = potential;
        self
    }

    pub fn with_gradient_mode(mut self, mode: ObstacleGradientMode) -> Self {
        self.gradient_mode = mode;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn validate(&self) -> ChompResult<()> {
        if !(self.eta.is_finite() && self.eta > 0.0) {
            return Err(ChompError::InvalidParameter(format!("eta must be positive, got {}", self.eta)));
        }
        if !(self.lambda.is_finite() && self.lambda >= 0.0) {
            return Err(ChompError::InvalidParameter(format!(
                "lambda must be non-negative, got {}",
                self.lambda
            )));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(ChompError::InvalidParameter(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        self.potential.validate()
    }
}
