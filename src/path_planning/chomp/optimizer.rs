//! Covariant gradient descent step
//!
//! One call computes `g = ∇_smooth + λ ∇_obstacle`, solves `A Δξ = g` with
//! the cached Cholesky factor of the smoothness metric and applies
//! `ξ ← ξ − Δξ / η`. Start and goal are never written.

use std::sync::{Arc, Mutex, OnceLock};

use log::debug;
use nalgebra::DVector;

use crate::common::{ChompError, ChompResult, ObstacleSet, TrajectoryOptimizer};
use super::config::ChompConfig;
use super::obstacle_cost::{functional_term, pointwise_term, ObstacleGradientMode, ObstacleTerm};
use super::smoothness::{MetricCache, SmoothnessMetric};
use super::trajectory::Trajectory;

/// Diagnostics of a single update, costs evaluated before the update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Zero-based index of this step within the optimizer's lifetime
    pub iteration: usize,
    pub smoothness_cost: f64,
    pub obstacle_cost: f64,
    /// `smoothness_cost + lambda * obstacle_cost`
    pub total_cost: f64,
    /// Norm of the applied update `Δξ / η`
    pub step_norm: f64,
}

/// Outcome of a bounded run of [`ChompOptimizer::optimize`]
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeReport {
    pub iterations: usize,
    pub converged: bool,
    pub last_step: Option<StepReport>,
}

/// CHOMP optimizer
///
/// Holds only its parameters, a step counter and the smoothness metrics
/// memoized per `(nq, cdim)`. Obstacles are passed in fresh on every call.
#[derive(Debug)]
pub struct ChompOptimizer {
    config: ChompConfig,
    metrics: MetricCache,
    iterations: usize,
}

impl ChompOptimizer {
    pub fn new(config: ChompConfig) -> ChompResult<Self> {
        config.validate()?;
        Ok(ChompOptimizer {
            config,
            metrics: MetricCache::new(),
            iterations: 0,
        })
    }

    pub fn config(&self) -> &ChompConfig {
        &self.config
    }

    /// Number of steps taken so far
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Smoothness metric for `(nq, cdim)`, built on first use
    pub fn metric(&mut self, nq: usize, cdim: usize) -> ChompResult<Arc<SmoothnessMetric>> {
        self.metrics.get_or_build(nq, cdim)
    }

    /// One covariant descent step on raw vectors
    pub fn step_raw(
        &mut self,
        start: &DVector<f64>,
        goal: &DVector<f64>,
        xi: &mut DVector<f64>,
        obstacles: &ObstacleSet,
    ) -> ChompResult<StepReport> {
        let (nq, cdim) = validate_shapes(start, goal, xi, obstacles)?;
        let metric = self.metrics.get_or_build(nq, cdim)?;
        let report = descend(&self.config, &metric, self.iterations, start, goal, xi, obstacles)?;
        self.iterations += 1;
        Ok(report)
    }

    /// Step until the update norm falls below the tolerance or the
    /// iteration cap is reached
    pub fn optimize(&mut self, trajectory: &mut Trajectory, obstacles: &ObstacleSet) -> ChompResult<OptimizeReport> {
        let mut last_step = None;
        for k in 0..self.config.max_iterations {
            let report = self.step(trajectory, obstacles)?;
            last_step = Some(report);
            if self.config.tolerance > 0.0 && report.step_norm < self.config.tolerance {
                debug!("chomp converged after {} iterations (step {:.3e})", k + 1, report.step_norm);
                return Ok(OptimizeReport { iterations: k + 1, converged: true, last_step });
            }
        }
        Ok(OptimizeReport {
            iterations: self.config.max_iterations,
            converged: false,
            last_step,
        })
    }
}

impl TrajectoryOptimizer for ChompOptimizer {
    type Report = StepReport;

    fn step(&mut self, trajectory: &mut Trajectory, obstacles: &ObstacleSet) -> ChompResult<StepReport> {
        let (start, goal, xi) = trajectory.parts_mut();
        self.step_raw(start, goal, xi, obstacles)
    }
}

/// One CHOMP step with default parameters
///
/// Mutates `xi` in place. Metrics are memoized process-wide per
/// `(nq, cdim)` and shared read-only.
pub fn run_chomp(
    start: &DVector<f64>,
    goal: &DVector<f64>,
    xi: &mut DVector<f64>,
    obstacles: &ObstacleSet,
) -> ChompResult<StepReport> {
    static SHARED_METRICS: OnceLock<Mutex<MetricCache>> = OnceLock::new();

    let (nq, cdim) = validate_shapes(start, goal, xi, obstacles)?;
    let metric = {
        let mut cache = SHARED_METRICS
            .get_or_init(|| Mutex::new(MetricCache::new()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.get_or_build(nq, cdim)?
    };
    descend(&ChompConfig::default(), &metric, 0, start, goal, xi, obstacles)
}

/// Returns `(nq, cdim)`; rejects an empty trajectory before any gradient work
fn validate_shapes(
    start: &DVector<f64>,
    goal: &DVector<f64>,
    xi: &DVector<f64>,
    obstacles: &ObstacleSet,
) -> ChompResult<(usize, usize)> {
    let cdim = start.len();
    if cdim == 0 {
        return Err(ChompError::InvalidParameter(
            "configuration dimension must be positive".to_string(),
        ));
    }
    if goal.len() != cdim {
        return Err(ChompError::dimension("goal", cdim, goal.len()));
    }
    if xi.len() % cdim != 0 {
        return Err(ChompError::dimension("trajectory", (xi.len() / cdim) * cdim, xi.len()));
    }
    let nq = xi.len() / cdim;
    if nq == 0 {
        return Err(ChompError::SingularMetricError { nq });
    }
    if !obstacles.is_empty() && cdim < 2 {
        return Err(ChompError::dimension("configuration", 2, cdim));
    }
    Ok((nq, cdim))
}

fn descend(
    config: &ChompConfig,
    metric: &SmoothnessMetric,
    iteration: usize,
    start: &DVector<f64>,
    goal: &DVector<f64>,
    xi: &mut DVector<f64>,
    obstacles: &ObstacleSet,
) -> ChompResult<StepReport> {
    let smoothness_cost = metric.cost(start, goal, xi)?;
    let smooth_gradient = metric.gradient(start, goal, xi)?;

    let ObstacleTerm { cost: obstacle_cost, gradient: obstacle_gradient } = match config.gradient_mode {
        ObstacleGradientMode::Pointwise => pointwise_term(&config.potential, xi, metric.cdim(), obstacles)?,
        ObstacleGradientMode::Functional(scheme) => {
            functional_term(&config.potential, scheme, start, goal, xi, obstacles)?
        }
    };

    let gradient = smooth_gradient + obstacle_gradient * config.lambda;
    let delta = metric.solve(&gradient)? / config.eta;
    *xi -= &delta;

    let report = StepReport {
        iteration,
        smoothness_cost,
        obstacle_cost,
        total_cost: smoothness_cost + config.lambda * obstacle_cost,
        step_norm: delta.norm(),
    };
    debug!(
        "chomp iter {}: smooth {:.4} obstacle {:.4} step {:.3e}",
        report.iteration, report.smoothness_cost, report.obstacle_cost, report.step_norm
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_planning::chomp::{ObstaclePotential, VelocityScheme};

    fn config(x: f64, y: f64) -> DVector<f64> {
        DVector::from_vec(vec![x, y])
    }

    /// Straight line with waypoints alternately shifted ±amp across it
    fn zigzag(start: &DVector<f64>, goal: &DVector<f64>, nq: usize, amp: f64) -> Trajectory {
        let mut traj = Trajectory::straight_line(start, goal, nq).unwrap();
        for i in 0..nq {
            let mut q = traj.get_waypoint(i).unwrap();
            let s = if i % 2 == 0 { amp } else { -amp };
            q[0] += s;
            q[1] -= s;
            traj.set_waypoint(i, &q).unwrap();
        }
        traj
    }

    fn mean_squared_gap(traj: &Trajectory) -> f64 {
        let points = traj.waypoint_positions();
        let total: f64 = points
            .windows(2)
            .map(|w| (w[1].x - w[0].x).powi(2) + (w[1].y - w[0].y).powi(2))
            .sum();
        total / (points.len() - 1) as f64
    }

    fn scenario_obstacles() -> ObstacleSet {
        ObstacleSet::from_circles(&[(3.0, 0.0, 2.0), (0.0, 3.0, 2.0)]).unwrap()
    }

    #[test]
    fn test_concrete_scenario_single_step() {
        let start = config(-5.0, -5.0);
        let goal = config(7.0, 7.0);
        let obstacles = scenario_obstacles();
        let mut traj = zigzag(&start, &goal, 20, 1.0);
        let before = traj.clone();

        let mut optimizer = ChompOptimizer::new(ChompConfig::default()).unwrap();
        optimizer.step(&mut traj, &obstacles).unwrap();

        assert_eq!(traj.xi().len(), 40);
        assert!(traj.xi().iter().all(|v| v.is_finite()));
        for i in 0..20 {
            assert_ne!(traj.get_waypoint(i).unwrap(), before.get_waypoint(i).unwrap());
        }
        assert!(mean_squared_gap(&traj) <= mean_squared_gap(&before));
        assert!(traj.smoothness_cost() < before.smoothness_cost());
    }

    #[test]
    fn test_straight_line_clear_of_obstacles_is_stationary() {
        // the segment passes 3/sqrt(2) from both centers, outside their radius
        let start = config(-5.0, -5.0);
        let goal = config(7.0, 7.0);
        let mut traj = Trajectory::straight_line(&start, &goal, 20).unwrap();
        let before = traj.xi().clone();

        let mut optimizer = ChompOptimizer::new(ChompConfig::default()).unwrap();
        let report = optimizer.step(&mut traj, &scenario_obstacles()).unwrap();

        assert_eq!(report.obstacle_cost, 0.0);
        assert!(report.step_norm < 1e-12);
        assert!((traj.xi() - before).norm() < 1e-12);
    }

    #[test]
    fn test_endpoints_are_never_written() {
        let start = config(-5.0, -5.0);
        let goal = config(7.0, 7.0);
        let obstacles = scenario_obstacles();
        let mut traj = zigzag(&start, &goal, 20, 1.0);

        let mut optimizer = ChompOptimizer::new(ChompConfig::default()).unwrap();
        for _ in 0..100 {
            optimizer.step(&mut traj, &obstacles).unwrap();
        }
        assert_eq!(traj.start(), &start);
        assert_eq!(traj.goal(), &goal);
        assert_eq!(optimizer.iterations(), 100);
    }

    #[test]
    fn test_monotone_descent_without_obstacles() {
        let start = config(-5.0, -5.0);
        let goal = config(7.0, 7.0);
        let mut traj = zigzag(&start, &goal, 20, 1.0);
        let empty = ObstacleSet::new();

        let mut optimizer = ChompOptimizer::new(ChompConfig::default()).unwrap();
        let mut previous = traj.smoothness_cost();
        for _ in 0..50 {
            optimizer.step(&mut traj, &empty).unwrap();
            let cost = traj.smoothness_cost();
            assert!(cost < previous, "cost went from {} to {}", previous, cost);
            previous = cost;
        }
    }

    #[test]
    fn test_converges_to_straight_line() {
        let start = config(-5.0, -5.0);
        let goal = config(7.0, 7.0);
        let mut traj = zigzag(&start, &goal, 20, 1.0);
        let line = Trajectory::straight_line(&start, &goal, 20).unwrap();

        let mut optimizer = ChompOptimizer::new(ChompConfig::default().with_eta(10.0)).unwrap();
        for _ in 0..300 {
            optimizer.step(&mut traj, &ObstacleSet::new()).unwrap();
        }
        assert!((traj.xi() - line.xi()).amax() < 1e-9);
    }

    fn assert_repelled(mode: ObstacleGradientMode) {
        let start = config(-5.0, 0.0);
        let goal = config(5.0, 0.0);
        let obstacles = ObstacleSet::from_circles(&[(0.0, -0.5, 2.0)]).unwrap();
        let mut traj = Trajectory::straight_line(&start, &goal, 20).unwrap();

        let cfg = ChompConfig::default()
            .with_lambda(10.0)
            .with_potential(ObstaclePotential::cubic(10.0, 1.0))
            .with_gradient_mode(mode);
        let mut optimizer = ChompOptimizer::new(cfg).unwrap();
        for _ in 0..1000 {
            optimizer.step(&mut traj, &obstacles).unwrap();
        }

        let obstacle = obstacles.get(0).unwrap();
        for p in traj.waypoint_positions() {
            assert!(
                p.distance(&obstacle.center) >= obstacle.radius(),
                "waypoint ({}, {}) inside obstacle",
                p.x,
                p.y
            );
        }
    }

    #[test]
    fn test_obstacle_repulsion_pointwise() {
        assert_repelled(ObstacleGradientMode::Pointwise);
    }

    #[test]
    fn test_obstacle_repulsion_functional() {
        assert_repelled(ObstacleGradientMode::Functional(VelocityScheme::Centered));
    }

    #[test]
    fn test_hinge_repulsion_then_release() {
        let start = config(-5.0, 0.0);
        let goal = config(5.0, 0.0);
        let mut obstacles = ObstacleSet::from_circles(&[(0.0, -0.5, 2.0)]).unwrap();
        let mut traj = Trajectory::straight_line(&start, &goal, 20).unwrap();
        let line = traj.clone();

        let mut optimizer = ChompOptimizer::new(ChompConfig::default().with_lambda(10.0)).unwrap();
        for _ in 0..3000 {
            optimizer.step(&mut traj, &obstacles).unwrap();
        }
        let obstacle = *obstacles.get(0).unwrap();
        for p in traj.waypoint_positions() {
            assert!(p.distance(&obstacle.center) >= obstacle.radius());
        }

        // once nothing touches the path it relaxes back onto the line
        obstacles.move_obstacle(0, 0.0, 20.0).unwrap();
        for _ in 0..3000 {
            optimizer.step(&mut traj, &obstacles).unwrap();
        }
        assert!((traj.xi() - line.xi()).amax() < 1e-9);
    }

    #[test]
    fn test_deflection_fades_away_from_obstacle() {
        let start = config(-5.0, 0.0);
        let goal = config(5.0, 0.0);
        let obstacles = ObstacleSet::from_circles(&[(-4.0, -0.3, 1.0)]).unwrap();
        let mut traj = Trajectory::straight_line(&start, &goal, 20).unwrap();

        let mut optimizer = ChompOptimizer::new(ChompConfig::default().with_lambda(10.0)).unwrap();
        for _ in 0..3000 {
            optimizer.step(&mut traj, &obstacles).unwrap();
        }

        let obstacle = *obstacles.get(0).unwrap();
        let points = traj.waypoint_positions();
        for p in &points {
            assert!(p.distance(&obstacle.center) >= obstacle.radius());
        }
        // past the obstacle the offset shrinks toward the goal
        for w in points[3..].windows(2) {
            assert!(w[1].y < w[0].y, "offset grew from {} to {}", w[0].y, w[1].y);
        }
        assert!(points[19].y.abs() < 0.1);
    }

    #[test]
    fn test_metric_untouched_by_obstacle_mutation() {
        let start = config(-5.0, -5.0);
        let goal = config(7.0, 7.0);
        let mut traj = zigzag(&start, &goal, 20, 1.0);
        let mut obstacles = scenario_obstacles();

        let mut optimizer = ChompOptimizer::new(ChompConfig::default()).unwrap();
        optimizer.step(&mut traj, &obstacles).unwrap();
        let metric = optimizer.metric(20, 2).unwrap();
        let snapshot = metric.matrix().clone();

        obstacles.add_obstacle(1.0, 1.0, 1.5).unwrap();
        obstacles.move_obstacle(0, 2.0, -1.0).unwrap();
        optimizer.step(&mut traj, &obstacles).unwrap();

        let after = optimizer.metric(20, 2).unwrap();
        assert!(Arc::ptr_eq(&metric, &after));
        assert_eq!(after.matrix(), &snapshot);
    }

    #[test]
    fn test_empty_trajectory_rejected() {
        let mut optimizer = ChompOptimizer::new(ChompConfig::default()).unwrap();
        let mut xi = DVector::zeros(0);
        let err = optimizer
            .step_raw(&config(0.0, 0.0), &config(1.0, 1.0), &mut xi, &scenario_obstacles())
            .unwrap_err();
        assert_eq!(err, ChompError::SingularMetricError { nq: 0 });
        assert_eq!(optimizer.iterations(), 0);

        let mut traj = Trajectory::new(2, 0).unwrap();
        assert!(matches!(
            optimizer.step(&mut traj, &ObstacleSet::new()),
            Err(ChompError::SingularMetricError { nq: 0 })
        ));
    }

    #[test]
    fn test_dimension_errors() {
        let mut optimizer = ChompOptimizer::new(ChompConfig::default()).unwrap();
        let obstacles = ObstacleSet::new();

        let mut xi = DVector::zeros(6);
        assert!(matches!(
            optimizer.step_raw(&config(0.0, 0.0), &DVector::zeros(3), &mut xi, &obstacles),
            Err(ChompError::DimensionError { what: "goal", expected: 2, actual: 3 })
        ));

        let mut odd = DVector::zeros(5);
        assert!(matches!(
            optimizer.step_raw(&config(0.0, 0.0), &config(1.0, 1.0), &mut odd, &obstacles),
            Err(ChompError::DimensionError { what: "trajectory", .. })
        ));
        assert_eq!(odd, DVector::zeros(5));
    }

    #[test]
    fn test_optimize_reports_convergence() {
        let start = config(-5.0, -5.0);
        let goal = config(7.0, 7.0);
        let mut traj = zigzag(&start, &goal, 10, 0.5);

        let cfg = ChompConfig::default()
            .with_eta(2.0)
            .with_max_iterations(200)
            .with_tolerance(1e-8);
        let mut optimizer = ChompOptimizer::new(cfg).unwrap();
        let report = optimizer.optimize(&mut traj, &ObstacleSet::new()).unwrap();

        assert!(report.converged);
        assert!(report.iterations < 200);
        assert!(report.last_step.unwrap().step_norm < 1e-8);
    }

    #[test]
    fn test_optimize_hits_iteration_cap() {
        let start = config(-5.0, -5.0);
        let goal = config(7.0, 7.0);
        let mut traj = zigzag(&start, &goal, 10, 0.5);

        let cfg = ChompConfig::default().with_max_iterations(5).with_tolerance(0.0);
        let mut optimizer = ChompOptimizer::new(cfg).unwrap();
        let report = optimizer.optimize(&mut traj, &ObstacleSet::new()).unwrap();

        assert!(!report.converged);
        assert_eq!(report.iterations, 5);
        assert_eq!(report.last_step.unwrap().iteration, 4);
    }

    #[test]
    fn test_run_chomp_matches_default_optimizer() {
        let start = config(-5.0, -5.0);
        let goal = config(7.0, 7.0);
        let obstacles = scenario_obstacles();
        let traj = zigzag(&start, &goal, 20, 1.0);

        let mut xi = traj.xi().clone();
        run_chomp(&start, &goal, &mut xi, &obstacles).unwrap();

        let mut reference = traj.clone();
        let mut optimizer = ChompOptimizer::new(ChompConfig::default()).unwrap();
        optimizer.step(&mut reference, &obstacles).unwrap();

        assert!((reference.xi() - &xi).norm() < 1e-12);
        assert_eq!(start, config(-5.0, -5.0));
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(ChompOptimizer::new(ChompConfig::default().with_eta(-1.0)).is_err());
    }
}
