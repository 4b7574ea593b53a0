//! Obstacle cost and gradient
//!
//! Every waypoint is tested against every obstacle on every call. There is
//! no spatial index: obstacle counts are small and obstacles may be dragged
//! arbitrarily between iterations, so nothing obstacle-derived is cached.

use nalgebra::{DVector, Matrix2, Vector2};

use crate::common::{ChompError, ChompResult, CircleObstacle, ObstacleSet, WorkspacePotential};

/// Distances below this are treated as "at the center" (no defined direction)
const CENTER_EPS: f64 = 1e-9;
/// Velocities below this skip the functional obstacle term
const MIN_SPEED: f64 = 1e-3;

/// Falloff of the potential inside the influence radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PotentialShape {
    /// `c = r − d`: constant unit push toward the outside
    Hinge,
    /// `c = gain · r · (1 − d/r)³ / 3`: smooth, vanishing slope at the rim
    Cubic { gain: f64 },
}

/// Workspace potential of a circular obstacle inflated by a safety margin
///
/// The influence radius is `R + safety_margin`. Outside it the cost is zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstaclePotential {
    pub shape: PotentialShape,
    pub safety_margin: f64,
}

impl ObstaclePotential {
    pub fn hinge(safety_margin: f64) -> Self {
        Self { shape: PotentialShape::Hinge, safety_margin }
    }

    pub fn cubic(gain: f64, safety_margin: f64) -> Self {
        Self { shape: PotentialShape::Cubic { gain }, safety_margin }
    }

    pub fn validate(&self) -> ChompResult<()> {
        if !(self.safety_margin.is_finite() && self.safety_margin >= 0.0) {
            return Err(ChompError::InvalidParameter(format!(
                "safety margin must be non-negative, got {}",
                self.safety_margin
            )));
        }
        if let PotentialShape::Cubic { gain } = self.shape {
            if !(gain.is_finite() && gain > 0.0) {
                return Err(ChompError::InvalidParameter(format!(
                    "cubic potential gain must be positive, got {}",
                    gain
                )));
            }
        }
        Ok(())
    }
}

impl Default for ObstaclePotential {
    fn default() -> Self {
        Self::hinge(0.0)
    }
}

impl WorkspacePotential for ObstaclePotential {
    fn influence_radius(&self, radius: f64) -> f64 {
        radius + self.safety_margin
    }

    fn cost(&self, distance: f64, radius: f64) -> f64 {
        let r = self.influence_radius(radius);
        if distance >= r {
            return 0.0;
        }
        match self.shape {
            PotentialShape::Hinge => r - distance,
            PotentialShape::Cubic { gain } => gain * r * (1.0 - distance / r).powi(3) / 3.0,
        }
    }

    fn cost_derivative(&self, distance: f64, radius: f64) -> f64 {
        let r = self.influence_radius(radius);
        if distance >= r {
            return 0.0;
        }
        match self.shape {
            PotentialShape::Hinge => -1.0,
            PotentialShape::Cubic { gain } => -gain * (1.0 - distance / r).powi(2),
        }
    }
}

/// How waypoint velocity is estimated for the functional obstacle term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VelocityScheme {
    /// `q_{i+1} − q_i`; biased toward the goal
    Forward,
    /// `(q_{i+1} − q_{i−1}) / 2`
    Centered,
}

/// Which obstacle gradient the optimizer uses
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObstacleGradientMode {
    /// Sum of per-waypoint potential gradients
    Pointwise,
    /// Arc-length weighted CHOMP functional with curvature correction
    Functional(VelocityScheme),
}

/// Obstacle cost and its gradient with respect to `ξ`
#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleTerm {
    pub cost: f64,
    pub gradient: DVector<f64>,
}

/// Workspace position (first two coordinates) of waypoint `i`
fn workspace_position(xi: &DVector<f64>, cdim: usize, i: usize) -> Vector2<f64> {
    Vector2::new(xi[i * cdim], xi[i * cdim + 1])
}

/// Cost and workspace gradient of one obstacle at `x`, `None` outside its influence
fn potential_at<P: WorkspacePotential>(
    potential: &P,
    x: &Vector2<f64>,
    obstacle: &CircleObstacle,
) -> Option<(f64, Vector2<f64>)> {
    let delta = x - obstacle.center.to_vector();
    let distance = delta.norm();
    if distance >= potential.influence_radius(obstacle.radius()) {
        return None;
    }
    let cost = potential.cost(distance, obstacle.radius());
    if distance < CENTER_EPS {
        return Some((cost, Vector2::zeros()));
    }
    let slope = potential.cost_derivative(distance, obstacle.radius());
    Some((cost, delta * (slope / distance)))
}

fn check_dims(cdim: usize, xi: &DVector<f64>, obstacles: &ObstacleSet) -> ChompResult<()> {
    if cdim == 0 || xi.len() % cdim != 0 {
        return Err(ChompError::dimension("trajectory", (xi.len() / cdim.max(1)) * cdim, xi.len()));
    }
    if !obstacles.is_empty() && cdim < 2 {
        return Err(ChompError::dimension("configuration", 2, cdim));
    }
    Ok(())
}

/// Total obstacle cost of the waypoints, `Σ_i Σ_o c(x_i)`
pub fn obstacle_cost<P: WorkspacePotential>(
    potential: &P,
    xi: &DVector<f64>,
    cdim: usize,
    obstacles: &ObstacleSet,
) -> ChompResult<f64> {
    Ok(pointwise_term(potential, xi, cdim, obstacles)?.cost)
}

/// Per-waypoint obstacle cost and gradient
///
/// The gradient of each waypoint is the sum over the obstacles whose
/// influence radius it is inside of `c'(d) · (x − center) / d`. Descent
/// therefore pushes waypoints radially away from the centers.
pub fn pointwise_term<P: WorkspacePotential>(
    potential: &P,
    xi: &DVector<f64>,
    cdim: usize,
    obstacles: &ObstacleSet,
) -> ChompResult<ObstacleTerm> {
    check_dims(cdim, xi, obstacles)?;
    let mut gradient = DVector::zeros(xi.len());
    let mut cost = 0.0;
    if obstacles.is_empty() {
        return Ok(ObstacleTerm { cost, gradient });
    }

    let nq = xi.len() / cdim;
    for i in 0..nq {
        let x = workspace_position(xi, cdim, i);
        for obstacle in obstacles {
            if let Some((c, g)) = potential_at(potential, &x, obstacle) {
                cost += c;
                gradient[i * cdim] += g[0];
                gradient[i * cdim + 1] += g[1];
            }
        }
    }
    Ok(ObstacleTerm { cost, gradient })
}

/// CHOMP workspace functional `Σ_i c(x_i) ‖ẋ_i‖`
///
/// Gradient per waypoint is `‖ẋ‖ (P ∇c − c κ)` with `P = I − x̂' x̂'ᵗ` the
/// projection orthogonal to the motion and `κ = P ẍ / ‖ẋ‖²` the path
/// curvature. Only the workspace block is touched; for a point robot the
/// body Jacobian is the identity.
pub fn functional_term<P: WorkspacePotential>(
    potential: &P,
    scheme: VelocityScheme,
    start: &DVector<f64>,
    goal: &DVector<f64>,
    xi: &DVector<f64>,
    obstacles: &ObstacleSet,
) -> ChompResult<ObstacleTerm> {
    let cdim = start.len();
    if goal.len() != cdim {
        return Err(ChompError::dimension("goal", cdim, goal.len()));
    }
    check_dims(cdim, xi, obstacles)?;
    let mut gradient = DVector::zeros(xi.len());
    let mut cost = 0.0;
    if obstacles.is_empty() {
        return Ok(ObstacleTerm { cost, gradient });
    }

    let nq = xi.len() / cdim;
    let qs = Vector2::new(start[0], start[1]);
    let qe = Vector2::new(goal[0], goal[1]);
    let at = |i: usize| workspace_position(xi, cdim, i);

    for i in 0..nq {
        let x = at(i);
        let prev = if i == 0 { qs } else { at(i - 1) };
        let next = if i + 1 == nq { qe } else { at(i + 1) };

        let xd = match scheme {
            VelocityScheme::Forward => next - x,
            VelocityScheme::Centered => (next - prev) * 0.5,
        };
        let speed = xd.norm();
        if speed < MIN_SPEED {
            continue;
        }
        let xdd = next - x * 2.0 + prev;
        let xdn = xd / speed;
        let prj = Matrix2::identity() - xdn * xdn.transpose();
        let kappa = prj * xdd / (speed * speed);

        for obstacle in obstacles {
            if let Some((c, g)) = potential_at(potential, &x, obstacle) {
                cost += c * speed;
                let contribution = (prj * g - kappa * c) * speed;
                gradient[i * cdim] += contribution[0];
                gradient[i * cdim + 1] += contribution[1];
            }
        }
    }
    Ok(ObstacleTerm { cost, gradient })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_waypoint(x: f64, y: f64) -> DVector<f64> {
        DVector::from_vec(vec![x, y])
    }

    #[test]
    fn test_hinge_potential_profile() {
        let p = ObstaclePotential::hinge(0.0);
        assert_eq!(p.cost(0.0, 2.0), 2.0);
        assert_eq!(p.cost(1.5, 2.0), 0.5);
        assert_eq!(p.cost(2.0, 2.0), 0.0);
        assert_eq!(p.cost(3.0, 2.0), 0.0);
        assert_eq!(p.cost_derivative(1.0, 2.0), -1.0);
        assert_eq!(p.cost_derivative(2.5, 2.0), 0.0);
    }

    #[test]
    fn test_cubic_potential_profile() {
        let p = ObstaclePotential::cubic(10.0, 1.0);
        assert_eq!(p.influence_radius(2.0), 3.0);
        assert!(p.cost(0.0, 2.0) > p.cost(1.0, 2.0));
        assert!(p.cost(1.0, 2.0) > p.cost(2.5, 2.0));
        assert_eq!(p.cost(3.0, 2.0), 0.0);

        let h = 1e-6;
        let numeric = (p.cost(1.2 + h, 2.0) - p.cost(1.2 - h, 2.0)) / (2.0 * h);
        assert!((p.cost_derivative(1.2, 2.0) - numeric).abs() < 1e-6);
    }

    #[test]
    fn test_potential_validation() {
        assert!(ObstaclePotential::hinge(0.5).validate().is_ok());
        assert!(ObstaclePotential::hinge(-0.5).validate().is_err());
        assert!(ObstaclePotential::cubic(0.0, 1.0).validate().is_err());
    }

    #[test]
    fn test_gradient_points_toward_center() {
        let obstacles = ObstacleSet::from_circles(&[(3.0, 0.0, 2.0)]).unwrap();
        let term = pointwise_term(&ObstaclePotential::default(), &single_waypoint(2.0, 0.0), 2, &obstacles).unwrap();
        assert!((term.cost - 1.0).abs() < 1e-12);
        // descent direction −∇ points from the center to the waypoint
        assert!((term.gradient[0] - 1.0).abs() < 1e-12);
        assert!(term.gradient[1].abs() < 1e-12);
    }

    #[test]
    fn test_outside_and_center_contribute_no_gradient() {
        let obstacles = ObstacleSet::from_circles(&[(3.0, 0.0, 2.0)]).unwrap();
        let potential = ObstaclePotential::default();

        let outside = pointwise_term(&potential, &single_waypoint(-1.0, 0.0), 2, &obstacles).unwrap();
        assert_eq!(outside.cost, 0.0);
        assert_eq!(outside.gradient.norm(), 0.0);

        let center = pointwise_term(&potential, &single_waypoint(3.0, 0.0), 2, &obstacles).unwrap();
        assert!((center.cost - 2.0).abs() < 1e-12);
        assert_eq!(center.gradient.norm(), 0.0);
    }

    #[test]
    fn test_overlapping_obstacles_sum() {
        let obstacles = ObstacleSet::from_circles(&[(1.0, 0.0, 2.0), (-1.0, 0.0, 2.0)]).unwrap();
        let term = pointwise_term(&ObstaclePotential::default(), &single_waypoint(0.0, 0.5), 2, &obstacles).unwrap();
        // x components cancel, y components add up
        assert!(term.gradient[0].abs() < 1e-12);
        assert!(term.gradient[1] < 0.0);
        assert!(term.cost > 0.0);
    }

    #[test]
    fn test_empty_obstacles_zero_gradient() {
        let xi = DVector::from_vec(vec![0.0, 0.0, 1.0, 1.0]);
        let term = pointwise_term(&ObstaclePotential::default(), &xi, 2, &ObstacleSet::new()).unwrap();
        assert_eq!(term.cost, 0.0);
        assert_eq!(term.gradient, DVector::zeros(4));
    }

    #[test]
    fn test_low_dimension_rejected_with_obstacles() {
        let obstacles = ObstacleSet::from_circles(&[(0.0, 0.0, 1.0)]).unwrap();
        let xi = DVector::from_vec(vec![0.0, 1.0, 2.0]);
        assert!(matches!(
            pointwise_term(&ObstaclePotential::default(), &xi, 1, &obstacles),
            Err(ChompError::DimensionError { what: "configuration", expected: 2, actual: 1 })
        ));
        assert!(pointwise_term(&ObstaclePotential::default(), &xi, 1, &ObstacleSet::new()).is_ok());
    }

    #[test]
    fn test_functional_term_pushes_sideways() {
        // straight motion along +x, obstacle just below the path
        let start = DVector::from_vec(vec![-1.0, 0.0]);
        let goal = DVector::from_vec(vec![1.0, 0.0]);
        let xi = DVector::from_vec(vec![0.0, 0.0]);
        let obstacles = ObstacleSet::from_circles(&[(0.0, -0.5, 1.0)]).unwrap();
        let potential = ObstaclePotential::cubic(10.0, 0.5);

        for scheme in [VelocityScheme::Forward, VelocityScheme::Centered].iter() {
            let term = functional_term(&potential, *scheme, &start, &goal, &xi, &obstacles).unwrap();
            assert!(term.cost > 0.0);
            // only the component orthogonal to the motion survives the projection
            assert!(term.gradient[0].abs() < 1e-12);
            assert!(term.gradient[1] < 0.0);
        }
    }
}
