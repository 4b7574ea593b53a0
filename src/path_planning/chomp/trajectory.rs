//! Discretized trajectory model
//!
//! A trajectory is a fixed start and goal configuration plus `nq` interior
//! waypoints stacked into one flat vector `xi = (q_1, q_2, ..., q_nq)`.
//! Waypoint `i` occupies `xi[i*cdim .. (i+1)*cdim]`.

use nalgebra::DVector;
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

use crate::common::{ChompError, ChompResult, Path2D, Point2D};
use super::smoothness;

/// A robot configuration (one point of the configuration space)
pub type Configuration = DVector<f64>;

/// Start, goal and interior waypoints of a discretized path
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    cdim: usize,
    nq: usize,
    start: Configuration,
    goal: Configuration,
    xi: DVector<f64>,
}

impl Trajectory {
    /// Create a zero-filled trajectory with `nq` waypoints of dimension `cdim`
    pub fn new(cdim: usize, nq: usize) -> ChompResult<Self> {
        if cdim == 0 {
            return Err(ChompError::InvalidParameter(
                "configuration dimension must be positive".to_string(),
            ));
        }
        Ok(Trajectory {
            cdim,
            nq,
            start: DVector::zeros(cdim),
            goal: DVector::zeros(cdim),
            xi: DVector::zeros(nq * cdim),
        })
    }

    /// Evenly spaced waypoints on the segment from `start` to `goal`
    pub fn straight_line(start: &Configuration, goal: &Configuration, nq: usize) -> ChompResult<Self> {
        let mut trajectory = Self::new(start.len(), nq)?;
        trajectory.set_endpoints(start, goal)?;
        trajectory.interpolate();
        Ok(trajectory)
    }

    /// Assemble a trajectory from an existing flat waypoint vector
    pub fn from_parts(start: Configuration, goal: Configuration, xi: DVector<f64>) -> ChompResult<Self> {
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
        Ok(Trajectory { cdim, nq, start, goal, xi })
    }

    pub fn cdim(&self) -> usize {
        self.cdim
    }

    pub fn nq(&self) -> usize {
        self.nq
    }

    pub fn start(&self) -> &Configuration {
        &self.start
    }

    pub fn goal(&self) -> &Configuration {
        &self.goal
    }

    /// Flat waypoint vector, length `nq * cdim`
    pub fn xi(&self) -> &DVector<f64> {
        &self.xi
    }

    /// Split borrow used by the optimizer: endpoints read-only, waypoints mutable
    pub(crate) fn parts_mut(&mut self) -> (&Configuration, &Configuration, &mut DVector<f64>) {
        (&self.start, &self.goal, &mut self.xi)
    }

    pub fn set_endpoints(&mut self, start: &Configuration, goal: &Configuration) -> ChompResult<()> {
        if start.len() != self.cdim {
            return Err(ChompError::dimension("start", self.cdim, start.len()));
        }
        if goal.len() != self.cdim {
            return Err(ChompError::dimension("goal", self.cdim, goal.len()));
        }
        self.start.copy_from(start);
        self.goal.copy_from(goal);
        Ok(())
    }

    pub fn get_waypoint(&self, i: usize) -> ChompResult<Configuration> {
        if i >= self.nq {
            return Err(ChompError::index("waypoint", i, self.nq));
        }
        Ok(self.xi.rows(i * self.cdim, self.cdim).into_owned())
    }

    pub fn set_waypoint(&mut self, i: usize, config: &Configuration) -> ChompResult<()> {
        if i >= self.nq {
            return Err(ChompError::index("waypoint", i, self.nq));
        }
        if config.len() != self.cdim {
            return Err(ChompError::dimension("waypoint", self.cdim, config.len()));
        }
        self.xi.rows_mut(i * self.cdim, self.cdim).copy_from(config);
        Ok(())
    }

    /// Reallocate for `nq` waypoints.
    ///
    /// Contents are zeroed; call [`Trajectory::interpolate`] or set the
    /// waypoints again before optimizing.
    pub fn resize(&mut self, nq: usize) {
        self.nq = nq;
        self.xi = DVector::zeros(nq * self.cdim);
    }

    /// Re-seed the waypoints on the straight segment between the endpoints
    pub fn interpolate(&mut self) {
        let denom = (self.nq + 1) as f64;
        for i in 0..self.nq {
            let t = (i + 1) as f64 / denom;
            let q = &self.start + (&self.goal - &self.start) * t;
            self.xi.rows_mut(i * self.cdim, self.cdim).copy_from(&q);
        }
    }

    /// Scatter every waypoint coordinate uniformly in `[-half_range, half_range]`
    pub fn jumble<R: Rng + ?Sized>(&mut self, rng: &mut R, half_range: f64) -> ChompResult<()> {
        if !(half_range.is_finite() && half_range >= 0.0) {
            return Err(ChompError::InvalidParameter(format!(
                "jumble half range must be non-negative, got {}",
                half_range
            )));
        }
        let dist = Uniform::new_inclusive(-half_range, half_range);
        for v in self.xi.iter_mut() {
            *v = dist.sample(rng);
        }
        Ok(())
    }

    /// Add zero-mean Gaussian noise with standard deviation `sigma`
    pub fn perturb<R: Rng + ?Sized>(&mut self, rng: &mut R, sigma: f64) -> ChompResult<()> {
        if !(sigma.is_finite() && sigma >= 0.0) {
            return Err(ChompError::InvalidParameter(format!(
                "noise sigma must be non-negative, got {}",
                sigma
            )));
        }
        let noise = Normal::new(0.0, sigma)
            .map_err(|e| ChompError::InvalidParameter(format!("noise sigma {}: {}", sigma, e)))?;
        for v in self.xi.iter_mut() {
            *v += noise.sample(rng);
        }
        Ok(())
    }

    /// Workspace positions of the interior waypoints
    pub fn waypoint_positions(&self) -> Vec<Point2D> {
        self.xi
            .as_slice()
            .chunks(self.cdim)
            .map(project)
            .collect()
    }

    /// Full polyline start -> waypoints -> goal in the workspace
    pub fn to_path(&self) -> Path2D {
        let mut points = Vec::with_capacity(self.nq + 2);
        points.push(project(self.start.as_slice()));
        points.extend(self.waypoint_positions());
        points.push(project(self.goal.as_slice()));
        Path2D::from_points(points)
    }

    /// ½ Σ ‖q_{i+1} − q_i‖² over all segments including both endpoints
    pub fn smoothness_cost(&self) -> f64 {
        smoothness::smoothness_cost(&self.start, &self.goal, &self.xi)
    }
}

fn project(q: &[f64]) -> Point2D {
    Point2D::new(q[0], q.get(1).copied().unwrap_or(0.0))
}
