//! Smoothness cost and the covariant metric
//!
//! With `D` the forward-difference operator over the `nq + 1` segments
//! start -> q_1 -> ... -> q_nq -> goal and `b` the boundary contribution of
//! the fixed endpoints, the smoothness cost is `½‖Dξ + b‖²`. Its Hessian
//! `A = DᵗD` is block tridiagonal (2 on the diagonal, −1 beside it, per
//! coordinate) and positive definite because both ends are pinned.

use std::collections::HashMap;
use std::sync::Arc;

use itertools::Itertools;
use log::trace;
use nalgebra::{Cholesky, DMatrix, DVector, Dyn};

use crate::common::{ChompError, ChompResult};

/// Finite-difference metric `A = DᵗD` for a fixed `(nq, cdim)`
///
/// Immutable once built; the Cholesky factor is computed up front so every
/// covariant update is a pair of triangular solves.
#[derive(Debug, Clone)]
pub struct SmoothnessMetric {
    nq: usize,
    cdim: usize,
    difference: DMatrix<f64>,
    a: DMatrix<f64>,
    cholesky: Cholesky<f64, Dyn>,
}

impl SmoothnessMetric {
    pub fn new(nq: usize, cdim: usize) -> ChompResult<Self> {
        if nq == 0 {
            return Err(ChompError::SingularMetricError { nq });
        }
        if cdim == 0 {
            return Err(ChompError::InvalidParameter(
                "configuration dimension must be positive".to_string(),
            ));
        }

        let difference = difference_operator(nq, cdim);
        let a = difference.tr_mul(&difference);
        let cholesky = a
            .clone()
            .cholesky()
            .ok_or(ChompError::SingularMetricError { nq })?;

        Ok(SmoothnessMetric { nq, cdim, difference, a, cholesky })
    }

    pub fn nq(&self) -> usize {
        self.nq
    }

    pub fn cdim(&self) -> usize {
        self.cdim
    }

    /// Dimension of the flat waypoint vector, `nq * cdim`
    pub fn dim(&self) -> usize {
        self.nq * self.cdim
    }

    /// The metric `A`
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.a
    }

    /// The difference operator `D`, `(nq + 1) * cdim` rows by `nq * cdim` columns
    pub fn difference_operator(&self) -> &DMatrix<f64> {
        &self.difference
    }

    /// Solve `A x = g`
    pub fn solve(&self, g: &DVector<f64>) -> ChompResult<DVector<f64>> {
        if g.len() != self.dim() {
            return Err(ChompError::dimension("gradient", self.dim(), g.len()));
        }
        Ok(self.cholesky.solve(g))
    }

    /// `½‖Dξ + b‖²`
    pub fn cost(&self, start: &DVector<f64>, goal: &DVector<f64>, xi: &DVector<f64>) -> ChompResult<f64> {
        self.check(start, goal, xi)?;
        let residual = &self.difference * xi + boundary_term(start, goal, self.nq);
        Ok(0.5 * residual.norm_squared())
    }

    /// `∇ = Aξ + Dᵗb`
    pub fn gradient(
        &self,
        start: &DVector<f64>,
        goal: &DVector<f64>,
        xi: &DVector<f64>,
    ) -> ChompResult<DVector<f64>> {
        self.check(start, goal, xi)?;
        let b = boundary_term(start, goal, self.nq);
        Ok(&self.a * xi + self.difference.tr_mul(&b))
    }

    fn check(&self, start: &DVector<f64>, goal: &DVector<f64>, xi: &DVector<f64>) -> ChompResult<()> {
        if start.len() != self.cdim {
            return Err(ChompError::dimension("start", self.cdim, start.len()));
        }
        if goal.len() != self.cdim {
            return Err(ChompError::dimension("goal", self.cdim, goal.len()));
        }
        if xi.len() != self.dim() {
            return Err(ChompError::dimension("trajectory", self.dim(), xi.len()));
        }
        Ok(())
    }
}

/// Banded block operator mapping `ξ` to consecutive waypoint differences
pub fn difference_operator(nq: usize, cdim: usize) -> DMatrix<f64> {
    let mut d = DMatrix::zeros((nq + 1) * cdim, nq * cdim);
    for segment in 0..=nq {
        for k in 0..cdim {
            let row = segment * cdim + k;
            if segment < nq {
                d[(row, segment * cdim + k)] = 1.0;
            }
            if segment > 0 {
                d[(row, (segment - 1) * cdim + k)] = -1.0;
            }
        }
    }
    d
}

/// Endpoint contribution `b`: `−start` on the first segment, `+goal` on the last
pub fn boundary_term(start: &DVector<f64>, goal: &DVector<f64>, nq: usize) -> DVector<f64> {
    let cdim = start.len();
    let mut b = DVector::zeros((nq + 1) * cdim);
    {
        let mut first = b.rows_mut(0, cdim);
        first -= start;
    }
    {
        let mut last = b.rows_mut(nq * cdim, cdim);
        last += goal;
    }
    b
}

/// `½ Σ ‖q_{i+1} − q_i‖²` over start, waypoints and goal, without building `D`
pub fn smoothness_cost(start: &DVector<f64>, goal: &DVector<f64>, xi: &DVector<f64>) -> f64 {
    let cdim = start.len();
    if cdim == 0 {
        return 0.0;
    }
    let squared: f64 = std::iter::once(start.as_slice())
        .chain(xi.as_slice().chunks(cdim))
        .chain(std::iter::once(goal.as_slice()))
        .tuple_windows()
        .map(|(a, b)| a.iter().zip(b.iter()).map(|(x, y)| (y - x).powi(2)).sum::<f64>())
        .sum();
    0.5 * squared
}

/// Metrics memoized per `(nq, cdim)`
///
/// A trajectory resize simply maps to a different key, so stale metrics are
/// never handed out.
#[derive(Debug, Default)]
pub struct MetricCache {
    entries: HashMap<(usize, usize), Arc<SmoothnessMetric>>,
}

impl MetricCache {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    pub fn get_or_build(&mut self, nq: usize, cdim: usize) -> ChompResult<Arc<SmoothnessMetric>> {
        if let Some(metric) = self.entries.get(&(nq, cdim)) {
            return Ok(Arc::clone(metric));
        }
        let metric = Arc::new(SmoothnessMetric::new(nq, cdim)?);
        trace!("built smoothness metric nq={} cdim={}", nq, cdim);
        self.entries.insert((nq, cdim), Arc::clone(&metric));
        Ok(metric)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
