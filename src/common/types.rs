//! Common types used throughout rust_chomp

use nalgebra::Vector2;

use crate::common::error::{ChompError, ChompResult};

/// 2D point representation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn to_vector(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

/// Path represented as a sequence of 2D points
#[derive(Debug, Clone)]
pub struct Path2D {
    pub points: Vec<Point2D>,
}

impl Path2D {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn from_points(points: Vec<Point2D>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn x_coords(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.x).collect()
    }

    pub fn y_coords(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.y).collect()
    }

    pub fn total_length(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        self.points.windows(2)
            .map(|w| w[0].distance(&w[1]))
            .sum()
    }
}

impl Default for Path2D {
    fn default() -> Self {
        Self::new()
    }
}

/// Circular obstacle (center + radius)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleObstacle {
    pub center: Point2D,
    radius: f64,
}

impl CircleObstacle {
    pub fn new(x: f64, y: f64, radius: f64) -> ChompResult<Self> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(ChompError::InvalidParameter(format!(
                "obstacle radius must be positive and finite, got {}",
                radius
            )));
        }
        Ok(Self { center: Point2D::new(x, y), radius })
    }

    /// Radius is fixed at creation
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// True if `p` lies inside or on the obstacle disk
    pub fn contains(&self, p: Point2D) -> bool {
        self.center.distance(&p) <= self.radius
    }
}

/// Ordered, growable set of circular obstacles
///
/// Indices are stable: obstacles are only ever appended, never removed.
#[derive(Debug, Clone, Default)]
pub struct ObstacleSet {
    obstacles: Vec<CircleObstacle>,
}

impl ObstacleSet {
    pub fn new() -> Self {
        Self { obstacles: Vec::new() }
    }

    /// Pre-reserve room for `capacity` obstacles
    pub fn with_capacity(capacity: usize) -> Self {
        Self { obstacles: Vec::with_capacity(capacity) }
    }

    /// Build from `(x, y, radius)` triples
    pub fn from_circles(circles: &[(f64, f64, f64)]) -> ChompResult<Self> {
        let mut set = Self::with_capacity(circles.len());
        for &(x, y, r) in circles {
            set.add_obstacle(x, y, r)?;
        }
        Ok(set)
    }

    /// Append a new obstacle, returning its index
    pub fn add_obstacle(&mut self, x: f64, y: f64, radius: f64) -> ChompResult<usize> {
        self.obstacles.push(CircleObstacle::new(x, y, radius)?);
        Ok(self.obstacles.len() - 1)
    }

    /// Relocate the center of an existing obstacle
    pub fn move_obstacle(&mut self, index: usize, x: f64, y: f64) -> ChompResult<()> {
        let len = self.obstacles.len();
        let obstacle = self
            .obstacles
            .get_mut(index)
            .ok_or_else(|| ChompError::index("obstacle", index, len))?;
        obstacle.center = Point2D::new(x, y);
        Ok(())
    }

    pub fn get(&self, index: usize) -> ChompResult<&CircleObstacle> {
        self.obstacles
            .get(index)
            .ok_or_else(|| ChompError::index("obstacle", index, self.obstacles.len()))
    }

    /// Index of the first obstacle whose disk contains `p`
    pub fn find_containing(&self, p: Point2D) -> Option<usize> {
        self.obstacles.iter().position(|o| o.contains(p))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CircleObstacle> {
        self.obstacles.iter()
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }
}

impl<'a> IntoIterator for &'a ObstacleSet {
    type Item = &'a CircleObstacle;
    type IntoIter = std::slice::Iter<'a, CircleObstacle>;

    fn into_iter(self) -> Self::IntoIter {
        self.obstacles.iter()
    }
}
