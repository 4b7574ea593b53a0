//! Interactive CHOMP session
//!
//! Owns everything the optimizer operates on (trajectory, obstacles) plus
//! the driver-side state that does not belong in the optimizer: run mode
//! and obstacle drag. A host calls [`ChompSession::tick`] once per frame and
//! forwards pointer events to the drag methods. Obstacles are only ever
//! mutated between ticks, so no locking is needed; a multi-threaded host
//! should guard the whole session with one mutex.

use itertools::{Itertools, MinMaxResult};
use log::info;
use nalgebra::DVector;
use ordered_float::OrderedFloat;
use rand::Rng;

use crate::common::{ChompResult, ObstacleSet, Point2D, TrajectoryOptimizer};
use crate::path_planning::chomp::{ChompConfig, ChompOptimizer, StepReport, Trajectory};
use super::run_mode::{ModeEvent, RunMode, RunModeMachine};

/// Half-width of the box used by [`ChompSession::jumble`]
const JUMBLE_HALF_RANGE: f64 = 5.0;

/// Initial geometry and parameters of a session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub start: Point2D,
    pub goal: Point2D,
    /// Number of interior waypoints
    pub num_waypoints: usize,
    /// Initial obstacles as `(x, y, radius)`
    pub obstacles: Vec<(f64, f64, f64)>,
    /// Radius given to obstacles created with [`ChompSession::add_obstacle_at`]
    pub new_obstacle_radius: f64,
    pub chomp: ChompConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start: Point2D::new(-5.0, -5.0),
            goal: Point2D::new(7.0, 7.0),
            num_waypoints: 20,
            obstacles: vec![(3.0, 0.0, 2.0), (0.0, 3.0, 2.0)],
            new_obstacle_radius: 2.0,
            chomp: ChompConfig::default(),
        }
    }
}

/// An obstacle currently held by the pointer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    pub index: usize,
    /// Obstacle center minus pointer position at grab time
    pub offset: Point2D,
}

/// Session state owned by the interactive driver
#[derive(Debug)]
pub struct ChompSession {
    trajectory: Trajectory,
    obstacles: ObstacleSet,
    optimizer: ChompOptimizer,
    mode: RunModeMachine,
    drag: Option<DragState>,
    new_obstacle_radius: f64,
}

impl ChompSession {
    /// Straight-line initial trajectory, paused
    pub fn new(config: SessionConfig) -> ChompResult<Self> {
        let start = DVector::from_vec(vec![config.start.x, config.start.y]);
        let goal = DVector::from_vec(vec![config.goal.x, config.goal.y]);
        let trajectory = Trajectory::straight_line(&start, &goal, config.num_waypoints)?;
        let obstacles = ObstacleSet::from_circles(&config.obstacles)?;
        let optimizer = ChompOptimizer::new(config.chomp)?;

        info!(
            "chomp session: {} waypoints, {} obstacles",
            trajectory.nq(),
            obstacles.len()
        );
        Ok(ChompSession {
            trajectory,
            obstacles,
            optimizer,
            mode: RunModeMachine::default(),
            drag: None,
            new_obstacle_radius: config.new_obstacle_radius,
        })
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn obstacles(&self) -> &ObstacleSet {
        &self.obstacles
    }

    pub fn optimizer(&self) -> &ChompOptimizer {
        &self.optimizer
    }

    pub fn mode(&self) -> RunMode {
        self.mode.current()
    }

    pub fn drag(&self) -> Option<DragState> {
        self.drag
    }

    /// Run one optimizer step unless paused
    pub fn tick(&mut self) -> ChompResult<Option<StepReport>> {
        if !self.mode.current().accepts_tick() {
            return Ok(None);
        }
        let report = self.optimizer.step(&mut self.trajectory, &self.obstacles)?;
        self.mode.process(ModeEvent::Ticked);
        Ok(Some(report))
    }

    /// Run exactly one step on the next tick
    pub fn request_step(&mut self) -> RunMode {
        self.mode.process(ModeEvent::Step)
    }

    pub fn toggle_run(&mut self) -> RunMode {
        self.mode.process(ModeEvent::ToggleRun)
    }

    pub fn pause(&mut self) -> RunMode {
        self.mode.process(ModeEvent::Pause)
    }

    pub fn add_obstacle(&mut self, x: f64, y: f64, radius: f64) -> ChompResult<usize> {
        let index = self.obstacles.add_obstacle(x, y, radius)?;
        info!("added obstacle {} at ({:.2}, {:.2}) r={:.2}", index, x, y, radius);
        Ok(index)
    }

    /// Add an obstacle of the configured default radius under the pointer
    pub fn add_obstacle_at(&mut self, pointer: Point2D) -> ChompResult<usize> {
        self.add_obstacle(pointer.x, pointer.y, self.new_obstacle_radius)
    }

    pub fn move_obstacle(&mut self, index: usize, x: f64, y: f64) -> ChompResult<()> {
        self.obstacles.move_obstacle(index, x, y)
    }

    /// Start dragging obstacle `index`; `offset` is its center minus the pointer
    pub fn begin_drag(&mut self, index: usize, offset: Point2D) -> ChompResult<()> {
        self.obstacles.get(index)?;
        self.drag = Some(DragState { index, offset });
        Ok(())
    }

    /// Grab the first obstacle under the pointer and start running
    pub fn grab_at(&mut self, pointer: Point2D) -> ChompResult<Option<usize>> {
        let index = match self.obstacles.find_containing(pointer) {
            Some(index) => index,
            None => return Ok(None),
        };
        let center = self.obstacles.get(index)?.center;
        let offset = Point2D::new(center.x - pointer.x, center.y - pointer.y);
        self.begin_drag(index, offset)?;
        self.mode.process(ModeEvent::Run);
        Ok(Some(index))
    }

    /// Follow the pointer with the grabbed obstacle; `false` if nothing is held
    pub fn update_drag(&mut self, pointer: Point2D) -> ChompResult<bool> {
        let drag = match self.drag {
            Some(drag) => drag,
            None => return Ok(false),
        };
        self.obstacles.move_obstacle(
            drag.index,
            pointer.x + drag.offset.x,
            pointer.y + drag.offset.y,
        )?;
        Ok(true)
    }

    /// Release the grabbed obstacle and pause
    pub fn end_drag(&mut self) {
        self.drag = None;
        self.mode.process(ModeEvent::Pause);
    }

    /// Scatter the waypoints randomly, keeping the endpoints
    pub fn jumble<R: Rng + ?Sized>(&mut self, rng: &mut R) -> ChompResult<()> {
        self.trajectory.jumble(rng, JUMBLE_HALF_RANGE)
    }

    /// Axis-aligned box around start, goal and waypoints, grown by `padding`
    pub fn view_bounds(&self, padding: f64) -> (Point2D, Point2D) {
        let points = self.trajectory.to_path().points;
        let range = |values: Vec<f64>| match values.into_iter().map(OrderedFloat).minmax() {
            MinMaxResult::NoElements => (0.0, 0.0),
            MinMaxResult::OneElement(v) => (v.0, v.0),
            MinMaxResult::MinMax(lo, hi) => (lo.0, hi.0),
        };
        let (xmin, xmax) = range(points.iter().map(|p| p.x).collect());
        let (ymin, ymax) = range(points.iter().map(|p| p.y).collect());
        (
            Point2D::new(xmin - padding, ymin - padding),
            Point2D::new(xmax + padding, ymax + padding),
        )
    }
}
