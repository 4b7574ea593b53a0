//! Visualization utilities for rust_chomp
//!
//! Collects lines and points, then renders them onto a single gnuplot
//! axes when the plot is shown or saved.

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth, PointSize, PointSymbol};

use crate::common::{ObstacleSet, Path2D, Point2D, Visualizable};
use crate::mission_planning::ChompSession;
use crate::path_planning::chomp::Trajectory;

/// Segments used to approximate an obstacle circle
const CIRCLE_SEGMENTS: usize = 48;

/// Color palette for consistent styling
pub mod colors {
    pub const OBSTACLE: &str = "#4060D0";
    pub const START: &str = "#CC3333";
    pub const GOAL: &str = "#33CC33";
    pub const PATH: &str = "#333333";
    pub const WAYPOINT: &str = "#808080";
}

/// Style for path rendering
#[derive(Debug, Clone)]
pub struct PathStyle {
    pub color: String,
    pub line_width: f64,
    pub caption: String,
}

impl PathStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            line_width: 1.0,
            caption: caption.to_string(),
        }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }
}

impl Default for PathStyle {
    fn default() -> Self {
        Self::new(colors::PATH, "Trajectory")
    }
}

/// Style for point rendering
#[derive(Debug, Clone)]
pub struct PointStyle {
    pub color: String,
    pub size: f64,
    pub symbol: char,
    pub caption: String,
}

impl PointStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            size: 1.0,
            symbol: 'O',
            caption: caption.to_string(),
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }
}

#[derive(Debug, Clone)]
enum Series {
    Lines { x: Vec<f64>, y: Vec<f64>, style: PathStyle },
    Points { x: Vec<f64>, y: Vec<f64>, style: PointStyle },
}

/// Main visualizer struct
pub struct Visualizer {
    figure: Figure,
    series: Vec<Series>,
    title: String,
    x_range: Option<(f64, f64)>,
    y_range: Option<(f64, f64)>,
}

impl Visualizer {
    pub fn new() -> Self {
        Self {
            figure: Figure::new(),
            series: Vec::new(),
            title: String::new(),
            x_range: None,
            y_range: None,
        }
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    /// Fix the visible region to the box spanned by `min` and `max`
    pub fn set_view(&mut self, min: Point2D, max: Point2D) -> &mut Self {
        self.x_range = Some((min.x, max.x));
        self.y_range = Some((min.y, max.y));
        self
    }

    /// Number of series queued for rendering
    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    pub fn plot_path(&mut self, path: &Path2D, style: &PathStyle) -> &mut Self {
        self.series.push(Series::Lines {
            x: path.x_coords(),
            y: path.y_coords(),
            style: style.clone(),
        });
        self
    }

    pub fn plot_points(&mut self, points: &[Point2D], style: &PointStyle) -> &mut Self {
        self.series.push(Series::Points {
            x: points.iter().map(|p| p.x).collect(),
            y: points.iter().map(|p| p.y).collect(),
            style: style.clone(),
        });
        self
    }

    pub fn plot_start(&mut self, point: Point2D) -> &mut Self {
        self.plot_points(&[point], &PointStyle::new(colors::START, "Start").with_size(1.5))
    }

    pub fn plot_goal(&mut self, point: Point2D) -> &mut Self {
        self.plot_points(&[point], &PointStyle::new(colors::GOAL, "Goal").with_size(1.5))
    }

    /// Plot a circle outline
    pub fn plot_circle(&mut self, center: Point2D, radius: f64, style: &PathStyle) -> &mut Self {
        let outline = Path2D::from_points(circle_outline(center, radius, CIRCLE_SEGMENTS));
        self.plot_path(&outline, style)
    }

    pub fn save_png(&mut self, path: &str, width: u32, height: u32) -> Result<(), String> {
        self.render();
        self.figure.save_to_png(path, width, height).map_err(|e| e.to_string())
    }

    pub fn save_svg(&mut self, path: &str, width: u32, height: u32) -> Result<(), String> {
        self.render();
        self.figure.save_to_svg(path, width, height).map_err(|e| e.to_string())
    }

    fn render(&mut self) {
        self.figure.clear_axes();
        let axes = self.figure.axes2d();
        for series in &self.series {
            match series {
                Series::Lines { x, y, style } => {
                    axes.lines(x, y, &[
                        Caption(&style.caption),
                        Color(&style.color),
                        LineWidth(style.line_width),
                    ]);
                }
                Series::Points { x, y, style } => {
                    axes.points(x, y, &[
                        Caption(&style.caption),
                        Color(&style.color),
                        PointSymbol(style.symbol),
                        PointSize(style.size),
                    ]);
                }
            }
        }

        if !self.title.is_empty() {
            axes.set_title(&self.title, &[]);
        }
        axes.set_x_label("X [m]", &[]);
        axes.set_y_label("Y [m]", &[]);
        if let Some((min, max)) = self.x_range {
            axes.set_x_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        if let Some((min, max)) = self.y_range {
            axes.set_y_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        axes.set_aspect_ratio(AutoOption::Fix(1.0));
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Closed polyline of `segments` chords around a circle
pub fn circle_outline(center: Point2D, radius: f64, segments: usize) -> Vec<Point2D> {
    let segments = segments.max(3);
    (0..=segments)
        .map(|i| {
            let theta = 2.0 * std::f64::consts::PI * i as f64 / segments as f64;
            Point2D::new(center.x + radius * theta.cos(), center.y + radius * theta.sin())
        })
        .collect()
}

impl Visualizable for ObstacleSet {
    fn visualize(&self, vis: &mut Visualizer) {
        for (i, obstacle) in self.iter().enumerate() {
            let caption = if i == 0 { "Obstacles" } else { "" };
            vis.plot_circle(obstacle.center, obstacle.radius(), &PathStyle::new(colors::OBSTACLE, caption));
        }
    }
}

impl Visualizable for Trajectory {
    fn visualize(&self, vis: &mut Visualizer) {
        let path = self.to_path();
        vis.plot_path(&path, &PathStyle::default());
        vis.plot_points(&self.waypoint_positions(), &PointStyle::new(colors::WAYPOINT, "Waypoints"));
        if let (Some(start), Some(goal)) = (path.points.first(), path.points.last()) {
            vis.plot_start(*start);
            vis.plot_goal(*goal);
        }
    }
}

impl Visualizable for ChompSession {
    fn visualize(&self, vis: &mut Visualizer) {
        let (min, max) = self.view_bounds(2.0);
        vis.set_view(min, max);
        self.obstacles().visualize(vis);
        self.trajectory().visualize(vis);
    }
}
