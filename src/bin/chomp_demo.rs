//
// CHOMP trajectory optimization for a point robot in the plane.
//
// Starts from a jumbled trajectory between (-5, -5) and (7, 7), with two
// circular obstacles, then runs the optimizer for a fixed number of ticks.
// Midway one obstacle is dragged onto the path to show the optimizer
// reacting to a moving obstacle. The result is saved as PNG and SVG.
//
// Set RUST_LOG=debug to see per-iteration costs.

use log::{error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use rust_chomp::common::{Point2D, Visualizable};
use rust_chomp::mission_planning::{ChompSession, SessionConfig};
use rust_chomp::path_planning::chomp::{ChompConfig, ObstaclePotential};
use rust_chomp::utils::Visualizer;

const NUM_TICKS: usize = 600;
const PNG_PATH: &str = "img/chomp_result.png";
const SVG_PATH: &str = "img/chomp_result.svg";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("CHOMP demo start!!");

    let config = SessionConfig {
        chomp: ChompConfig::default()
            .with_lambda(10.0)
            .with_potential(ObstaclePotential::cubic(10.0, 1.0)),
        ..SessionConfig::default()
    };
    let mut session = match ChompSession::new(config) {
        Ok(session) => session,
        Err(e) => {
            error!("cannot create session: {}", e);
            return;
        }
    };

    let mut rng = StdRng::seed_from_u64(42);
    if let Err(e) = session.jumble(&mut rng) {
        error!("cannot jumble trajectory: {}", e);
        return;
    }
    session.toggle_run();

    for tick in 0..NUM_TICKS {
        if tick == NUM_TICKS / 2 {
            // drag the first obstacle onto the middle of the straight line
            let grabbed = session.grab_at(Point2D::new(3.0, 0.0));
            if let Ok(Some(index)) = grabbed {
                info!("dragging obstacle {}", index);
                if let Err(e) = session.update_drag(Point2D::new(1.5, 1.0)) {
                    error!("cannot drag obstacle {}: {}", index, e);
                }
                session.end_drag();
                session.toggle_run();
            }
        }
        match session.tick() {
            Ok(Some(report)) if tick % 100 == 0 => info!(
                "tick {}: smoothness {:.3} obstacle {:.3} step {:.2e}",
                tick, report.smoothness_cost, report.obstacle_cost, report.step_norm
            ),
            Ok(_) => {}
            Err(e) => {
                error!("optimizer failed: {}", e);
                return;
            }
        }
    }

    info!(
        "final smoothness cost {:.3} after {} iterations",
        session.trajectory().smoothness_cost(),
        session.optimizer().iterations()
    );

    let mut vis = Visualizer::new();
    vis.set_title("CHOMP");
    session.visualize(&mut vis);
    if let Err(e) = std::fs::create_dir_all("img") {
        error!("cannot create output directory: {}", e);
        return;
    }
    match vis.save_png(PNG_PATH, 800, 800) {
        Ok(()) => info!("Plot saved to: {}", PNG_PATH),
        Err(e) => error!("cannot save plot: {}", e),
    }
    match vis.save_svg(SVG_PATH, 800, 800) {
        Ok(()) => info!("Plot saved to: {}", SVG_PATH),
        Err(e) => error!("cannot save plot: {}", e),
    }

    info!("CHOMP demo finish!!");
}
