//! Driver-side mission logic for interactive trajectory optimization

pub mod run_mode;
pub mod session;

pub use run_mode::{ModeEvent, RunMode, RunModeMachine};
pub use session::{ChompSession, DragState, SessionConfig};
