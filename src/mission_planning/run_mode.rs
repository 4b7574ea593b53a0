//! Run / pause / single-step mode of an interactive optimization session
//!
//! The optimizer itself has no notion of pausing; the session consults this
//! state machine once per tick to decide whether to call it.

use std::fmt;

use log::debug;

/// Driver run mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunMode {
    /// Ticks are ignored
    Paused,
    /// The next tick runs one step, then the mode falls back to `Paused`
    SingleStep,
    /// Every tick runs one step
    Running,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunMode::Paused => "paused",
            RunMode::SingleStep => "single-step",
            RunMode::Running => "running",
        };
        write!(f, "{}", name)
    }
}

/// Events accepted by [`RunModeMachine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeEvent {
    /// Request exactly one step
    Step,
    /// Toggle between running and paused
    ToggleRun,
    /// Start running unconditionally (e.g. an obstacle was grabbed)
    Run,
    /// Stop
    Pause,
    /// A tick was consumed by the optimizer
    Ticked,
}

impl RunMode {
    /// Transition table
    pub fn next(self, event: ModeEvent) -> RunMode {
        match (self, event) {
            (_, ModeEvent::Step) => RunMode::SingleStep,
            (RunMode::Running, ModeEvent::ToggleRun) => RunMode::Paused,
            (_, ModeEvent::ToggleRun) => RunMode::Running,
            (_, ModeEvent::Run) => RunMode::Running,
            (_, ModeEvent::Pause) => RunMode::Paused,
            (RunMode::SingleStep, ModeEvent::Ticked) => RunMode::Paused,
            (mode, ModeEvent::Ticked) => mode,
        }
    }

    /// Whether a tick in this mode should invoke the optimizer
    pub fn accepts_tick(self) -> bool {
        self != RunMode::Paused
    }
}

/// Run-mode state machine with a transition log
#[derive(Debug, Clone)]
pub struct RunModeMachine {
    current: RunMode,
    history: Vec<(RunMode, ModeEvent, RunMode)>,
}

impl RunModeMachine {
    pub fn new(initial: RunMode) -> Self {
        RunModeMachine { current: initial, history: Vec::new() }
    }

    pub fn current(&self) -> RunMode {
        self.current
    }

    /// Apply an event, returning the new mode
    pub fn process(&mut self, event: ModeEvent) -> RunMode {
        let next = self.current.next(event);
        if next != self.current {
            debug!("run mode <{}> -> <{}> on [{:?}]", self.current, next, event);
            self.history.push((self.current, event, next));
            self.current = next;
        }
        self.current
    }

    /// Transitions that changed the mode, oldest first
    pub fn history(&self) -> &[(RunMode, ModeEvent, RunMode)] {
        &self.history
    }
}

impl Default for RunModeMachine {
    fn default() -> Self {
        Self::new(RunMode::Paused)
    }
}
