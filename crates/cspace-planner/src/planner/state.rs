//! Solve state machine types

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::PathId;

/// Solve state of a problem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveState {
    /// No attempt in progress
    Idle,
    /// Direct connections between init and goals have been tried
    Prepared,
    /// Growth loop active
    Stepping,
    /// Last attempt produced a path
    Done,
}

impl SolveState {
    /// Whether a new attempt may be prepared
    pub fn can_prepare(&self) -> bool {
        matches!(self, SolveState::Idle | SolveState::Done)
    }

    /// Whether growth steps (and finishing) are allowed
    pub fn can_step(&self) -> bool {
        matches!(self, SolveState::Prepared | SolveState::Stepping)
    }
}

impl fmt::Display for SolveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SolveState::Idle => "Idle",
            SolveState::Prepared => "Prepared",
            SolveState::Stepping => "Stepping",
            SolveState::Done => "Done",
        };
        write!(f, "{}", name)
    }
}

/// Interruption request shared between a running solve and other threads
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request interruption of the running (or next) solve
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Observe and clear the flag
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// Result of a complete `solve`
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    /// Init and a goal ended up connected
    pub solved: bool,
    /// Raw roadmap path in the path store
    pub path_id: Option<PathId>,
    /// Output of the optimizer pipeline, when one ran
    pub optimized_path_id: Option<PathId>,
    /// Growth steps executed
    pub iterations: usize,
    pub interrupted: bool,
    pub elapsed: Duration,
}
