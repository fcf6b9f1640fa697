//! Trial bookkeeping for the exercise sequencer

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::fmt;

use comms_if::{cmd::Movement, eqpt::Side};
use log::debug;
use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Where the run currently is.
#[derive(Debug, Clone, Serialize)]
pub struct TrialState {
    /// Current trial number, 1-based. Zero before the first trial starts.
    pub iteration: u32,

    /// Movement of the current trial, `None` until one is selected.
    pub movement: Option<Movement>,

    /// The exercised arm.
    pub side: Side,

    pub phase: Phase,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Phase of the exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// Stiffness ramping up at the measured posture.
    ImpedanceRampUp,

    /// Moving to the start posture.
    MoveToStart,

    /// Waiting for the operator to select a movement.
    AwaitingSelection,

    /// Waiting for the go command.
    AwaitingStart,

    /// Executing the selected movement.
    Moving,

    /// Holding at the end of the movement.
    Holding,

    /// Returning to the start posture.
    ReturningHome,

    /// Holding at the start posture.
    HoldingHome,

    /// Overrides being removed.
    Shutdown,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrialState {
    pub fn new(side: Side) -> Self {
        Self {
            iteration: 0,
            movement: None,
            side,
            phase: Phase::ImpedanceRampUp,
        }
    }

    /// Start the next trial, returning its number.
    pub fn begin_trial(&mut self) -> u32 {
        self.iteration += 1;
        self.movement = None;
        self.enter(Phase::AwaitingSelection);
        self.iteration
    }

    pub fn enter(&mut self, phase: Phase) {
        debug!("Trial {}: {} -> {}", self.iteration, self.phase, phase);
        self.phase = phase;
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_begin_trial() {
        let mut s = TrialState::new(Side::Left);
        s.movement = Some(Movement::X);
        s.enter(Phase::MoveToStart);

        assert_eq!(s.begin_trial(), 1);
        assert_eq!(s.movement, None);
        assert_eq!(s.phase, Phase::AwaitingSelection);
        assert_eq!(s.begin_trial(), 2);
    }
}
