//! # Joint space interpolation
//!
//! Straight line interpolation between two postures. [`interpolate`] is a
//! pure function which allows extrapolation when `step > total_steps`;
//! [`Segment`] wraps a start and finish posture and refuses to overshoot.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use util::maths::lerp_step;

use crate::joints::{JointLayout, JointVector, RESERVED_INDEX};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A straight line motion from one posture to another over a fixed number of
/// steps.
#[derive(Debug, Clone)]
pub struct Segment {
    start: JointVector,
    finish: JointVector,
    total_steps: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InterpError {
    #[error("Start and finish postures have different layouts ({0:?} and {1:?})")]
    LayoutMismatch(JointLayout, JointLayout),

    #[error("Cannot interpolate over zero steps")]
    ZeroSteps,

    #[error("Step {step} is past the end of a {total}-step segment")]
    Overshoot { step: u64, total: u64 },
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the posture `step` steps out of `total_steps` along the straight
/// line from `start` to `finish`.
///
/// For every joint `i`: `start[i] + (finish[i] - start[i]) * step / total`.
/// `step == 0` gives `start` and `step == total_steps` gives `finish` to
/// within floating point rounding. The reserved slot is always `0.0`.
pub fn interpolate(
    start: &JointVector,
    finish: &JointVector,
    step: u64,
    total_steps: u64,
) -> Result<JointVector, InterpError> {
    if start.layout() != finish.layout() {
        return Err(InterpError::LayoutMismatch(start.layout(), finish.layout()));
    }
    if total_steps == 0 {
        return Err(InterpError::ZeroSteps);
    }

    let step = step as f64;
    let total = total_steps as f64;

    let data = start
        .as_slice()
        .iter()
        .zip(finish.as_slice().iter())
        .enumerate()
        .map(|(i, (s, f))| match i {
            RESERVED_INDEX => 0.0,
            _ => lerp_step(*s, *f, step, total),
        })
        .collect();

    Ok(JointVector::from_raw(start.layout(), data))
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Segment {
    pub fn new(
        start: JointVector,
        finish: JointVector,
        total_steps: u64,
    ) -> Result<Self, InterpError> {
        if start.layout() != finish.layout() {
            return Err(InterpError::LayoutMismatch(start.layout(), finish.layout()));
        }
        if total_steps == 0 {
            return Err(InterpError::ZeroSteps);
        }

        Ok(Self {
            start,
            finish,
            total_steps,
        })
    }

    /// Posture at the given step, which must not exceed the segment length.
    pub fn at(&self, step: u64) -> Result<JointVector, InterpError> {
        if step > self.total_steps {
            return Err(InterpError::Overshoot {
                step,
                total: self.total_steps,
            });
        }

        interpolate(&self.start, &self.finish, step, self.total_steps)
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }
}
