//! Parameters structure for the exercise sequencer

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use util::maths::lin_map;

use super::SequencerError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Timing and flow parameters of the exercise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerParams {

    // ---- TIMING ----

    /// Control loop rate.
    ///
    /// Units: Hz
    pub sample_rate_hz: f64,

    /// Duration of the impedance ramp at startup.
    ///
    /// Units: seconds
    pub ramp_s: f64,

    /// Duration of the motion to the start posture.
    ///
    /// Units: seconds
    pub start_pos_s: f64,

    /// Duration of the exercise movement if it is not stopped early.
    ///
    /// Units: seconds
    pub begin_ex_s: f64,

    /// Hold time at the end of the movement.
    ///
    /// Units: seconds
    pub wait_s: f64,

    /// Duration of the return to the start posture.
    ///
    /// Units: seconds
    pub back_to_start_s: f64,

    /// Hold time back at the start posture.
    ///
    /// Units: seconds
    pub wait2_s: f64,

    // ---- FLOW ----

    /// Number of trials in a run.
    pub max_trials: u32,

    /// Shape of the impedance ramp.
    pub ramp_mode: RampMode,

    /// A MOVING record is logged every this many ticks of the movement.
    pub moving_log_every: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Shape of the stiffness scaling during the impedance ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RampMode {
    /// Scaling rises linearly as `i / n` over the ramp.
    Linear,

    /// Scaling is the integer quotient `i / n`, which is zero for the whole
    /// ramp. Full stiffness is only applied when the move to start begins.
    Stepped,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SequencerParams {
    fn default() -> Self {
        Self {
            sample_rate_hz: 200.0,
            ramp_s: 4.0,
            start_pos_s: 5.0,
            begin_ex_s: 6.0,
            wait_s: 3.0,
            back_to_start_s: 2.0,
            wait2_s: 3.0,
            max_trials: 20,
            ramp_mode: RampMode::Linear,
            moving_log_every: 2,
        }
    }
}

impl SequencerParams {
    /// Number of ticks spanning the given duration.
    pub fn steps(&self, duration_s: f64) -> u64 {
        (duration_s * self.sample_rate_hz).round().max(0.0) as u64
    }

    /// Check the parameters describe a runnable exercise.
    pub fn validate(&self) -> Result<(), SequencerError> {
        let invalid = |msg: String| Err(SequencerError::InvalidParams(msg));

        if !(self.sample_rate_hz > 0.0 && self.sample_rate_hz <= 1000.0) {
            return invalid(format!(
                "sample_rate_hz must be in (0, 1000], found {}", self.sample_rate_hz
            ));
        }

        for (name, value) in [
            ("ramp_s", self.ramp_s),
            ("start_pos_s", self.start_pos_s),
            ("begin_ex_s", self.begin_ex_s),
            ("wait_s", self.wait_s),
            ("back_to_start_s", self.back_to_start_s),
            ("wait2_s", self.wait2_s),
        ].iter() {
            if !(*value >= 0.0) {
                return invalid(format!("{} must not be negative, found {}", name, value));
            }
        }

        // Interpolated phases need at least one step
        for (name, value) in [
            ("start_pos_s", self.start_pos_s),
            ("back_to_start_s", self.back_to_start_s),
        ].iter() {
            if self.steps(*value) == 0 {
                return invalid(format!("{} is shorter than one tick", name));
            }
        }

        if self.moving_log_every == 0 {
            return invalid(String::from("moving_log_every must be at least 1"));
        }

        Ok(())
    }
}

impl RampMode {
    /// Stiffness scaling at tick `i` of an `n` tick ramp.
    pub fn scaling(self, i: u64, n: u64) -> f64 {
        if n == 0 {
            return 1.0;
        }

        match self {
            RampMode::Linear => lin_map((0.0, n as f64), (0.0, 1.0), i as f64),
            RampMode::Stepped => (i / n) as f64,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_steps() {
        let p = SequencerParams::default();
        assert_eq!(p.steps(p.ramp_s), 800);
        assert_eq!(p.steps(p.start_pos_s), 1000);
        assert_eq!(p.steps(p.begin_ex_s), 1200);
        assert_eq!(p.steps(0.0), 0);
    }

    #[test]
    fn test_ramp_modes() {
        assert_eq!(RampMode::Linear.scaling(0, 800), 0.0);
        assert_eq!(RampMode::Linear.scaling(400, 800), 0.5);
        assert!(RampMode::Linear.scaling(799, 800) < 1.0);

        assert_eq!(RampMode::Stepped.scaling(0, 800), 0.0);
        assert_eq!(RampMode::Stepped.scaling(799, 800), 0.0);

        assert_eq!(RampMode::Linear.scaling(0, 0), 1.0);
    }

    #[test]
    fn test_validate() {
        assert!(SequencerParams::default().validate().is_ok());

        let mut p = SequencerParams::default();
        p.sample_rate_hz = 0.0;
        assert!(p.validate().is_err());

        let mut p = SequencerParams::default();
        p.back_to_start_s = 0.001;
        assert!(p.validate().is_err());

        let mut p = SequencerParams::default();
        p.wait_s = -1.0;
        assert!(p.validate().is_err());

        let mut p = SequencerParams::default();
        p.moving_log_every = 0;
        assert!(p.validate().is_err());

        let p: SequencerParams = util::params::from_str("ramp_mode = \"stepped\"").unwrap();
        assert_eq!(p.ramp_mode, RampMode::Stepped);
        assert_eq!(p.max_trials, 20);
    }
}
