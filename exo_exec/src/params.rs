//! # Exoskeleton Executable Parameters
//!
//! This module provides the parameters of the exercise executable, loaded from
//! `params/exo_exec.toml`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{
    device::SimExoParams,
    joints::{JointLayout, JointLayoutParams},
    override_codec::StiffnessParams,
    sequencer::{PoseTable, SequencerParams},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExoExecParams {

    /// Directory the trial logs are written to, relative to the working directory
    pub log_dir: String,

    /// Length of the countdown before the exercise starts
    ///
    /// Units: seconds
    pub countdown_s: u32,

    pub sequencer: SequencerParams,

    pub layout: JointLayoutParams,

    pub stiffness: StiffnessParams,

    pub poses: PoseTable,

    /// Parameters of the simulated device
    pub sim: SimExoParams,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ExoExecParams {
    fn default() -> Self {
        Self {
            log_dir: String::from("log"),
            countdown_s: 3,
            sequencer: SequencerParams::default(),
            layout: JointLayoutParams::default(),
            stiffness: StiffnessParams::default(),
            poses: PoseTable::default(),
            sim: SimExoParams::default(),
        }
    }
}

impl ExoExecParams {
    pub fn joint_layout(&self) -> JointLayout {
        JointLayout::from_params(&self.layout)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let p: ExoExecParams = util::params::from_str(
            r#"
            log_dir = "logs"

            [sequencer]
            max_trials = 5

            [layout]
            wrist_mods = true
            "#,
        )
        .unwrap();

        assert_eq!(p.sequencer.max_trials, 5);
        assert_eq!(p.sequencer.sample_rate_hz, 200.0);
        assert_eq!(p.joint_layout(), JointLayout::new(9, 0));
        assert_eq!(p.stiffness.elbow_nm_per_rad, 15.0);
        assert_eq!(p.poses.home_right_deg.len(), 7);
        assert_eq!(p.countdown_s, 3);
        assert_eq!(p.log_dir, "logs");
    }

    #[test]
    fn test_shipped_params_are_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../params/exo_exec.toml");
        let p: ExoExecParams = util::params::load_from_path(path).unwrap();
        let layout = p.joint_layout();

        assert!(p.sequencer.validate().is_ok());
        assert!(p.stiffness.validate().is_ok());
        assert!(p.poses.validate(layout).is_ok());
        assert_eq!(p.poses.endpoints_left_rad.x, PoseTable::default().endpoints_left_rad.x);
    }
}
