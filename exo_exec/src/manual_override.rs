//! # Manual override
//!
//! One-shot control of a single arm controller, used to put an arm into a
//! known posture or hand it back to the device's own control law outside of
//! an exercise run.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::str::FromStr;

use comms_if::eqpt::{JointOverride, Side};
use log::info;

use crate::{
    device::{DeviceError, ExoDevice},
    joints::JointLayout,
    override_codec::StiffnessClass,
};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// What to do with the arm controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideMode {
    /// Remove every override, returning the arm to the device control law.
    Harmony,

    /// Override every joint with the given positions and stiffnesses.
    Joints,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ManualOverrideError {
    #[error("Mode must be one of harmony, joints (got \"{0}\")")]
    InvalidMode(String),

    #[error("\"{0}\" is not a number")]
    InvalidNumber(String),

    #[error("Joints data must have {expected} values (position and stiffness per joint), found {found}")]
    WrongValueCount { expected: usize, found: usize },

    #[error("Joint {joint} stiffness of {value} Nm/rad is outside [0, {max}] Nm/rad")]
    StiffnessOutOfRange { joint: usize, value: f64, max: f64 },

    #[error("Joints mode requires override data")]
    MissingData,

    #[error("Device error: {0}")]
    DeviceError(#[from] DeviceError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Parse whitespace separated `position stiffness` pairs, one pair per arm
/// joint. Stiffnesses are checked against the limits of each joint's drive.
pub fn parse_joint_overrides(
    data: &str,
    layout: &JointLayout,
) -> Result<Vec<JointOverride>, ManualOverrideError> {
    let values = data
        .split_whitespace()
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| ManualOverrideError::InvalidNumber(s.to_string()))
        })
        .collect::<Result<Vec<f64>, _>>()?;

    let expected = 2 * layout.arm_joints;
    if values.len() != expected {
        return Err(ManualOverrideError::WrongValueCount {
            expected,
            found: values.len(),
        });
    }

    values
        .chunks(2)
        .enumerate()
        .map(|(joint, pair)| {
            let max = StiffnessClass::for_joint(joint, layout).max_nm_per_rad();
            if !(0.0..=max).contains(&pair[1]) {
                return Err(ManualOverrideError::StiffnessOutOfRange {
                    joint,
                    value: pair[1],
                    max,
                });
            }
            Ok(JointOverride::new(pair[0], pair[1]))
        })
        .collect()
}

/// Initialise the device and the arm controller of `side`, then apply the
/// override.
pub fn apply<D: ExoDevice>(
    device: &mut D,
    side: Side,
    mode: OverrideMode,
    overrides: Option<&[JointOverride]>,
) -> Result<(), ManualOverrideError> {
    let group = side.arm();

    device.init()?;
    device.init_controller(group)?;

    match mode {
        OverrideMode::Harmony => {
            device.remove_override(group)?;
            info!("{} override removed", group);
        }
        OverrideMode::Joints => {
            let overrides = overrides.ok_or(ManualOverrideError::MissingData)?;
            device.set_joints_override(group, overrides)?;
            info!("{} override set", group);
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FromStr for OverrideMode {
    type Err = ManualOverrideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "harmony" => Ok(OverrideMode::Harmony),
            "joints" => Ok(OverrideMode::Joints),
            other => Err(ManualOverrideError::InvalidMode(other.to_string())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::device::{SimExo, SimExoParams};
    use comms_if::eqpt::JointGroup;

    const DATA: &str = "0.1 15 0.2 15 0.3 15 0.4 15 0.5 15 0.6 10 0.7 1.5";

    #[test]
    fn test_parse() {
        let layout = JointLayout::default();
        let o = parse_joint_overrides(DATA, &layout).unwrap();

        assert_eq!(o.len(), 7);
        assert_eq!(o[5], JointOverride::new(0.6, 10.0));

        assert_eq!(
            parse_joint_overrides("0.1 15", &layout),
            Err(ManualOverrideError::WrongValueCount { expected: 14, found: 2 })
        );
        assert_eq!(
            parse_joint_overrides("0.1 abc", &layout),
            Err(ManualOverrideError::InvalidNumber("abc".into()))
        );

        let too_stiff = DATA.replace("0.7 1.5", "0.7 4");
        assert_eq!(
            parse_joint_overrides(&too_stiff, &layout),
            Err(ManualOverrideError::StiffnessOutOfRange { joint: 6, value: 4.0, max: 3.0 })
        );
    }

    #[test]
    fn test_mode() {
        assert_eq!("Harmony".parse(), Ok(OverrideMode::Harmony));
        assert_eq!("joints".parse(), Ok(OverrideMode::Joints));
        assert!("torque".parse::<OverrideMode>().is_err());
    }

    #[test]
    fn test_apply() {
        let layout = JointLayout::default();
        let mut sim = SimExo::new(layout, SimExoParams::default());
        let o = parse_joint_overrides(DATA, &layout).unwrap();

        apply(&mut sim, Side::Left, OverrideMode::Joints, Some(&o)).unwrap();
        assert_eq!(sim.active_overrides(JointGroup::LeftArm), Some(&o[..]));
        assert!(sim.active_overrides(JointGroup::RightArm).is_none());

        apply(&mut sim, Side::Left, OverrideMode::Harmony, None).unwrap();
        assert_eq!(sim.num_removals(JointGroup::LeftArm), 1);

        assert_eq!(
            apply(&mut sim, Side::Right, OverrideMode::Joints, None),
            Err(ManualOverrideError::MissingData)
        );
    }
}
