//! # Joint layout and joint vectors
//!
//! A [`JointVector`] is the flat representation of a whole-device posture:
//!
//! ```text
//! index:  0 | 1 ..= A | A+1 ..= 2A | 2A+1 .. 2A+1+T
//!         - |  left   |   right    |     torso
//! ```
//!
//! where `A` is the arm joint count and `T` the torso joint count. Index 0 is
//! a reserved slot which is always `0.0`. It carries no meaning but is kept so
//! that vectors line up with the column layout of existing trajectory files.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::ops::{Index, Range};

use comms_if::eqpt::{JointGroup, JointState, JointStates};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of joints on each arm of the standard device.
pub const ARM_JOINT_COUNT: usize = 7;

/// Number of joints on each arm when the wrist modifications are fitted
/// (wrist abduction and wrist flexion are added).
pub const WRIST_MODS_ARM_JOINT_COUNT: usize = 9;

/// Index of the reserved leading slot.
pub const RESERVED_INDEX: usize = 0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Capability flags selecting the joint layout, loaded from parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JointLayoutParams {
    /// Whether the wrist modifications are fitted to both arms.
    pub wrist_mods: bool,

    /// Number of torso joints under override control, 0 for none.
    pub torso_joints: usize,
}

/// Joint counts of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointLayout {
    pub arm_joints: usize,
    pub torso_joints: usize,
}

/// A posture of the whole device, see the module documentation for the
/// layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JointVector {
    layout: JointLayout,
    data: Vec<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum JointVectorError {
    #[error("Expected {expected} joints for the {group}, found {found}")]
    WrongJointCount {
        group: JointGroup,
        expected: usize,
        found: usize,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl JointLayout {
    pub fn new(arm_joints: usize, torso_joints: usize) -> Self {
        Self {
            arm_joints,
            torso_joints,
        }
    }

    pub fn from_params(params: &JointLayoutParams) -> Self {
        let arm_joints = match params.wrist_mods {
            true => WRIST_MODS_ARM_JOINT_COUNT,
            false => ARM_JOINT_COUNT,
        };

        Self::new(arm_joints, params.torso_joints)
    }

    /// Total length of a joint vector, including the reserved slot.
    pub fn len(&self) -> usize {
        2 * self.arm_joints + self.torso_joints + 1
    }

    pub fn has_torso(&self) -> bool {
        self.torso_joints > 0
    }

    /// The joint groups with an active controller, in command order.
    pub fn groups(&self) -> Vec<JointGroup> {
        let mut groups = vec![JointGroup::LeftArm, JointGroup::RightArm];
        if self.has_torso() {
            groups.push(JointGroup::Torso);
        }
        groups
    }

    /// Number of joints in the given group.
    pub fn group_len(&self, group: JointGroup) -> usize {
        match group {
            JointGroup::LeftArm | JointGroup::RightArm => self.arm_joints,
            JointGroup::Torso => self.torso_joints,
        }
    }

    /// Range of vector indices holding the given group.
    pub fn range(&self, group: JointGroup) -> Range<usize> {
        let a = self.arm_joints;
        match group {
            JointGroup::LeftArm => 1..a + 1,
            JointGroup::RightArm => a + 1..2 * a + 1,
            JointGroup::Torso => 2 * a + 1..self.len(),
        }
    }
}

impl Default for JointLayout {
    fn default() -> Self {
        Self::new(ARM_JOINT_COUNT, 0)
    }
}

impl JointVector {
    /// An all-zero vector.
    pub fn zeros(layout: JointLayout) -> Self {
        Self {
            layout,
            data: vec![0.0; layout.len()],
        }
    }

    /// Build a vector from per-group joint values.
    ///
    /// `torso` must be empty if the layout has no torso.
    pub fn from_groups(
        layout: JointLayout,
        left: &[f64],
        right: &[f64],
        torso: &[f64],
    ) -> Result<Self, JointVectorError> {
        let mut v = Self::zeros(layout);

        for (group, values) in [
            (JointGroup::LeftArm, left),
            (JointGroup::RightArm, right),
            (JointGroup::Torso, torso),
        ]
        .iter()
        {
            let expected = layout.group_len(*group);
            if values.len() != expected {
                return Err(JointVectorError::WrongJointCount {
                    group: *group,
                    expected,
                    found: values.len(),
                });
            }
            v.data[layout.range(*group)].copy_from_slice(values);
        }

        Ok(v)
    }

    /// Build a vector from the measured joint positions.
    pub fn from_states(
        layout: JointLayout,
        states: &JointStates,
    ) -> Result<Self, JointVectorError> {
        let positions = |s: &[JointState]| -> Vec<f64> {
            s.iter().map(|j| j.position_rad).collect()
        };

        // A device without a torso controller reports no torso states
        let torso = match layout.has_torso() {
            true => positions(&states.torso),
            false => vec![],
        };

        Self::from_groups(layout, &positions(&states.left), &positions(&states.right), &torso)
    }

    /// Build a vector from raw data, including the reserved slot.
    ///
    /// The reserved slot is forced to `0.0`.
    pub(crate) fn from_raw(layout: JointLayout, mut data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), layout.len());
        data[RESERVED_INDEX] = 0.0;
        Self { layout, data }
    }

    pub fn layout(&self) -> JointLayout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Joint values of the given group.
    pub fn group(&self, group: JointGroup) -> &[f64] {
        &self.data[self.layout.range(group)]
    }

    pub fn left(&self) -> &[f64] {
        self.group(JointGroup::LeftArm)
    }

    pub fn right(&self) -> &[f64] {
        self.group(JointGroup::RightArm)
    }

    pub fn torso(&self) -> &[f64] {
        self.group(JointGroup::Torso)
    }

    /// Largest absolute per-joint difference to another vector, or `None` if
    /// the layouts differ.
    pub fn max_abs_diff(&self, other: &JointVector) -> Option<f64> {
        if self.layout != other.layout {
            return None;
        }

        Some(self.data
            .iter()
            .zip(other.data.iter())
            .fold(0.0, |acc, (a, b)| f64::max(acc, (a - b).abs())))
    }
}

impl Index<usize> for JointVector {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.data[index]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_layout_ranges() {
        let layout = JointLayout::new(7, 3);
        assert_eq!(layout.len(), 18);
        assert_eq!(layout.range(JointGroup::LeftArm), 1..8);
        assert_eq!(layout.range(JointGroup::RightArm), 8..15);
        assert_eq!(layout.range(JointGroup::Torso), 15..18);
        assert_eq!(layout.groups().len(), 3);

        let layout = JointLayout::from_params(&JointLayoutParams {
            wrist_mods: true,
            torso_joints: 0,
        });
        assert_eq!(layout.len(), 19);
        assert!(layout.range(JointGroup::Torso).is_empty());
        assert_eq!(layout.groups(), vec![JointGroup::LeftArm, JointGroup::RightArm]);
    }

    #[test]
    fn test_from_groups() {
        let layout = JointLayout::new(2, 1);
        let v = JointVector::from_groups(layout, &[1.0, 2.0], &[3.0, 4.0], &[5.0]).unwrap();

        assert_eq!(v.as_slice(), &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(v.left(), &[1.0, 2.0]);
        assert_eq!(v.right(), &[3.0, 4.0]);
        assert_eq!(v.torso(), &[5.0]);
        assert_eq!(v[RESERVED_INDEX], 0.0);

        assert_eq!(
            JointVector::from_groups(layout, &[1.0], &[3.0, 4.0], &[5.0]),
            Err(JointVectorError::WrongJointCount {
                group: JointGroup::LeftArm,
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_from_states_ignores_torso_without_controller() {
        let layout = JointLayout::new(1, 0);
        let state = |p| JointState { position_rad: p, torque_nm: 0.0 };
        let states = JointStates {
            left: vec![state(0.1)],
            right: vec![state(0.2)],
            torso: vec![state(0.3)],
        };

        let v = JointVector::from_states(layout, &states).unwrap();
        assert_eq!(v.as_slice(), &[0.0, 0.1, 0.2]);
    }

    #[test]
    fn test_from_raw_clears_reserved_slot() {
        let v = JointVector::from_raw(JointLayout::new(1, 0), vec![9.0, 1.0, 2.0]);
        assert_eq!(v.as_slice(), &[0.0, 1.0, 2.0]);
    }
}
