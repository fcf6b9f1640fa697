//! # Exoskeleton Equipment Types
//!
//! Types crossing the boundary between the exercise software and the
//! exoskeleton driver. Joint angles are in radians, stiffnesses in Nm/rad,
//! torques in Nm and end effector positions in millimetres.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A commanded (position, stiffness) pair for one joint, superseding the
/// device's default control law for that joint.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct JointOverride {
    /// Target position of the joint.
    ///
    /// Units: radians
    pub position_rad: f64,

    /// Stiffness of the virtual spring pulling the joint to the target.
    ///
    /// Units: Nm/rad
    pub stiffness_nm_per_rad: f64,
}

/// Measured state of one joint.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct JointState {
    /// Units: radians
    pub position_rad: f64,

    /// Units: Nm
    pub torque_nm: f64,
}

/// Ordered joint states of every joint group.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JointStates {
    pub left: Vec<JointState>,
    pub right: Vec<JointState>,

    /// Empty when the device has no torso controller.
    pub torso: Vec<JointState>,
}

/// A cartesian position.
///
/// Units: millimetres
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PositionMm {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// End effector positions of both arms.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EndEffectorPoses {
    pub left: PositionMm,
    pub right: PositionMm,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The arm being exercised. The other arm holds a transfer posture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// A group of joints driven by one controller on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JointGroup {
    LeftArm,
    RightArm,
    Torso,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl JointOverride {
    pub fn new(position_rad: f64, stiffness_nm_per_rad: f64) -> Self {
        Self {
            position_rad,
            stiffness_nm_per_rad,
        }
    }
}

impl JointStates {
    /// States of the given group.
    pub fn group(&self, group: JointGroup) -> &[JointState] {
        match group {
            JointGroup::LeftArm => &self.left,
            JointGroup::RightArm => &self.right,
            JointGroup::Torso => &self.torso,
        }
    }
}

impl Side {
    /// The arm controller of this side.
    pub fn arm(self) -> JointGroup {
        match self {
            Side::Left => JointGroup::LeftArm,
            Side::Right => JointGroup::RightArm,
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "l" | "left" => Ok(Side::Left),
            "r" | "right" => Ok(Side::Right),
            other => Err(format!("side must be one of left, right (got \"{}\")", other)),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "LEFT"),
            Side::Right => write!(f, "RIGHT"),
        }
    }
}

impl fmt::Display for JointGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JointGroup::LeftArm => write!(f, "left arm"),
            JointGroup::RightArm => write!(f, "right arm"),
            JointGroup::Torso => write!(f, "torso"),
        }
    }
}
