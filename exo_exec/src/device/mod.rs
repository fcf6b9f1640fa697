//! # Exoskeleton Device Module
//!
//! This module provides a unified interface to the exoskeleton, abstracting over the real device
//! driver and the simulated device used for dry runs and tests.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Simulated [`ExoDevice`] implementation.
pub mod sim;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::{EndEffectorPoses, JointGroup, JointOverride, JointStates};

pub use sim::{SimExo, SimExoParams};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Trait to provide a unified API for commanding the exoskeleton.
///
/// Calls are made from the sequencer thread only.
pub trait ExoDevice {

    /// Initialise the device. Must be called before anything else.
    fn init(&mut self) -> Result<(), DeviceError>;

    /// Initialise the controller of one joint group. Must be called for every active group
    /// before overrides are sent to it.
    fn init_controller(&mut self, group: JointGroup) -> Result<(), DeviceError>;

    /// Read the current state of every joint.
    fn joint_states(&mut self) -> Result<JointStates, DeviceError>;

    /// Read the end effector positions of both arms.
    fn end_effector_poses(&mut self) -> Result<EndEffectorPoses, DeviceError>;

    /// Override the position and stiffness of every joint in a group.
    ///
    /// ## Arguments
    /// - `group` - The controller to command
    /// - `overrides` - One override per joint of the group, in joint order. A slice of the wrong
    ///   length will be rejected.
    fn set_joints_override(
        &mut self,
        group: JointGroup,
        overrides: &[JointOverride]
    ) -> Result<(), DeviceError>;

    /// Remove all overrides from a group, returning it to its default control law.
    fn remove_override(&mut self, group: JointGroup) -> Result<(), DeviceError>;
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum DeviceError {
    #[error("The device has not been initialised")]
    NotInitialised,

    #[error("Could not initialise the device: {0}")]
    InitFailed(String),

    #[error("The {0} controller has not been initialised")]
    ControllerNotInitialised(JointGroup),

    #[error("The device has no {0} controller")]
    NoSuchController(JointGroup),

    #[error("Expected {expected} joint overrides for the {group}, found {found}")]
    WrongJointCount {
        group: JointGroup,
        expected: usize,
        found: usize
    },

    #[error("Communication with the device failed: {0}")]
    CommFailure(String),
}
