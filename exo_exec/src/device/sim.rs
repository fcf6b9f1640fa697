//! [`ExoDevice`] implementation for a simulated exoskeleton
//!
//! Each overridden joint relaxes towards its target at a rate proportional to its stiffness
//! every time the controller is commanded, which stands in for one control period of the real
//! device. End effector positions come from a simple shoulder/elbow forward kinematics model.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::HashMap;

use comms_if::eqpt::{
    EndEffectorPoses, JointGroup, JointOverride, JointState, JointStates, PositionMm
};
use log::debug;
use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use super::{DeviceError, ExoDevice};
use crate::joints::JointLayout;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const SHOULDER_ABDUCTION: usize = 2;
const SHOULDER_FLEXION: usize = 3;
const SHOULDER_ROTATION: usize = 4;
const ELBOW: usize = 5;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the simulated device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimExoParams {
    /// Fraction of the remaining error closed per command, per unit stiffness.
    ///
    /// Units: rad/Nm
    pub tracking_rate: f64,

    /// Units: millimetres
    pub upper_arm_mm: f64,

    /// Units: millimetres
    pub forearm_mm: f64,

    /// Lateral distance from the body centreline to each shoulder.
    ///
    /// Units: millimetres
    pub shoulder_offset_mm: f64,

    /// Fail every override command after this many have succeeded. Used to exercise fault
    /// handling.
    pub fail_after_overrides: Option<u64>,
}

/// A simulated exoskeleton.
pub struct SimExo {
    params: SimExoParams,
    layout: JointLayout,
    initialised: bool,
    controllers: HashMap<JointGroup, Controller>,
    total_overrides: u64,
}

#[derive(Default)]
struct Controller {
    initialised: bool,
    positions: Vec<f64>,
    active: Option<Vec<JointOverride>>,
    num_override_calls: u64,
    num_removals: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimExoParams {
    fn default() -> Self {
        Self {
            tracking_rate: 0.02,
            upper_arm_mm: 280.0,
            forearm_mm: 250.0,
            shoulder_offset_mm: 200.0,
            fail_after_overrides: None,
        }
    }
}

impl SimExo {
    /// Create a new simulated device with every joint at zero.
    pub fn new(layout: JointLayout, params: SimExoParams) -> Self {
        let controllers = layout
            .groups()
            .into_iter()
            .map(|g| (g, Controller {
                positions: vec![0.0; layout.group_len(g)],
                ..Default::default()
            }))
            .collect();

        Self {
            params,
            layout,
            initialised: false,
            controllers,
            total_overrides: 0,
        }
    }

    /// Set the measured positions of a group directly.
    pub fn set_positions(&mut self, group: JointGroup, positions: &[f64]) -> Result<(), DeviceError> {
        let expected = self.layout.group_len(group);
        let ctrl = self.controllers
            .get_mut(&group)
            .ok_or(DeviceError::NoSuchController(group))?;

        if positions.len() != expected {
            return Err(DeviceError::WrongJointCount {
                group,
                expected,
                found: positions.len()
            });
        }

        ctrl.positions.copy_from_slice(positions);
        Ok(())
    }

    /// Number of successful override commands sent to a group.
    pub fn num_override_calls(&self, group: JointGroup) -> u64 {
        self.controllers.get(&group).map(|c| c.num_override_calls).unwrap_or(0)
    }

    /// Number of override removals requested for a group.
    pub fn num_removals(&self, group: JointGroup) -> u64 {
        self.controllers.get(&group).map(|c| c.num_removals).unwrap_or(0)
    }

    /// Overrides currently in force on a group.
    pub fn active_overrides(&self, group: JointGroup) -> Option<&[JointOverride]> {
        self.controllers.get(&group).and_then(|c| c.active.as_deref())
    }

    fn controller(&mut self, group: JointGroup) -> Result<&mut Controller, DeviceError> {
        if !self.initialised {
            return Err(DeviceError::NotInitialised);
        }

        let ctrl = self.controllers
            .get_mut(&group)
            .ok_or(DeviceError::NoSuchController(group))?;

        match ctrl.initialised {
            true => Ok(ctrl),
            false => Err(DeviceError::ControllerNotInitialised(group))
        }
    }

    fn states_of(&self, group: JointGroup) -> Vec<JointState> {
        let ctrl = match self.controllers.get(&group) {
            Some(c) => c,
            None => return vec![]
        };

        ctrl.positions
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let torque_nm = match &ctrl.active {
                    Some(o) => o[i].stiffness_nm_per_rad * (o[i].position_rad - p),
                    None => 0.0
                };
                JointState { position_rad: *p, torque_nm }
            })
            .collect()
    }

    /// Shoulder/elbow forward kinematics of one arm.
    fn end_effector(&self, group: JointGroup) -> PositionMm {
        let q = |i: usize| -> f64 {
            self.controllers
                .get(&group)
                .and_then(|c| c.positions.get(i).copied())
                .unwrap_or(0.0)
        };

        // The left arm is the mirror image of the right
        let mirror = match group {
            JointGroup::LeftArm => -1.0,
            _ => 1.0
        };

        let shoulder = Vector3::new(mirror * self.params.shoulder_offset_mm, 0.0, 0.0);
        let r_shoulder = Rotation3::from_euler_angles(
            mirror * q(SHOULDER_ABDUCTION),
            q(SHOULDER_FLEXION),
            mirror * q(SHOULDER_ROTATION)
        );
        let r_elbow = Rotation3::from_euler_angles(0.0, q(ELBOW), 0.0);

        let upper = r_shoulder * Vector3::new(0.0, 0.0, -self.params.upper_arm_mm);
        let fore = r_shoulder * r_elbow * Vector3::new(0.0, 0.0, -self.params.forearm_mm);
        let p = shoulder + upper + fore;

        PositionMm { x: p.x, y: p.y, z: p.z }
    }
}

impl ExoDevice for SimExo {
    fn init(&mut self) -> Result<(), DeviceError> {
        debug!("Simulated exoskeleton initialised with {:?}", self.layout);
        self.initialised = true;
        Ok(())
    }

    fn init_controller(&mut self, group: JointGroup) -> Result<(), DeviceError> {
        if !self.initialised {
            return Err(DeviceError::NotInitialised);
        }

        let ctrl = self.controllers
            .get_mut(&group)
            .ok_or(DeviceError::NoSuchController(group))?;
        ctrl.initialised = true;

        Ok(())
    }

    fn joint_states(&mut self) -> Result<JointStates, DeviceError> {
        if !self.initialised {
            return Err(DeviceError::NotInitialised);
        }

        Ok(JointStates {
            left: self.states_of(JointGroup::LeftArm),
            right: self.states_of(JointGroup::RightArm),
            torso: self.states_of(JointGroup::Torso),
        })
    }

    fn end_effector_poses(&mut self) -> Result<EndEffectorPoses, DeviceError> {
        if !self.initialised {
            return Err(DeviceError::NotInitialised);
        }

        Ok(EndEffectorPoses {
            left: self.end_effector(JointGroup::LeftArm),
            right: self.end_effector(JointGroup::RightArm),
        })
    }

    fn set_joints_override(
        &mut self,
        group: JointGroup,
        overrides: &[JointOverride]
    ) -> Result<(), DeviceError> {
        if let Some(limit) = self.params.fail_after_overrides {
            if self.total_overrides >= limit {
                return Err(DeviceError::CommFailure(format!(
                    "simulated failure after {} overrides", limit
                )));
            }
        }

        let expected = self.layout.group_len(group);
        let rate = self.params.tracking_rate;
        let ctrl = self.controller(group)?;

        if overrides.len() != expected {
            return Err(DeviceError::WrongJointCount {
                group,
                expected,
                found: overrides.len()
            });
        }

        for (p, o) in ctrl.positions.iter_mut().zip(overrides.iter()) {
            let alpha = (o.stiffness_nm_per_rad * rate).max(0.0).min(1.0);
            *p += (o.position_rad - *p) * alpha;
        }

        ctrl.active = Some(overrides.to_vec());
        ctrl.num_override_calls += 1;
        self.total_overrides += 1;

        Ok(())
    }

    fn remove_override(&mut self, group: JointGroup) -> Result<(), DeviceError> {
        let ctrl = self.controller(group)?;
        ctrl.active = None;
        ctrl.num_removals += 1;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn init_sim(layout: JointLayout, params: SimExoParams) -> SimExo {
        let mut sim = SimExo::new(layout, params);
        sim.init().unwrap();
        for g in layout.groups() {
            sim.init_controller(g).unwrap();
        }
        sim
    }

    #[test]
    fn test_requires_init() {
        let mut sim = SimExo::new(JointLayout::default(), SimExoParams::default());
        assert_eq!(sim.joint_states(), Err(DeviceError::NotInitialised));

        sim.init().unwrap();
        assert_eq!(
            sim.remove_override(JointGroup::LeftArm),
            Err(DeviceError::ControllerNotInitialised(JointGroup::LeftArm))
        );
        assert_eq!(
            sim.init_controller(JointGroup::Torso),
            Err(DeviceError::NoSuchController(JointGroup::Torso))
        );
    }

    #[test]
    fn test_tracking() {
        let layout = JointLayout::default();
        let mut sim = init_sim(layout, SimExoParams::default());
        let target = vec![JointOverride::new(1.0, 15.0); 7];

        for _ in 0..100 {
            sim.set_joints_override(JointGroup::RightArm, &target).unwrap();
        }

        let states = sim.joint_states().unwrap();
        assert!((states.right[0].position_rad - 1.0).abs() < 1e-6);
        assert_eq!(states.left[0].position_rad, 0.0);
        assert_eq!(sim.num_override_calls(JointGroup::RightArm), 100);

        assert_eq!(
            sim.set_joints_override(JointGroup::RightArm, &target[..3]),
            Err(DeviceError::WrongJointCount {
                group: JointGroup::RightArm,
                expected: 7,
                found: 3
            })
        );

        sim.remove_override(JointGroup::RightArm).unwrap();
        assert!(sim.active_overrides(JointGroup::RightArm).is_none());
        assert_eq!(sim.num_removals(JointGroup::RightArm), 1);
    }

    #[test]
    fn test_forward_kinematics_at_zero() {
        let mut sim = init_sim(JointLayout::default(), SimExoParams::default());
        let poses = sim.end_effector_poses().unwrap();

        assert!((poses.right.x - 200.0).abs() < 1e-9);
        assert!((poses.left.x + 200.0).abs() < 1e-9);
        assert!((poses.right.z + 530.0).abs() < 1e-9);
    }

    #[test]
    fn test_injected_failure() {
        let params = SimExoParams {
            fail_after_overrides: Some(2),
            ..Default::default()
        };
        let mut sim = init_sim(JointLayout::default(), params);
        let target = vec![JointOverride::default(); 7];

        assert!(sim.set_joints_override(JointGroup::LeftArm, &target).is_ok());
        assert!(sim.set_joints_override(JointGroup::RightArm, &target).is_ok());
        assert!(matches!(
            sim.set_joints_override(JointGroup::LeftArm, &target),
            Err(DeviceError::CommFailure(_))
        ));

        // Removal still works after a command failure
        assert!(sim.remove_override(JointGroup::LeftArm).is_ok());
    }
}
