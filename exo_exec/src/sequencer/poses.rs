//! Posture tables for the exercise
//!
//! Home and transfer postures are given in degrees to match the way they are
//! measured on the device, movement endpoints in radians. Every lookup
//! returns a radian [`JointVector`] for the configured layout. Tables shorter
//! than the arm are padded with zeros, which leaves the extra wrist joints of
//! a modified device in their neutral position.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::{cmd::Movement, eqpt::Side};
use serde::{Deserialize, Serialize};

use crate::joints::{JointLayout, JointVector, JointVectorError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// All postures used by the exercise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseTable {
    /// Left arm at rest.
    ///
    /// Units: degrees
    pub home_left_deg: Vec<f64>,

    /// Right arm at rest.
    ///
    /// Units: degrees
    pub home_right_deg: Vec<f64>,

    /// Left arm tucked away while the right arm exercises.
    ///
    /// Units: degrees
    pub transfer_left_deg: Vec<f64>,

    /// Right arm tucked away while the left arm exercises.
    ///
    /// Units: degrees
    pub transfer_right_deg: Vec<f64>,

    /// Torso posture held throughout, if the device has a torso.
    ///
    /// Units: degrees
    pub torso_deg: Vec<f64>,

    /// Endpoints of the left arm movements.
    pub endpoints_left_rad: MovementEndpoints,

    /// Endpoints of the right arm movements.
    pub endpoints_right_rad: MovementEndpoints,
}

/// Arm endpoint of each movement.
///
/// Units: radians
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementEndpoints {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PoseError {
    #[error("Pose table \"{name}\" has {found} joints but the group only has {max}")]
    TooManyJoints {
        name: &'static str,
        found: usize,
        max: usize,
    },

    #[error("Invalid pose: {0}")]
    JointVectorError(#[from] JointVectorError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for PoseTable {
    fn default() -> Self {
        let home_right_deg = vec![6.3, -2.2, -8.0, -6.0, -30.0, -114.0, 10.0];
        let transfer_right_deg = vec![6.3, -2.2, -2.0, 80.0, 88.0, -114.0, 10.0];
        let endpoints_right_rad = MovementEndpoints {
            x: vec![0.200571, -0.0687415, -0.5702, 0.390104, 0.95567, -0.736053, 0.166412],
            y: vec![0.242212, -0.122677, -0.35063, -0.430419, 1.17505, -0.510246, 0.0386217],
            z: vec![0.38315, -0.141666, -0.132891, 0.259636, 1.60026, -0.769595, -0.0552481],
        };

        Self {
            home_left_deg: mirror(&home_right_deg),
            transfer_left_deg: mirror(&transfer_right_deg),
            endpoints_left_rad: endpoints_right_rad.mirrored(),
            home_right_deg,
            transfer_right_deg,
            endpoints_right_rad,
            torso_deg: vec![],
        }
    }
}

impl PoseTable {
    /// Start posture of a trial: the exercised arm at home and the other arm
    /// in its transfer posture.
    pub fn side_active(&self, side: Side, layout: JointLayout) -> Result<JointVector, PoseError> {
        let (left, right) = match side {
            Side::Right => (
                fit_deg("transfer_left_deg", &self.transfer_left_deg, layout.arm_joints)?,
                fit_deg("home_right_deg", &self.home_right_deg, layout.arm_joints)?,
            ),
            Side::Left => (
                fit_deg("home_left_deg", &self.home_left_deg, layout.arm_joints)?,
                fit_deg("transfer_right_deg", &self.transfer_right_deg, layout.arm_joints)?,
            ),
        };

        self.assemble(layout, &left, &right)
    }

    /// Endpoint posture of a movement: the exercised arm at the movement
    /// endpoint and the other arm in its transfer posture.
    pub fn end_point(
        &self,
        side: Side,
        movement: Movement,
        layout: JointLayout,
    ) -> Result<JointVector, PoseError> {
        let a = layout.arm_joints;

        let (left, right) = match side {
            Side::Right => (
                fit_deg("transfer_left_deg", &self.transfer_left_deg, a)?,
                fit("endpoints_right_rad", self.endpoints_right_rad.get(movement), a)?,
            ),
            Side::Left => (
                fit("endpoints_left_rad", self.endpoints_left_rad.get(movement), a)?,
                fit_deg("transfer_right_deg", &self.transfer_right_deg, a)?,
            ),
        };

        self.assemble(layout, &left, &right)
    }

    /// Both arms at home.
    pub fn home(&self, layout: JointLayout) -> Result<JointVector, PoseError> {
        let left = fit_deg("home_left_deg", &self.home_left_deg, layout.arm_joints)?;
        let right = fit_deg("home_right_deg", &self.home_right_deg, layout.arm_joints)?;

        self.assemble(layout, &left, &right)
    }

    /// Check every posture can be built for the layout.
    pub fn validate(&self, layout: JointLayout) -> Result<(), PoseError> {
        self.home(layout)?;
        for side in [Side::Left, Side::Right].iter() {
            self.side_active(*side, layout)?;
            for movement in [Movement::X, Movement::Y, Movement::Z].iter() {
                self.end_point(*side, *movement, layout)?;
            }
        }

        Ok(())
    }

    fn assemble(
        &self,
        layout: JointLayout,
        left: &[f64],
        right: &[f64],
    ) -> Result<JointVector, PoseError> {
        let torso = fit_deg("torso_deg", &self.torso_deg, layout.torso_joints)?;
        Ok(JointVector::from_groups(layout, left, right, &torso)?)
    }
}

impl MovementEndpoints {
    pub fn get(&self, movement: Movement) -> &[f64] {
        match movement {
            Movement::X => &self.x,
            Movement::Y => &self.y,
            Movement::Z => &self.z,
        }
    }

    /// The endpoints of the opposite arm.
    pub fn mirrored(&self) -> Self {
        Self {
            x: mirror(&self.x),
            y: mirror(&self.y),
            z: mirror(&self.z),
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn mirror(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| -v).collect()
}

fn fit(name: &'static str, values: &[f64], len: usize) -> Result<Vec<f64>, PoseError> {
    if values.len() > len {
        return Err(PoseError::TooManyJoints {
            name,
            found: values.len(),
            max: len,
        });
    }

    let mut v = values.to_vec();
    v.resize(len, 0.0);
    Ok(v)
}

fn fit_deg(name: &'static str, values_deg: &[f64], len: usize) -> Result<Vec<f64>, PoseError> {
    let rad: Vec<f64> = values_deg.iter().map(|d| d.to_radians()).collect();
    fit(name, &rad, len)
}
