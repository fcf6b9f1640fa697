//! # Joint override codec
//!
//! Converts a posture into the per-controller (position, stiffness) override
//! commands sent to the device. Every joint belongs to a stiffness class set
//! by its drive hardware, and each class has a maximum stiffness the drive
//! can safely be commanded to.
//!
//! During the impedance ramp every stiffness is multiplied by a common
//! scaling in `[0, 1]`.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::fmt;

use comms_if::eqpt::{JointGroup, JointOverride};

use crate::joints::{JointLayout, JointVector};

pub use params::StiffnessParams;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Maximum stiffness of the 400 series drives.
pub const PROXIMAL_MAX_NM_PER_RAD: f64 = 50.0;

/// Maximum stiffness of the 600 series drives.
pub const ELBOW_MAX_NM_PER_RAD: f64 = 30.0;

/// Maximum stiffness of the 700 series drives.
pub const WRIST_MAX_NM_PER_RAD: f64 = 3.0;

const ELBOW_INDEX: usize = 5;
const WRIST_ROTATION_INDEX: usize = 6;
const WRIST_ABDUCTION_INDEX: usize = 7;
const WRIST_FLEXION_INDEX: usize = 8;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Encoder from postures to override commands.
#[derive(Debug, Clone)]
pub struct OverrideCodec {
    params: StiffnessParams,
    layout: JointLayout,
}

/// Override commands for every controller of the device.
#[derive(Debug, Clone, PartialEq)]
pub struct AllOverrides {
    pub left: Vec<JointOverride>,
    pub right: Vec<JointOverride>,

    /// `None` if the device has no torso controller.
    pub torso: Option<Vec<JointOverride>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Stiffness class of a joint, determined by its drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StiffnessClass {
    Proximal,
    Elbow,
    WristRotation,
    WristAbduction,
    WristFlexion,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CodecError {
    #[error("{class} stiffness of {value} Nm/rad is outside [0, {max}] Nm/rad")]
    StiffnessOutOfRange {
        class: StiffnessClass,
        value: f64,
        max: f64,
    },

    #[error("The {0} scaling must be in [0, 1], found {1}")]
    InvalidScaling(&'static str, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl StiffnessClass {
    /// Class of the joint at the given index within a group (0-based).
    ///
    /// Torso joints use the same lookup as the arm joints.
    pub fn for_joint(index: usize, layout: &JointLayout) -> Self {
        let wrist_mods = layout.arm_joints > WRIST_ABDUCTION_INDEX;

        match index {
            ELBOW_INDEX => StiffnessClass::Elbow,
            WRIST_ROTATION_INDEX => StiffnessClass::WristRotation,
            WRIST_ABDUCTION_INDEX if wrist_mods => StiffnessClass::WristAbduction,
            WRIST_FLEXION_INDEX if wrist_mods => StiffnessClass::WristFlexion,
            _ => StiffnessClass::Proximal,
        }
    }

    /// Highest stiffness the drive of this class accepts.
    pub fn max_nm_per_rad(self) -> f64 {
        match self {
            StiffnessClass::Proximal => PROXIMAL_MAX_NM_PER_RAD,
            StiffnessClass::Elbow => ELBOW_MAX_NM_PER_RAD,
            StiffnessClass::WristRotation
            | StiffnessClass::WristAbduction
            | StiffnessClass::WristFlexion => WRIST_MAX_NM_PER_RAD,
        }
    }
}

impl fmt::Display for StiffnessClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StiffnessClass::Proximal => "Proximal",
            StiffnessClass::Elbow => "Elbow",
            StiffnessClass::WristRotation => "Wrist rotation",
            StiffnessClass::WristAbduction => "Wrist abduction",
            StiffnessClass::WristFlexion => "Wrist flexion",
        };
        write!(f, "{}", s)
    }
}

impl StiffnessParams {
    /// Full-impedance stiffness of the given class.
    pub fn stiffness_of(&self, class: StiffnessClass) -> f64 {
        match class {
            StiffnessClass::Proximal => self.proximal_nm_per_rad,
            StiffnessClass::Elbow => self.elbow_nm_per_rad,
            StiffnessClass::WristRotation => self.wrist_nm_per_rad,
            StiffnessClass::WristAbduction => {
                self.wrist_nm_per_rad * self.wrist_abduction_scaling
            }
            StiffnessClass::WristFlexion => self.wrist_nm_per_rad * self.wrist_flexion_scaling,
        }
    }

    /// Check every class is within the limits of its drive.
    pub fn validate(&self) -> Result<(), CodecError> {
        for (name, scaling) in [
            ("wrist abduction", self.wrist_abduction_scaling),
            ("wrist flexion", self.wrist_flexion_scaling),
        ]
        .iter()
        {
            if !(0.0..=1.0).contains(scaling) {
                return Err(CodecError::InvalidScaling(*name, *scaling));
            }
        }

        for class in [
            StiffnessClass::Proximal,
            StiffnessClass::Elbow,
            StiffnessClass::WristRotation,
            StiffnessClass::WristAbduction,
            StiffnessClass::WristFlexion,
        ]
        .iter()
        {
            let value = self.stiffness_of(*class);
            let max = class.max_nm_per_rad();
            if !(0.0..=max).contains(&value) {
                return Err(CodecError::StiffnessOutOfRange {
                    class: *class,
                    value,
                    max,
                });
            }
        }

        Ok(())
    }
}

impl OverrideCodec {
    /// Create a new codec, validating the stiffness parameters.
    pub fn new(params: StiffnessParams, layout: JointLayout) -> Result<Self, CodecError> {
        params.validate()?;
        Ok(Self { params, layout })
    }

    pub fn layout(&self) -> JointLayout {
        self.layout
    }

    /// Stiffness of the joint at `index` within a group at the given impedance
    /// scaling.
    pub fn stiffness(&self, index: usize, scaling: f64) -> f64 {
        self.params
            .stiffness_of(StiffnessClass::for_joint(index, &self.layout))
            * scaling.max(0.0).min(1.0)
    }

    /// Encode a posture at full impedance.
    pub fn encode(&self, posture: &JointVector) -> AllOverrides {
        self.encode_scaled(posture, 1.0)
    }

    /// Encode a posture with every stiffness multiplied by `scaling`, which
    /// is clamped to `[0, 1]`.
    pub fn encode_scaled(&self, posture: &JointVector, scaling: f64) -> AllOverrides {
        let group = |g: JointGroup| -> Vec<JointOverride> {
            posture
                .group(g)
                .iter()
                .enumerate()
                .map(|(i, p)| JointOverride::new(*p, self.stiffness(i, scaling)))
                .collect()
        };

        AllOverrides {
            left: group(JointGroup::LeftArm),
            right: group(JointGroup::RightArm),
            torso: match self.layout.has_torso() {
                true => Some(group(JointGroup::Torso)),
                false => None,
            },
        }
    }
}

impl AllOverrides {
    /// Overrides for the given controller, `None` for an absent torso.
    pub fn group(&self, group: JointGroup) -> Option<&[JointOverride]> {
        match group {
            JointGroup::LeftArm => Some(&self.left),
            JointGroup::RightArm => Some(&self.right),
            JointGroup::Torso => self.torso.as_deref(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_classes() {
        let std = JointLayout::new(7, 0);
        let mods = JointLayout::new(9, 0);

        assert_eq!(StiffnessClass::for_joint(0, &std), StiffnessClass::Proximal);
        assert_eq!(StiffnessClass::for_joint(4, &std), StiffnessClass::Proximal);
        assert_eq!(StiffnessClass::for_joint(5, &std), StiffnessClass::Elbow);
        assert_eq!(StiffnessClass::for_joint(6, &std), StiffnessClass::WristRotation);
        assert_eq!(StiffnessClass::for_joint(7, &mods), StiffnessClass::WristAbduction);
        assert_eq!(StiffnessClass::for_joint(8, &mods), StiffnessClass::WristFlexion);

        // Torso joints past the arm length of an unmodified device
        assert_eq!(StiffnessClass::for_joint(7, &std), StiffnessClass::Proximal);
    }

    #[test]
    fn test_encode() {
        let layout = JointLayout::new(9, 1);
        let codec = OverrideCodec::new(StiffnessParams::default(), layout).unwrap();
        let left: Vec<f64> = (0..9).map(|i| i as f64 * 0.1).collect();
        let right = vec![0.0; 9];
        let posture = JointVector::from_groups(layout, &left, &right, &[0.5]).unwrap();

        let o = codec.encode(&posture);
        assert_eq!(o.left.len(), 9);
        assert_eq!(o.left[3], JointOverride::new(0.30000000000000004, 15.0));
        assert_eq!(o.left[5].stiffness_nm_per_rad, 15.0);
        assert_eq!(o.left[6].stiffness_nm_per_rad, 1.5);
        assert_eq!(o.left[7].stiffness_nm_per_rad, 1.5);
        assert!((o.left[8].stiffness_nm_per_rad - 0.495).abs() < 1e-12);
        assert_eq!(o.torso, Some(vec![JointOverride::new(0.5, 15.0)]));

        let half = codec.encode_scaled(&posture, 0.5);
        assert_eq!(half.right[0].stiffness_nm_per_rad, 7.5);
        assert_eq!(half.right[6].stiffness_nm_per_rad, 0.75);

        let none = codec.encode_scaled(&posture, -1.0);
        assert!(none.left.iter().all(|o| o.stiffness_nm_per_rad == 0.0));
    }

    #[test]
    fn test_no_torso_group() {
        let layout = JointLayout::new(7, 0);
        let codec = OverrideCodec::new(StiffnessParams::default(), layout).unwrap();
        let o = codec.encode(&JointVector::zeros(layout));

        assert!(o.torso.is_none());
        assert!(o.group(JointGroup::Torso).is_none());
        assert_eq!(o.group(JointGroup::RightArm).map(|g| g.len()), Some(7));
    }

    #[test]
    fn test_validate() {
        assert!(StiffnessParams::default().validate().is_ok());

        let mut p = StiffnessParams::default();
        p.elbow_nm_per_rad = 31.0;
        assert_eq!(
            p.validate(),
            Err(CodecError::StiffnessOutOfRange {
                class: StiffnessClass::Elbow,
                value: 31.0,
                max: ELBOW_MAX_NM_PER_RAD
            })
        );

        let mut p = StiffnessParams::default();
        p.wrist_flexion_scaling = 1.2;
        assert_eq!(p.validate(), Err(CodecError::InvalidScaling("wrist flexion", 1.2)));

        let mut p = StiffnessParams::default();
        p.proximal_nm_per_rad = -1.0;
        assert!(OverrideCodec::new(p, JointLayout::default()).is_err());
    }
}
