//! Parameters for the joint override codec

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Stiffness of each joint class at full impedance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StiffnessParams {
    /// Stiffness of the shoulder and upper arm joints (400 series drives).
    ///
    /// Units: Nm/rad
    pub proximal_nm_per_rad: f64,

    /// Stiffness of the elbow joint (600 series drive).
    ///
    /// Units: Nm/rad
    pub elbow_nm_per_rad: f64,

    /// Stiffness of the wrist joints (700 series drives).
    ///
    /// Units: Nm/rad
    pub wrist_nm_per_rad: f64,

    /// Fraction of the wrist stiffness applied to the wrist abduction joint.
    pub wrist_abduction_scaling: f64,

    /// Fraction of the wrist stiffness applied to the wrist flexion joint.
    pub wrist_flexion_scaling: f64,
}

impl Default for StiffnessParams {
    fn default() -> Self {
        Self {
            proximal_nm_per_rad: 15.0,
            elbow_nm_per_rad: 15.0,
            wrist_nm_per_rad: 1.5,
            wrist_abduction_scaling: 1.0,
            wrist_flexion_scaling: 0.33,
        }
    }
}
