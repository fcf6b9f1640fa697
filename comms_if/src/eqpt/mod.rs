//! # Equipment Interface
//!
//! This module defines the interface structures exchanged with equipment drivers.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Exoskeleton joint, override, and pose types.
pub mod exo;

pub use exo::*;
