//! # Exoskeleton exercise library.
//!
//! This library allows the executables and tests in this crate to access the components of the
//! exercise sequencer.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Command channel - single slot mailbox between the command sources and the sequencer
pub mod cmd_channel;

/// Command sources - threads receiving commands from the network or replaying a script
pub mod cmd_source;

/// Exoskeleton device interface and the simulated device
pub mod device;

/// Straight line interpolation between postures
pub mod interp;

/// Joint layout and joint vectors
pub mod joints;

/// One-shot override of a single arm
pub mod manual_override;

/// Operator inputs identifying the run
pub mod operator;

/// Conversion of postures into per-controller override commands
pub mod override_codec;

/// Executable parameters
pub mod params;

/// The exercise state machine
pub mod sequencer;

/// Tab separated trial log
pub mod trial_logger;
