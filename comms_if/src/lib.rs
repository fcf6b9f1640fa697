//! # Communications interface crate.
//!
//! Provides the interfaces shared between the exercise executable, its
//! tooling, and the things it talks to: the command alphabet received from
//! the BCI decoder, the data types crossing the device driver boundary, and
//! the datagram sockets carrying commands.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Single byte command alphabet
pub mod cmd;

/// Data types exchanged with equipment (the exoskeleton)
pub mod eqpt;

/// Network module
pub mod net;
