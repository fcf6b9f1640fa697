//! # Command alphabet
//!
//! Commands arrive as the first byte of a datagram. The alphabet is closed:
//!
//! | byte | command                      |
//! |------|------------------------------|
//! | `x`  | select movement X            |
//! | `y`  | select movement Y            |
//! | `z`  | select movement Z            |
//! | `g`  | go, start the selected move  |
//! | `s`  | stop the current move        |
//! | `e`  | exit, abort the whole run    |

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A single command byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandByte {
    SelectX,
    SelectY,
    SelectZ,
    Go,
    Stop,
    Exit,
}

/// One of the three scripted exercise movements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Movement {
    X,
    Y,
    Z,
}

/// Errors raised while parsing a command.
#[derive(Debug, Error, PartialEq)]
pub enum CmdParseError {
    #[error("The datagram was empty")]
    Empty,

    #[error("Byte 0x{0:02x} is not a recognised command")]
    UnrecognisedByte(u8),

    #[error("\"{0}\" is not a recognised command")]
    UnrecognisedStr(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CommandByte {
    /// All commands, in alphabet order.
    pub const ALL: [CommandByte; 6] = [
        CommandByte::SelectX,
        CommandByte::SelectY,
        CommandByte::SelectZ,
        CommandByte::Go,
        CommandByte::Stop,
        CommandByte::Exit,
    ];

    /// Parse a raw command byte.
    pub fn from_byte(byte: u8) -> Result<Self, CmdParseError> {
        match byte {
            b'x' => Ok(CommandByte::SelectX),
            b'y' => Ok(CommandByte::SelectY),
            b'z' => Ok(CommandByte::SelectZ),
            b'g' => Ok(CommandByte::Go),
            b's' => Ok(CommandByte::Stop),
            b'e' => Ok(CommandByte::Exit),
            b => Err(CmdParseError::UnrecognisedByte(b)),
        }
    }

    /// Parse the command from a datagram payload.
    ///
    /// Only the first byte is significant, the rest of the payload is ignored.
    pub fn from_datagram(payload: &[u8]) -> Result<Self, CmdParseError> {
        match payload.first() {
            Some(b) => Self::from_byte(*b),
            None => Err(CmdParseError::Empty),
        }
    }

    /// The wire byte for this command.
    pub fn as_byte(self) -> u8 {
        match self {
            CommandByte::SelectX => b'x',
            CommandByte::SelectY => b'y',
            CommandByte::SelectZ => b'z',
            CommandByte::Go => b'g',
            CommandByte::Stop => b's',
            CommandByte::Exit => b'e',
        }
    }

    /// The wire byte as a character.
    pub fn as_char(self) -> char {
        self.as_byte() as char
    }

    /// The movement selected by this command, if it is a selection.
    pub fn movement(self) -> Option<Movement> {
        match self {
            CommandByte::SelectX => Some(Movement::X),
            CommandByte::SelectY => Some(Movement::Y),
            CommandByte::SelectZ => Some(Movement::Z),
            _ => None,
        }
    }

    /// True for `x`, `y` and `z`.
    pub fn is_selection(self) -> bool {
        self.movement().is_some()
    }
}

impl Movement {
    /// Character used for this movement in logs and on the wire.
    pub fn as_char(self) -> char {
        match self {
            Movement::X => 'x',
            Movement::Y => 'y',
            Movement::Z => 'z',
        }
    }

    /// The selection command for this movement.
    pub fn select_cmd(self) -> CommandByte {
        match self {
            Movement::X => CommandByte::SelectX,
            Movement::Y => CommandByte::SelectY,
            Movement::Z => CommandByte::SelectZ,
        }
    }
}

impl FromStr for CommandByte {
    type Err = CmdParseError;

    /// Accepts the single wire character or a long alias.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "x" | "select-x" => Ok(CommandByte::SelectX),
            "y" | "select-y" => Ok(CommandByte::SelectY),
            "z" | "select-z" => Ok(CommandByte::SelectZ),
            "g" | "go" | "start" => Ok(CommandByte::Go),
            "s" | "stop" => Ok(CommandByte::Stop),
            "e" | "exit" | "abort" => Ok(CommandByte::Exit),
            "" => Err(CmdParseError::Empty),
            other => Err(CmdParseError::UnrecognisedStr(other.to_string())),
        }
    }
}

impl fmt::Display for CommandByte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl fmt::Display for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}
