//! # Command script interpreter module
//!
//! This module provides an interpreter for command scripts, which stand in
//! for the BCI decoder during dry runs. A script is a list of timed commands:
//!
//! ```text
//! # select movement x, start it, then stop it early
//! 2.0: x;
//! 3.5: g;
//! 6.0: stop;
//! ```
//!
//! Times are seconds since the interpreter was started. Anything after a `#`
//! on a line is a comment.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal
use comms_if::cmd::{CmdParseError, CommandByte};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command which is scripted to occur at a specific time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptedCmd {
    /// The time the command is supposed to be issued at
    pub exec_time_s: f64,

    /// The command to issue
    pub cmd: CommandByte,
}

/// A script interpreter.
///
/// After loading, call [`ScriptInterpreter::get_pending_cmds`] with the
/// elapsed time to acquire the commands that are now due.
#[derive(Debug)]
pub struct ScriptInterpreter {
    script_path: Option<PathBuf>,
    cmds: VecDeque<ScriptedCmd>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0:?}")]
    ScriptNotFound(PathBuf),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid command at {0} s: {1}")]
    InvalidCmd(f64, CmdParseError),

    #[error("Could not build the script grammar: {0}")]
    RegexError(regex::Error),

    #[error("Script timestamps must not decrease ({0} s follows {1} s)")]
    OutOfOrder(f64, f64),
}

#[derive(Debug, PartialEq)]
pub enum PendingCmds {
    None,
    Some(Vec<CommandByte>),
    EndOfScript,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {

    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        let path = PathBuf::from(script_path.as_ref());

        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path));
        }

        let script = fs::read_to_string(&path).map_err(ScriptError::ScriptLoadError)?;

        let mut si = Self::from_script(&script)?;
        si.script_path = Some(path);

        Ok(si)
    }

    /// Create a new interpreter from the text of a script.
    pub fn from_script(script: &str) -> Result<Self, ScriptError> {
        let re = RegexBuilder::new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;#]*);")
            .multi_line(true)
            .build()
            .map_err(ScriptError::RegexError)?;

        let mut cmds: VecDeque<ScriptedCmd> = VecDeque::new();

        for line in script.lines() {
            // Strip comments before matching
            let line = match line.find('#') {
                Some(i) => &line[..i],
                None => line,
            };

            let cap = match re.captures(line) {
                Some(c) => c,
                None => continue,
            };

            let time_str = cap.get(1).map(|m| m.as_str()).unwrap_or("");
            let exec_time_s: f64 = time_str
                .parse()
                .map_err(|_| ScriptError::InvalidTimestamp(time_str.to_string()))?;

            let cmd_str = cap.get(3).map(|m| m.as_str().trim()).unwrap_or("");
            let cmd: CommandByte = cmd_str
                .parse()
                .map_err(|e| ScriptError::InvalidCmd(exec_time_s, e))?;

            if let Some(prev) = cmds.back() {
                if exec_time_s < prev.exec_time_s {
                    return Err(ScriptError::OutOfOrder(exec_time_s, prev.exec_time_s));
                }
            }

            cmds.push_back(ScriptedCmd { exec_time_s, cmd });
        }

        if cmds.is_empty() {
            return Err(ScriptError::ScriptEmpty)
        }

        Ok(ScriptInterpreter {
            script_path: None,
            cmds,
        })
    }

    /// Return the commands due at `elapsed_s`, or `None` if none are due.
    ///
    /// Commands are returned in script order and removed from the script.
    pub fn get_pending_cmds(&mut self, elapsed_s: f64) -> PendingCmds {

        if self.cmds.is_empty() {
            return PendingCmds::EndOfScript
        }

        let mut due = vec![];

        while let Some(front) = self.cmds.front() {
            if front.exec_time_s > elapsed_s {
                break;
            }
            due.push(front.cmd);
            self.cmds.pop_front();
        }

        if due.is_empty() {
            PendingCmds::None
        }
        else {
            PendingCmds::Some(due)
        }
    }

    /// Get the number of commands remaining in the script
    pub fn get_num_cmds(&self) -> usize {
        self.cmds.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.cmds.back() {
            Some(c) => c.exec_time_s,
            None => 0f64
        }
    }

    /// Path the script was loaded from, if it came from a file
    pub fn script_path(&self) -> Option<&Path> {
        self.script_path.as_deref()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SCRIPT: &str = "
        # dry run
        1.0: x;
        1.5: g;   # start
        4.0: stop;
        9: e;
    ";

    #[test]
    fn test_parse_script() {
        let si = ScriptInterpreter::from_script(SCRIPT).unwrap();
        assert_eq!(si.get_num_cmds(), 4);
        assert_eq!(si.get_duration(), 9.0);
    }

    #[test]
    fn test_pending_cmds() {
        let mut si = ScriptInterpreter::from_script(SCRIPT).unwrap();

        assert_eq!(si.get_pending_cmds(0.5), PendingCmds::None);
        assert_eq!(
            si.get_pending_cmds(2.0),
            PendingCmds::Some(vec![CommandByte::SelectX, CommandByte::Go])
        );
        assert_eq!(si.get_pending_cmds(3.0), PendingCmds::None);
        assert_eq!(
            si.get_pending_cmds(10.0),
            PendingCmds::Some(vec![CommandByte::Stop, CommandByte::Exit])
        );
        assert_eq!(si.get_pending_cmds(11.0), PendingCmds::EndOfScript);
    }

    #[test]
    fn test_invalid_scripts() {
        assert!(matches!(
            ScriptInterpreter::from_script("# nothing here"),
            Err(ScriptError::ScriptEmpty)
        ));
        assert!(matches!(
            ScriptInterpreter::from_script("1.0: q;"),
            Err(ScriptError::InvalidCmd(_, _))
        ));
        assert!(matches!(
            ScriptInterpreter::from_script("2.0: x;\n1.0: g;"),
            Err(ScriptError::OutOfOrder(_, _))
        ));
    }
}
