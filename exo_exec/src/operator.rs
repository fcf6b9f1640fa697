//! # Operator inputs
//!
//! Identification of the run (subject, online/offline, session, run) and the
//! exercised side. Values not given on the command line are asked for on the
//! console, re-asking until a valid answer is given.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::VecDeque;
use std::str::FromStr;

use comms_if::eqpt::Side;
use rustyline::{error::ReadlineError, DefaultEditor};
use serde::{Deserialize, Serialize};

use crate::trial_logger::RunId;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Something which can ask the operator a question.
pub trait Prompt {
    /// Ask a question, returning the raw answer.
    fn ask(&mut self, question: &str) -> Result<String, OperatorError>;

    /// Tell the operator an answer was rejected.
    fn reject(&mut self, reason: &str);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Fully resolved operator inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorInputs {
    pub run_id: RunId,
    pub side: Side,
}

/// Inputs given up front, any of which may be missing.
#[derive(Debug, Clone, Default)]
pub struct PartialInputs {
    pub subject: Option<u32>,
    pub online: Option<bool>,
    pub session: Option<u32>,
    pub run: Option<u32>,
    pub side: Option<Side>,
}

/// Interactive console prompt.
pub struct ConsolePrompt {
    editor: DefaultEditor,
}

/// Prompt answering from a fixed list, for unattended use.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    pub rejections: Vec<String>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum OperatorError {
    #[error("Input cancelled by the operator")]
    Cancelled,

    #[error("No answer available for \"{0}\"")]
    NoAnswer(String),

    #[error("Console error: {0}")]
    ConsoleError(#[from] ReadlineError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Fill in any missing inputs by asking the operator.
pub fn resolve<P: Prompt>(
    partial: PartialInputs,
    prompt: &mut P,
) -> Result<OperatorInputs, OperatorError> {
    let subject = match partial.subject {
        Some(s) => s,
        None => ask_until(prompt, "Enter subject number: ", parse_number)?,
    };
    let online = match partial.online {
        Some(o) => o,
        None => ask_until(prompt, "Online session? (1 = online, 0 = offline): ", parse_online)?,
    };
    let session = match partial.session {
        Some(s) => s,
        None => ask_until(prompt, "Enter session number: ", parse_number)?,
    };
    let run = match partial.run {
        Some(r) => r,
        None => ask_until(prompt, "Enter run number: ", parse_number)?,
    };
    let side = match partial.side {
        Some(s) => s,
        None => ask_until(
            prompt,
            "Choose the side to exercise (r = RIGHT arm, l = LEFT arm): ",
            Side::from_str,
        )?,
    };

    Ok(OperatorInputs {
        run_id: RunId {
            subject,
            online,
            session,
            run,
        },
        side,
    })
}

/// Parse a non-negative whole number.
pub fn parse_number(s: &str) -> Result<u32, String> {
    s.trim()
        .parse()
        .map_err(|_| format!("\"{}\" is not a non-negative whole number", s.trim()))
}

/// Parse the online flag.
pub fn parse_online(s: &str) -> Result<bool, String> {
    match s.trim().to_lowercase().as_str() {
        "1" | "on" | "online" | "y" | "yes" => Ok(true),
        "0" | "off" | "offline" | "n" | "no" => Ok(false),
        other => Err(format!("\"{}\" is not one of 1 (online) or 0 (offline)", other)),
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn ask_until<P, T, F>(prompt: &mut P, question: &str, parse: F) -> Result<T, OperatorError>
where
    P: Prompt,
    F: Fn(&str) -> Result<T, String>,
{
    loop {
        let answer = prompt.ask(question)?;
        match parse(&answer) {
            Ok(v) => return Ok(v),
            Err(reason) => prompt.reject(&reason),
        }
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ConsolePrompt {
    pub fn new() -> Result<Self, OperatorError> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl Prompt for ConsolePrompt {
    fn ask(&mut self, question: &str) -> Result<String, OperatorError> {
        match self.editor.readline(question) {
            Ok(line) => Ok(line),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                Err(OperatorError::Cancelled)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn reject(&mut self, reason: &str) {
        println!("Invalid input: {}", reason);
    }
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            rejections: vec![],
        }
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&mut self, question: &str) -> Result<String, OperatorError> {
        self.answers
            .pop_front()
            .ok_or_else(|| OperatorError::NoAnswer(question.trim().to_string()))
    }

    fn reject(&mut self, reason: &str) {
        self.rejections.push(reason.to_string());
    }
}
