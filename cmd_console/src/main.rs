//! Operator command console
//!
//! Interactive prompt which sends exercise commands to the exercise executable,
//! standing in for the BCI decoder during rehearsals.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use color_eyre::{eyre::WrapErr, Report};
use rustyline::{error::ReadlineError, DefaultEditor};
use structopt::StructOpt;

use comms_if::{
    cmd::{CmdParseError, CommandByte},
    net::{CmdSender, NetParams},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const PROMPT: &str = "exo $ ";
const HISTORY_PATH: &str = "data/cmd_history.txt";

const HELP: &str = "\
Commands:
    x, y, z     select a movement
    g, go       start the selected movement
    s, stop     stop the movement
    e, exit     end the exercise run
    raw <text>  send <text> as-is
    help        show this message
    quit        leave the console";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Send exercise commands over UDP.
#[derive(Debug, StructOpt)]
#[structopt(name = "cmd_console")]
struct Cli {
    /// Address to send to, overrides the one in net.toml
    #[structopt(long)]
    target: Option<String>,
}

#[derive(Debug, PartialEq)]
enum Action {
    Send(CommandByte),
    Raw(Vec<u8>),
    Help,
    Quit,
    Nothing,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn main() -> Result<(), Report> {
    color_eyre::install()?;
    let cli = Cli::from_args();

    let target = match cli.target {
        Some(t) => t,
        None => match util::params::load::<NetParams>("net.toml") {
            Ok(p) => p.cmd_target_addr,
            Err(e) => {
                println!("Using the default target, could not load net.toml: {}", e);
                NetParams::default().cmd_target_addr
            }
        },
    };

    let sender = CmdSender::to_addr(&target).wrap_err("Failed to create the command sender")?;
    println!("Sending to {}, type help for a list of commands", sender.target());

    let mut rl = DefaultEditor::new().wrap_err("Failed to open the console")?;
    if rl.load_history(HISTORY_PATH).is_err() {
        println!("No history detected");
    }

    loop {
        let line = match rl.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                println!("Unhandled Error: {:?}", e);
                break;
            }
        };
        rl.add_history_entry(line.as_str()).ok();

        let result = match parse(&line) {
            Ok(Action::Send(cmd)) => sender.send_cmd(cmd),
            Ok(Action::Raw(payload)) => sender.send_raw(&payload),
            Ok(Action::Help) => {
                println!("{}", HELP);
                Ok(())
            }
            Ok(Action::Quit) => break,
            Ok(Action::Nothing) => Ok(()),
            Err(e) => {
                println!("{}", e);
                Ok(())
            }
        };

        if let Err(e) = result {
            println!("{}", e);
        }
    }

    if let Some(dir) = std::path::Path::new(HISTORY_PATH).parent() {
        std::fs::create_dir_all(dir).ok();
    }
    rl.save_history(HISTORY_PATH).wrap_err("Failed to save the console history")?;

    Ok(())
}

fn parse(line: &str) -> Result<Action, CmdParseError> {
    let line = line.trim();

    if let Some(rest) = line.strip_prefix("raw ") {
        return Ok(Action::Raw(rest.as_bytes().to_vec()));
    }

    match line {
        "" => Ok(Action::Nothing),
        "help" | "?" => Ok(Action::Help),
        "quit" | "q" => Ok(Action::Quit),
        cmd => cmd.parse().map(Action::Send),
    }
}
