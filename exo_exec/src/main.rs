//! Main exercise executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Resolve the operator inputs (subject, session, run, side)
//!     - Start the command source:
//!         - UDP command receiver, or
//!         - command script replay if `--script` is given
//!     - Create the trial log and save the run configuration
//!     - Count down, then run the exercise sequencer to completion
//!
//! # Exit codes
//!
//!     - 0: every trial was run
//!     - 1: the run failed
//!     - 2: the run was aborted by the operator

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::Local;
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use structopt::StructOpt;

// Internal
use comms_if::{
    eqpt::Side,
    net::{CmdSocket, NetParams},
};
use exo_lib::{
    cmd_channel::CommandChannel,
    cmd_source::CmdSourceHandle,
    device::SimExo,
    operator::{self, ConsolePrompt, OperatorInputs, PartialInputs},
    params::ExoExecParams,
    sequencer::{ExercisePhaseSequencer, RunOutcome, SequencerConfig, SleepPacer},
    trial_logger::{self, TrialLogger},
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    script_interpreter::ScriptInterpreter,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Exit code of a run aborted by the operator.
const EXIT_OPERATOR_ABORT: i32 = 2;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Exoskeleton exercise executable.
#[derive(Debug, StructOpt)]
#[structopt(name = "exo_exec")]
struct Cli {
    /// Subject number
    #[structopt(long)]
    subject: Option<u32>,

    /// Online session (1) or offline session (0)
    #[structopt(long, parse(try_from_str = operator::parse_online))]
    online: Option<bool>,

    /// Session number
    #[structopt(long)]
    session: Option<u32>,

    /// Run number
    #[structopt(long)]
    run: Option<u32>,

    /// Exercised side, left or right
    #[structopt(long)]
    side: Option<Side>,

    /// Replay commands from this script instead of listening on the network
    #[structopt(long, parse(from_os_str))]
    script: Option<PathBuf>,

    /// Parameter file, relative to the params directory
    #[structopt(long, default_value = "exo_exec.toml")]
    params: String,
}

/// Snapshot of everything that configured a run.
#[derive(Serialize)]
struct RunConfig<'a> {
    inputs: &'a OperatorInputs,
    trial_log: &'a PathBuf,
    params: &'a ExoExecParams,
    net_params: &'a NetParams,
    script: Option<&'a PathBuf>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    match run()? {
        RunOutcome::Completed { .. } => Ok(()),
        RunOutcome::OperatorAbort { .. } => process::exit(EXIT_OPERATOR_ABORT),
    }
}

fn run() -> Result<RunOutcome, Report> {
    let cli = Cli::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("exo_exec", "sessions")
        .wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Exoskeleton Exercise Executable\n");
    info!("Running on: {}", host::describe());
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: ExoExecParams = util::params::load(&cli.params)
        .wrap_err("Could not load exec params")?;
    let net_params: NetParams = util::params::load("net.toml")
        .wrap_err("Could not load net params")?;

    info!("Exec parameters loaded");

    // ---- OPERATOR INPUTS ----

    let partial = PartialInputs {
        subject: cli.subject,
        online: cli.online,
        session: cli.session,
        run: cli.run,
        side: cli.side,
    };
    let mut prompt = ConsolePrompt::new().wrap_err("Failed to open the console")?;
    let inputs = operator::resolve(partial, &mut prompt)
        .wrap_err("Failed to get the operator inputs")?;

    info!("{} side chosen", inputs.side);

    // ---- INITIALISE COMMAND SOURCE ----

    let channel = Arc::new(CommandChannel::new());

    // The handle must outlive the sequencer, dropping it stops the thread
    let _cmd_source = match &cli.script {
        Some(path) => {
            info!("Loading script from {:?}", path);
            let si = ScriptInterpreter::new(path).wrap_err("Failed to load script")?;
            CmdSourceHandle::spawn_script(si, channel.clone())
                .wrap_err("Failed to start the script feeder")?
        }
        None => {
            let socket = CmdSocket::bind(&net_params)
                .wrap_err("Failed to bind the command socket")?;
            CmdSourceHandle::spawn_udp(socket, channel.clone())
                .wrap_err("Failed to start the command receiver")?
        }
    };

    // ---- TRIAL LOG ----

    let layout = params.joint_layout();
    let log_dir = host::get_sw_root()
        .wrap_err("Cannot determine the software root")?
        .join(&params.log_dir);
    let today = Local::now().naive_local().date();
    let log_path = trial_logger::log_file_path(log_dir, today, &inputs.run_id);

    if log_path.exists() {
        warn!("Overwriting existing trial log {:?}", log_path);
    }

    let logger = TrialLogger::create(&log_path, layout)
        .wrap_err_with(|| format!("Failed to create the trial log {:?}", log_path))?;
    info!("Trial log: {:?}", log_path);

    session.save_json_or_warn(
        "run_config.json",
        &RunConfig {
            inputs: &inputs,
            trial_log: &log_path,
            params: &params,
            net_params: &net_params,
            script: cli.script.as_ref(),
        },
    );

    // ---- INITIALISE SEQUENCER ----

    let config = SequencerConfig {
        params: params.sequencer.clone(),
        layout,
        stiffness: params.stiffness.clone(),
        poses: params.poses.clone(),
        side: inputs.side,
    };
    let device = SimExo::new(layout, params.sim.clone());
    let pacer = SleepPacer::new(params.sequencer.sample_rate_hz);

    let mut sequencer = ExercisePhaseSequencer::new(config, device, pacer, channel, logger)
        .wrap_err("Failed to initialise the sequencer")?;

    info!("fs: {} Hz", params.sequencer.sample_rate_hz);
    countdown(params.countdown_s);

    // ---- RUN ----

    let outcome = sequencer.run().wrap_err("Exercise failed")?;

    info!(
        "{} trial records written, {} tick overruns",
        sequencer.logger().num_records(),
        sequencer.pacer().num_overruns()
    );
    session.save_json_or_warn("outcome.json", &outcome);
    info!("End of execution");

    Ok(outcome)
}

/// Count down to the start of the exercise, one second per step.
fn countdown(seconds: u32) {
    if seconds == 0 {
        return;
    }

    info!("Starting in...");
    for i in (1..=seconds).rev() {
        info!("...{}", i);
        thread::sleep(Duration::from_secs(1));
    }
    info!("--> LET'S EXERCISE <--");
}
