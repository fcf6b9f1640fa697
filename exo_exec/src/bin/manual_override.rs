//! Manual override executable
//!
//! Usage: `manual_override <left|right> <harmony|joints> [data]`
//!
//! In joints mode `data` is a whitespace separated string of position (rad)
//! and stiffness (Nm/rad) pairs, one pair per arm joint.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use color_eyre::{eyre::{eyre, WrapErr}, Report};
use structopt::StructOpt;

use comms_if::eqpt::Side;
use exo_lib::{
    device::SimExo,
    manual_override::{self, OverrideMode},
    params::ExoExecParams,
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Override or release a single arm of the exoskeleton.
#[derive(Debug, StructOpt)]
#[structopt(name = "manual_override")]
struct Cli {
    /// Arm to command, left or right
    side: Side,

    /// harmony to remove the override, joints to set one
    mode: OverrideMode,

    /// Position and stiffness pairs for every joint, required in joints mode
    data: Option<String>,

    /// Parameter file, relative to the params directory
    #[structopt(long, default_value = "exo_exec.toml")]
    params: String,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn main() -> Result<(), Report> {
    color_eyre::install()?;
    let cli = Cli::from_args();

    let session = Session::new("manual_override", "sessions")
        .wrap_err("Failed to create the session")?;
    logger_init(LevelFilter::Info, &session)
        .wrap_err("Failed to initialise logging")?;

    let params: ExoExecParams = util::params::load(&cli.params)
        .wrap_err("Could not load exec params")?;
    let layout = params.joint_layout();

    let overrides = match (cli.mode, &cli.data) {
        (OverrideMode::Joints, Some(data)) => Some(
            manual_override::parse_joint_overrides(data, &layout)
                .wrap_err("Invalid joints data")?
        ),
        (OverrideMode::Joints, None) => {
            return Err(eyre!("data argument is required for joints mode"))
        }
        (OverrideMode::Harmony, _) => None,
    };

    let mut device = SimExo::new(layout, params.sim);
    manual_override::apply(&mut device, cli.side, cli.mode, overrides.as_deref())
        .wrap_err("Failed to apply the override")?;

    Ok(())
}
