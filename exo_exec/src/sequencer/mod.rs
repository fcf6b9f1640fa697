//! # Exercise phase sequencer
//!
//! Drives one run of the exercise:
//!
//! 1. Ramp the override stiffness up while holding the measured posture.
//! 2. Move to the start posture of the exercised side.
//! 3. Run up to `max_trials` trials, each made up of:
//!    - wait for a movement selection (`x`, `y` or `z`),
//!    - wait for the go command (`g`),
//!    - move to the endpoint, until finished or stopped (`s`),
//!    - hold, return to the start posture, hold again.
//! 4. Remove every override.
//!
//! An exit command (`e`) ends the run from any trial phase within one tick.
//! Any device, logging or interpolation failure is fatal. Overrides are
//! removed exactly once per initialised controller however the run ends.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod pacer;
mod poses;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::io::Write;
use std::sync::Arc;

use chrono::Local;
use comms_if::{
    cmd::{CommandByte, Movement},
    eqpt::{JointGroup, Side},
};
use log::{debug, error, info, warn};
use serde::Serialize;
use util::time;

use crate::{
    cmd_channel::CommandChannel,
    device::{DeviceError, ExoDevice},
    interp::{InterpError, Segment},
    joints::{JointLayout, JointVector, JointVectorError},
    override_codec::{AllOverrides, CodecError, OverrideCodec, StiffnessParams},
    trial_logger::{LogRecord, TrialLogError, TrialLogger, Trigger},
};

pub use pacer::*;
pub use params::*;
pub use poses::*;
pub use state::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Everything needed to configure a sequencer.
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    pub params: SequencerParams,
    pub layout: JointLayout,
    pub stiffness: StiffnessParams,
    pub poses: PoseTable,
    pub side: Side,
}

/// The exercise state machine.
pub struct ExercisePhaseSequencer<D, P, W>
where
    D: ExoDevice,
    P: Pacer,
    W: Write,
{
    params: SequencerParams,
    layout: JointLayout,
    codec: OverrideCodec,
    poses: PoseTable,

    device: D,
    pacer: P,
    channel: Arc<CommandChannel>,
    logger: TrialLogger<W>,

    state: TrialState,

    /// Controllers which have been initialised and not yet released.
    active_groups: Vec<JointGroup>,

    /// The last posture sent to the device.
    last_commanded: Option<JointVector>,

    started: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How a run ended, if it ended without a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    /// Every trial was run.
    Completed { trials: u32 },

    /// The operator sent the exit command.
    OperatorAbort { phase: Phase, iteration: u32 },
}

#[derive(Debug, thiserror::Error)]
pub enum SequencerError {
    #[error("Invalid sequencer parameters: {0}")]
    InvalidParams(String),

    #[error("The sequencer has already been run")]
    AlreadyRun,

    #[error("No movement has been selected")]
    NoMovementSelected,

    #[error("Device error: {0}")]
    DeviceError(#[from] DeviceError),

    #[error("Interpolation error: {0}")]
    InterpError(#[from] InterpError),

    #[error("Override codec error: {0}")]
    CodecError(#[from] CodecError),

    #[error("Pose error: {0}")]
    PoseError(#[from] PoseError),

    #[error("Joint vector error: {0}")]
    JointVectorError(#[from] JointVectorError),

    #[error("Trial log error: {0}")]
    TrialLogError(#[from] TrialLogError),
}

/// Reasons a phase ends early.
enum Interrupt {
    Abort,
    Fault(SequencerError),
}

macro_rules! interrupt_from {
    ($($err:ty),*) => {
        $(
            impl From<$err> for Interrupt {
                fn from(e: $err) -> Self {
                    Interrupt::Fault(e.into())
                }
            }
        )*
    };
}

interrupt_from!(
    SequencerError,
    DeviceError,
    InterpError,
    PoseError,
    JointVectorError,
    TrialLogError
);

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<D, P, W> ExercisePhaseSequencer<D, P, W>
where
    D: ExoDevice,
    P: Pacer,
    W: Write,
{
    /// Create a new sequencer. The device must not have been initialised.
    pub fn new(
        config: SequencerConfig,
        device: D,
        pacer: P,
        channel: Arc<CommandChannel>,
        logger: TrialLogger<W>,
    ) -> Result<Self, SequencerError> {
        config.params.validate()?;
        config.poses.validate(config.layout)?;
        let codec = OverrideCodec::new(config.stiffness, config.layout)?;

        Ok(Self {
            params: config.params,
            layout: config.layout,
            codec,
            poses: config.poses,
            device,
            pacer,
            channel,
            logger,
            state: TrialState::new(config.side),
            active_groups: vec![],
            last_commanded: None,
            started: false,
        })
    }

    /// Run the exercise to completion, operator abort or fault.
    ///
    /// Can only be called once.
    pub fn run(&mut self) -> Result<RunOutcome, SequencerError> {
        if self.started {
            return Err(SequencerError::AlreadyRun);
        }
        self.started = true;

        self.pacer.restart();
        let result = self.run_phases();

        let phase = self.state.phase;
        self.state.enter(Phase::Shutdown);
        let release = self.release_all();

        match result {
            Ok(trials) => {
                release?;
                info!("Exercise complete, {} trials run", trials);
                Ok(RunOutcome::Completed { trials })
            }
            Err(Interrupt::Abort) => {
                release?;
                warn!(
                    "Exercise aborted by the operator during {} of trial {}",
                    phase, self.state.iteration
                );
                Ok(RunOutcome::OperatorAbort {
                    phase,
                    iteration: self.state.iteration,
                })
            }
            Err(Interrupt::Fault(e)) => {
                error!("Exercise failed during {}: {}", phase, e);
                if let Err(re) = release {
                    error!("Could not remove every override: {}", re);
                }
                Err(e)
            }
        }
    }

    pub fn state(&self) -> &TrialState {
        &self.state
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn pacer(&self) -> &P {
        &self.pacer
    }

    pub fn logger(&self) -> &TrialLogger<W> {
        &self.logger
    }

    /// Take apart the sequencer, returning the device, pacer and logger.
    pub fn into_parts(self) -> (D, P, TrialLogger<W>) {
        (self.device, self.pacer, self.logger)
    }

    // ---- PHASES ----

    fn run_phases(&mut self) -> Result<u32, Interrupt> {
        self.init_device()?;
        self.ramp_up()?;
        self.move_to_start()?;

        for _ in 0..self.params.max_trials {
            self.run_trial()?;
        }

        Ok(self.state.iteration)
    }

    fn init_device(&mut self) -> Result<(), Interrupt> {
        self.device.init()?;
        info!("Device initialised");

        for group in self.layout.groups() {
            self.device.init_controller(group)?;
            self.active_groups.push(group);
            info!("{} controller initialised", group);
        }

        Ok(())
    }

    fn ramp_up(&mut self) -> Result<(), Interrupt> {
        self.state.enter(Phase::ImpedanceRampUp);

        let n = self.params.steps(self.params.ramp_s);
        info!("Ramping up impedance over {:.1} s", self.params.ramp_s);

        let mut posture = self.measured_posture()?;

        for i in 0..n {
            posture = self.measured_posture()?;
            let scaling = self.params.ramp_mode.scaling(i, n);
            let overrides = self.codec.encode_scaled(&posture, scaling);
            self.push(&overrides)?;

            self.progress(i, n);
            self.pacer.wait_tick();
        }

        self.last_commanded = Some(posture);
        Ok(())
    }

    fn move_to_start(&mut self) -> Result<(), Interrupt> {
        self.state.enter(Phase::MoveToStart);
        info!("Moving to the {} start posture", self.state.side);

        let target = self.poses.side_active(self.state.side, self.layout)?;
        let n = self.params.steps(self.params.start_pos_s);
        self.drive_to(target, n, false)?;

        // Exit is only honoured once the start posture is reached
        self.check_exit()
    }

    fn run_trial(&mut self) -> Result<(), Interrupt> {
        let iteration = self.state.begin_trial();
        info!(
            "Trial {}/{}: waiting for a movement selection",
            iteration, self.params.max_trials
        );

        let movement = self.await_cmd(CommandByte::is_selection)?
            .movement()
            .ok_or(SequencerError::NoMovementSelected)?;
        self.state.movement = Some(movement);
        info!("Movement {} selected, waiting for go", movement.as_char());

        self.state.enter(Phase::AwaitingStart);
        self.await_cmd(|c| c == CommandByte::Go)?;
        self.log(Trigger::Start)?;

        self.state.enter(Phase::Moving);
        self.moving(movement)?;

        self.state.enter(Phase::Holding);
        self.hold(self.params.wait_s)?;

        self.state.enter(Phase::ReturningHome);
        let home = self.poses.side_active(self.state.side, self.layout)?;
        let n = self.params.steps(self.params.back_to_start_s);
        self.drive_to(home, n, true)?;

        self.state.enter(Phase::HoldingHome);
        self.hold(self.params.wait2_s)?;

        Ok(())
    }

    fn moving(&mut self, movement: Movement) -> Result<(), Interrupt> {
        let target = self.poses.end_point(self.state.side, movement, self.layout)?;
        let n = self.params.steps(self.params.begin_ex_s);
        if n == 0 {
            return Ok(());
        }

        let seg = Segment::new(self.last_posture()?, target, n)?;

        for i in 0..n {
            self.check_exit()?;

            if (i + 1) % self.params.moving_log_every == 0 {
                self.log(Trigger::Moving)?;
            }

            if self.channel.consume_if(|c| c == CommandByte::Stop).is_some() {
                self.log(Trigger::Stop)?;
                info!(
                    "Movement stopped at {:.3} s",
                    i as f64 / self.params.sample_rate_hz
                );
                return Ok(());
            }

            self.command(seg.at(i)?)?;
            self.progress(i, n);
            self.pacer.wait_tick();
        }

        Ok(())
    }

    fn hold(&mut self, duration_s: f64) -> Result<(), Interrupt> {
        let n = self.params.steps(duration_s);

        for i in 0..=n {
            self.check_exit()?;
            self.progress(i, n);
            self.pacer.wait_tick();
        }

        Ok(())
    }

    // ---- HELPERS ----

    /// Interpolate from the last commanded posture to `target`, steps `0..=total`.
    fn drive_to(
        &mut self,
        target: JointVector,
        total: u64,
        poll_exit: bool,
    ) -> Result<(), Interrupt> {
        let seg = Segment::new(self.last_posture()?, target, total)?;

        for step in 0..=total {
            if poll_exit {
                self.check_exit()?;
            }

            self.command(seg.at(step)?)?;
            self.progress(step, total);
            self.pacer.wait_tick();
        }

        Ok(())
    }

    /// Block, one tick at a time, until an accepted command or exit arrives.
    fn await_cmd<F>(&mut self, accept: F) -> Result<CommandByte, Interrupt>
    where
        F: Fn(CommandByte) -> bool,
    {
        let accept_or_exit = |c: CommandByte| c == CommandByte::Exit || accept(c);

        loop {
            match self.pacer.wait_command(&self.channel, &accept_or_exit) {
                Some(CommandByte::Exit) => return Err(Interrupt::Abort),
                Some(cmd) => return Ok(cmd),
                None => (),
            }
        }
    }

    fn check_exit(&mut self) -> Result<(), Interrupt> {
        match self.channel.consume_if(|c| c == CommandByte::Exit) {
            Some(_) => Err(Interrupt::Abort),
            None => Ok(()),
        }
    }

    fn command(&mut self, posture: JointVector) -> Result<(), Interrupt> {
        let overrides = self.codec.encode(&posture);
        self.push(&overrides)?;
        self.last_commanded = Some(posture);
        Ok(())
    }

    fn push(&mut self, overrides: &AllOverrides) -> Result<(), DeviceError> {
        for group in self.layout.groups() {
            if let Some(o) = overrides.group(group) {
                self.device.set_joints_override(group, o)?;
            }
        }
        Ok(())
    }

    fn log(&mut self, trigger: Trigger) -> Result<(), Interrupt> {
        let movement = self.state.movement.ok_or(SequencerError::NoMovementSelected)?;
        let states = self.device.joint_states()?;
        let poses = self.device.end_effector_poses()?;

        self.logger.append(&LogRecord {
            time: Local::now(),
            iteration: self.state.iteration,
            movement,
            trigger,
            states,
            poses,
        })?;

        Ok(())
    }

    fn measured_posture(&mut self) -> Result<JointVector, Interrupt> {
        let states = self.device.joint_states()?;
        Ok(JointVector::from_states(self.layout, &states)?)
    }

    fn last_posture(&mut self) -> Result<JointVector, Interrupt> {
        match &self.last_commanded {
            Some(p) => Ok(p.clone()),
            None => self.measured_posture(),
        }
    }

    fn progress(&self, tick: u64, total: u64) {
        let period_ms = time::period_ms(self.params.sample_rate_hz);
        if time::is_1_hz_tick(tick, period_ms) {
            debug!(
                "{}: {} of {} s",
                self.state.phase,
                tick * period_ms / 1000,
                total * period_ms / 1000
            );
        }
    }

    /// Remove the override of every active controller, attempting all of them
    /// even if one fails.
    fn release_all(&mut self) -> Result<(), SequencerError> {
        let mut first_err = None;

        for group in std::mem::take(&mut self.active_groups) {
            match self.device.remove_override(group) {
                Ok(()) => info!("{} override removed", group),
                Err(e) => {
                    error!("Could not remove the {} override: {}", group, e);
                    first_err.get_or_insert(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}
