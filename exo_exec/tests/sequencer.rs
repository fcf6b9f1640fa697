//! End to end runs of the exercise sequencer against the simulated device

mod common;

use std::sync::Arc;

use comms_if::{
    cmd::CommandByte::{self, *},
    eqpt::{JointGroup, Side},
};
use exo_lib::{
    cmd_channel::CommandChannel,
    device::{DeviceError, SimExo, SimExoParams},
    joints::JointLayout,
    override_codec::StiffnessParams,
    sequencer::{
        ExercisePhaseSequencer, Phase, PoseTable, RunOutcome, SequencerConfig, SequencerError,
        SequencerParams,
    },
    trial_logger::{TrialLogger, Trigger},
};

use common::VirtualPacer;

type TestSequencer = ExercisePhaseSequencer<SimExo, VirtualPacer, Vec<u8>>;

/// Short phases at 100 Hz so runs are quick.
fn fast_params(max_trials: u32) -> SequencerParams {
    SequencerParams {
        sample_rate_hz: 100.0,
        ramp_s: 0.5,
        start_pos_s: 0.5,
        begin_ex_s: 1.0,
        wait_s: 0.2,
        back_to_start_s: 0.3,
        wait2_s: 0.2,
        max_trials,
        ..Default::default()
    }
}

fn build<F>(
    params: SequencerParams,
    layout: JointLayout,
    sim_params: SimExoParams,
    side: Side,
    pacer: F,
) -> TestSequencer
where
    F: FnOnce(Arc<CommandChannel>) -> VirtualPacer,
{
    let channel = Arc::new(CommandChannel::new());
    let config = SequencerConfig {
        params,
        layout,
        stiffness: StiffnessParams::default(),
        poses: PoseTable::default(),
        side,
    };
    let logger = TrialLogger::from_writer(Vec::new(), layout).unwrap();

    ExercisePhaseSequencer::new(
        config,
        SimExo::new(layout, sim_params),
        pacer(channel.clone()),
        channel,
        logger,
    )
    .unwrap()
}

/// The TRIGGER column of every record, header excluded.
fn triggers(seq: TestSequencer) -> Vec<String> {
    let (_, _, logger) = seq.into_parts();
    let text = String::from_utf8(logger.into_inner().unwrap()).unwrap();

    text.lines()
        .skip(1)
        .map(|l| l.split('\t').nth(3).unwrap().to_string())
        .collect()
}

fn assert_released_once(seq: &TestSequencer, layout: JointLayout) {
    for group in layout.groups() {
        assert_eq!(seq.device().num_removals(group), 1, "{} removals", group);
        assert!(seq.device().active_overrides(group).is_none());
    }
}

#[test]
fn test_complete_run() {
    let layout = JointLayout::default();
    let mut seq = build(fast_params(3), layout, SimExoParams::default(), Side::Right, |ch| {
        VirtualPacer::new(ch).on_wait(&[SelectX, Go, SelectY, Go, SelectZ, Go])
    });

    assert_eq!(seq.run().unwrap(), RunOutcome::Completed { trials: 3 });
    assert_released_once(&seq, layout);
    assert_eq!(seq.pacer().num_restarts, 1);

    let logger = seq.logger();
    assert_eq!(logger.count(Trigger::Start), 3);
    assert_eq!(logger.count(Trigger::Stop), 0);
    // 100 movement ticks, every second one logged
    assert_eq!(logger.count(Trigger::Moving), 150);

    assert!(matches!(seq.run(), Err(SequencerError::AlreadyRun)));
}

#[test]
fn test_stop_during_movement() {
    let layout = JointLayout::default();
    let mut seq = build(fast_params(1), layout, SimExoParams::default(), Side::Left, |ch| {
        VirtualPacer::new(ch).on_wait(&[SelectZ, Go]).at_tick(150, Stop)
    });

    assert_eq!(seq.run().unwrap(), RunOutcome::Completed { trials: 1 });
    assert_released_once(&seq, layout);

    let t = triggers(seq);
    assert_eq!(t.first().map(|s| s.as_str()), Some("START"));
    assert_eq!(t.iter().filter(|s| *s == "START").count(), 1);
    assert_eq!(t.iter().filter(|s| *s == "STOP").count(), 1);
    assert!(t.iter().any(|s| s == "MOVING"));

    // Nothing is logged after the stop
    assert_eq!(t.last().map(|s| s.as_str()), Some("STOP"));
}

#[test]
fn test_exit_during_movement() {
    let layout = JointLayout::default();
    let exit_tick = 160;
    let mut seq = build(fast_params(2), layout, SimExoParams::default(), Side::Right, |ch| {
        VirtualPacer::new(ch)
            .on_wait(&[SelectY, Go, SelectX, Go])
            .at_tick(exit_tick, Exit)
    });

    assert_eq!(
        seq.run().unwrap(),
        RunOutcome::OperatorAbort {
            phase: Phase::Moving,
            iteration: 1
        }
    );
    assert_released_once(&seq, layout);

    // Terminated within one tick of the exit being published
    assert!(seq.pacer().tick() - exit_tick <= 1);
}

#[test]
fn test_exit_while_waiting_for_selection() {
    let layout = JointLayout::default();
    let mut seq = build(fast_params(20), layout, SimExoParams::default(), Side::Right, |ch| {
        VirtualPacer::new(ch).on_wait(&[Exit])
    });

    assert_eq!(
        seq.run().unwrap(),
        RunOutcome::OperatorAbort {
            phase: Phase::AwaitingSelection,
            iteration: 1
        }
    );
    assert_released_once(&seq, layout);
    assert!(triggers(seq).is_empty());
}

#[test]
fn test_exit_during_hold() {
    let layout = JointLayout::default();
    // Movement of trial 1 ends around tick 205, the first hold follows
    let mut seq = build(fast_params(2), layout, SimExoParams::default(), Side::Right, |ch| {
        VirtualPacer::new(ch).on_wait(&[SelectX, Go]).at_tick(210, Exit)
    });

    assert_eq!(
        seq.run().unwrap(),
        RunOutcome::OperatorAbort {
            phase: Phase::Holding,
            iteration: 1
        }
    );
    assert_released_once(&seq, layout);
}

#[test]
fn test_exit_during_move_to_start() {
    let layout = JointLayout::default();
    // Ramp-up takes ticks 0 to 50, the move to start ticks 50 to 101
    let mut seq = build(fast_params(2), layout, SimExoParams::default(), Side::Right, |ch| {
        VirtualPacer::new(ch).at_tick(60, Exit)
    });

    assert_eq!(
        seq.run().unwrap(),
        RunOutcome::OperatorAbort {
            phase: Phase::MoveToStart,
            iteration: 0
        }
    );
    assert_released_once(&seq, layout);

    // Only checked once the start posture is reached
    assert_eq!(seq.pacer().tick(), 101);
    assert!(triggers(seq).is_empty());
}

#[test]
fn test_exit_while_waiting_for_go() {
    let layout = JointLayout::default();
    let mut seq = build(fast_params(2), layout, SimExoParams::default(), Side::Left, |ch| {
        VirtualPacer::new(ch).on_wait(&[SelectX, Exit])
    });

    assert_eq!(
        seq.run().unwrap(),
        RunOutcome::OperatorAbort {
            phase: Phase::AwaitingStart,
            iteration: 1
        }
    );
    assert_released_once(&seq, layout);

    let exit_tick = seq.pacer().published.last().map(|&(t, _)| t).unwrap();
    assert!(seq.pacer().tick() - exit_tick <= 1);
    assert!(triggers(seq).is_empty());
}

#[test]
fn test_exit_while_returning_home() {
    let layout = JointLayout::default();
    // Trial 1 moves until tick 203 and holds until tick 224
    let exit_tick = 229;
    let mut seq = build(fast_params(2), layout, SimExoParams::default(), Side::Right, |ch| {
        VirtualPacer::new(ch)
            .on_wait(&[SelectY, Go])
            .at_tick(exit_tick, Exit)
    });

    assert_eq!(
        seq.run().unwrap(),
        RunOutcome::OperatorAbort {
            phase: Phase::ReturningHome,
            iteration: 1
        }
    );
    assert_released_once(&seq, layout);
    assert!(seq.pacer().tick() - exit_tick <= 1);
}

#[test]
fn test_exit_while_holding_home() {
    let layout = JointLayout::default();
    // The return to the start posture ends at tick 255
    let exit_tick = 260;
    let mut seq = build(fast_params(2), layout, SimExoParams::default(), Side::Right, |ch| {
        VirtualPacer::new(ch)
            .on_wait(&[SelectZ, Go])
            .at_tick(exit_tick, Exit)
    });

    assert_eq!(
        seq.run().unwrap(),
        RunOutcome::OperatorAbort {
            phase: Phase::HoldingHome,
            iteration: 1
        }
    );
    assert_released_once(&seq, layout);
    assert!(seq.pacer().tick() - exit_tick <= 1);
}

#[test]
fn test_device_failure_releases_overrides() {
    let layout = JointLayout::default();
    let sim_params = SimExoParams {
        fail_after_overrides: Some(10),
        ..Default::default()
    };
    let mut seq = build(fast_params(1), layout, sim_params, Side::Right, |ch| {
        VirtualPacer::new(ch).on_wait(&[SelectX, Go])
    });

    match seq.run() {
        Err(SequencerError::DeviceError(DeviceError::CommFailure(_))) => (),
        other => panic!("expected a device failure, got {:?}", other),
    }
    assert_eq!(seq.state().phase, Phase::Shutdown);
    assert_released_once(&seq, layout);
}

#[test]
fn test_torso_and_wrist_mods() {
    let layout = JointLayout::new(9, 2);
    let mut seq = build(fast_params(1), layout, SimExoParams::default(), Side::Left, |ch| {
        VirtualPacer::new(ch).on_wait(&[SelectY, Go])
    });

    assert_eq!(seq.run().unwrap(), RunOutcome::Completed { trials: 1 });
    assert_released_once(&seq, layout);
    assert!(seq.device().num_override_calls(JointGroup::Torso) > 0);

    let (_, _, logger) = seq.into_parts();
    let text = String::from_utf8(logger.into_inner().unwrap()).unwrap();
    let header: Vec<&str> = text.lines().next().unwrap().split('\t').collect();
    let record: Vec<&str> = text.lines().nth(1).unwrap().split('\t').collect();

    assert_eq!(header.last(), Some(&"torso_j1"));
    assert_eq!(header.len(), record.len());
}

#[test]
fn test_commands_outside_their_phase_are_not_consumed() {
    let layout = JointLayout::default();
    let mut seq = build(fast_params(1), layout, SimExoParams::default(), Side::Right, |ch| {
        // A go during the ramp waits in the channel until it is overwritten by
        // the selection, so the trial still needs its own go.
        VirtualPacer::new(ch).at_tick(10, Go).on_wait(&[SelectX, Go])
    });

    assert_eq!(seq.run().unwrap(), RunOutcome::Completed { trials: 1 });
    assert_eq!(seq.logger().count(Trigger::Start), 1);

    let published: Vec<CommandByte> = seq.pacer().published.iter().map(|(_, c)| *c).collect();
    assert_eq!(published, vec![Go, SelectX, Go]);
}

#[test]
fn test_outcome_serialises() {
    let outcome = RunOutcome::OperatorAbort {
        phase: Phase::ReturningHome,
        iteration: 4,
    };
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(json["OperatorAbort"]["phase"], "ReturningHome");
    assert_eq!(json["OperatorAbort"]["iteration"], 4);
}
