//! Shared helpers for the sequencer integration tests

use std::collections::VecDeque;
use std::sync::Arc;

use comms_if::cmd::CommandByte;
use exo_lib::{cmd_channel::CommandChannel, sequencer::Pacer};

/// Upper bound on ticks in a test run, so a sequencer stuck waiting fails the
/// test instead of hanging it.
const TICK_LIMIT: u64 = 100_000;

/// A pacer advancing a virtual clock instead of sleeping.
///
/// Commands can be published when the clock reaches a given tick, or fed one
/// at a time whenever the sequencer waits for a command and the channel holds
/// nothing it would accept.
pub struct VirtualPacer {
    channel: Arc<CommandChannel>,
    tick: u64,
    timed: VecDeque<(u64, CommandByte)>,
    on_wait: VecDeque<CommandByte>,
    pub published: Vec<(u64, CommandByte)>,
    pub num_restarts: u32,
}

impl VirtualPacer {
    pub fn new(channel: Arc<CommandChannel>) -> Self {
        Self {
            channel,
            tick: 0,
            timed: VecDeque::new(),
            on_wait: VecDeque::new(),
            published: vec![],
            num_restarts: 0,
        }
    }

    /// Publish `cmd` when the clock reaches `tick`. Must be called in tick order.
    pub fn at_tick(mut self, tick: u64, cmd: CommandByte) -> Self {
        self.timed.push_back((tick, cmd));
        self
    }

    /// Feed these commands, in order, to waits which would otherwise get nothing.
    pub fn on_wait(mut self, cmds: &[CommandByte]) -> Self {
        self.on_wait.extend(cmds.iter().copied());
        self
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    fn publish(&mut self, cmd: CommandByte) {
        self.published.push((self.tick, cmd));
        self.channel.publish(cmd);
    }

    fn advance(&mut self) {
        self.tick += 1;
        assert!(self.tick < TICK_LIMIT, "sequencer did not finish within {} ticks", TICK_LIMIT);

        while let Some(&(t, cmd)) = self.timed.front() {
            if t > self.tick {
                break;
            }
            self.timed.pop_front();
            self.publish(cmd);
        }
    }
}

impl Pacer for VirtualPacer {
    fn restart(&mut self) {
        self.num_restarts += 1;
    }

    fn wait_tick(&mut self) {
        self.advance();
    }

    fn wait_command(
        &mut self,
        channel: &CommandChannel,
        accept: &dyn Fn(CommandByte) -> bool,
    ) -> Option<CommandByte> {
        if !channel.peek().map_or(false, |c| accept(c)) {
            if let Some(cmd) = self.on_wait.pop_front() {
                self.publish(cmd);
            }
        }

        let cmd = channel.consume_if(accept);
        self.advance();
        cmd
    }
}
