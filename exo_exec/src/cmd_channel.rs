//! # Command channel
//!
//! A single-slot mailbox carrying the most recent operator command from the
//! receiving thread to the sequencer. Publishing overwrites any command that
//! has not yet been consumed, so only the latest command is ever seen.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use comms_if::cmd::CommandByte;
use log::trace;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Single-slot, last-write-wins command mailbox.
#[derive(Debug, Default)]
pub struct CommandChannel {
    slot: Mutex<Slot>,
    published: Condvar,
}

#[derive(Debug, Default)]
struct Slot {
    cmd: Option<CommandByte>,
    num_published: u64,
    num_overwritten: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CommandChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a command, replacing any pending one.
    ///
    /// Returns the command that was overwritten, if any.
    pub fn publish(&self, cmd: CommandByte) -> Option<CommandByte> {
        let mut slot = self.lock();
        let previous = slot.cmd.replace(cmd);

        slot.num_published += 1;
        if let Some(p) = previous {
            slot.num_overwritten += 1;
            trace!("Command '{}' overwritten by '{}' before it was consumed", p, cmd);
        }

        self.published.notify_all();
        previous
    }

    /// Take the pending command, leaving the slot empty.
    pub fn try_consume(&self) -> Option<CommandByte> {
        self.lock().cmd.take()
    }

    /// Take the pending command only if it is accepted by `accept`.
    ///
    /// A rejected command stays in the slot, where it can still be consumed
    /// by a later call or overwritten by a newer command.
    pub fn consume_if<F>(&self, accept: F) -> Option<CommandByte>
    where
        F: Fn(CommandByte) -> bool,
    {
        Self::take_if(&mut self.lock(), &accept)
    }

    /// Block until a command accepted by `accept` is pending or the timeout
    /// elapses, consuming the accepted command.
    pub fn wait_consume_if<F>(&self, accept: F, timeout: Duration) -> Option<CommandByte>
    where
        F: Fn(CommandByte) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut slot = self.lock();

        loop {
            if let Some(cmd) = Self::take_if(&mut slot, &accept) {
                return Some(cmd);
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }

            slot = match self.published.wait_timeout(slot, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    /// The pending command without consuming it.
    pub fn peek(&self) -> Option<CommandByte> {
        self.lock().cmd
    }

    /// Total number of published commands.
    pub fn num_published(&self) -> u64 {
        self.lock().num_published
    }

    /// Number of commands overwritten before they were consumed.
    pub fn num_overwritten(&self) -> u64 {
        self.lock().num_overwritten
    }

    fn take_if<F>(slot: &mut Slot, accept: &F) -> Option<CommandByte>
    where
        F: Fn(CommandByte) -> bool,
    {
        match slot.cmd {
            Some(cmd) if accept(cmd) => slot.cmd.take(),
            _ => None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        // The slot is always left consistent, so a poisoned lock is still
        // usable.
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_last_write_wins() {
        let ch = CommandChannel::new();
        assert_eq!(ch.publish(CommandByte::SelectX), None);
        assert_eq!(ch.publish(CommandByte::Go), Some(CommandByte::SelectX));

        assert_eq!(ch.try_consume(), Some(CommandByte::Go));
        assert_eq!(ch.try_consume(), None);
        assert_eq!(ch.num_published(), 2);
        assert_eq!(ch.num_overwritten(), 1);
    }

    #[test]
    fn test_consume_if_leaves_rejected() {
        let ch = CommandChannel::new();
        ch.publish(CommandByte::Go);

        assert_eq!(ch.consume_if(|c| c == CommandByte::Stop), None);
        assert_eq!(ch.peek(), Some(CommandByte::Go));
        assert_eq!(ch.consume_if(|c| c == CommandByte::Go), Some(CommandByte::Go));
        assert_eq!(ch.peek(), None);
    }

    #[test]
    fn test_wait_times_out() {
        let ch = CommandChannel::new();
        let start = Instant::now();

        assert_eq!(ch.wait_consume_if(|_| true, Duration::from_millis(20)), None);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_wait_wakes_on_publish() {
        let ch = Arc::new(CommandChannel::new());
        let publisher = {
            let ch = ch.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                ch.publish(CommandByte::Exit);
            })
        };

        let got = ch.wait_consume_if(|c| c == CommandByte::Exit, Duration::from_secs(5));
        publisher.join().unwrap();

        assert_eq!(got, Some(CommandByte::Exit));
    }
}
