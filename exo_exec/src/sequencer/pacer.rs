//! Tick pacing for the exercise sequencer
//!
//! The sequencer never sleeps itself. Every tick ends with a call into a
//! [`Pacer`], which in the live executable holds the loop to the sample rate
//! and in tests advances a virtual clock.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::thread;
use std::time::{Duration, Instant};

use comms_if::cmd::CommandByte;
use log::warn;

use crate::cmd_channel::CommandChannel;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Source of the sequencer's timing.
pub trait Pacer {
    /// Start the first tick now, discarding any time spent since creation.
    fn restart(&mut self);

    /// Block until the end of the current tick.
    fn wait_tick(&mut self);

    /// Wait up to one tick for a command accepted by `accept`, consuming it.
    ///
    /// Commands which are not accepted are left in the channel.
    fn wait_command(
        &mut self,
        channel: &CommandChannel,
        accept: &dyn Fn(CommandByte) -> bool,
    ) -> Option<CommandByte>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Wall clock pacer sleeping out the remainder of each tick.
#[derive(Debug)]
pub struct SleepPacer {
    period: Duration,
    tick_start: Instant,

    num_ticks: u64,
    num_overruns: u64,
    num_consec_overruns: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SleepPacer {
    /// Create a pacer ticking at the given rate. The first tick starts now.
    pub fn new(sample_rate_hz: f64) -> Self {
        Self::with_period(Duration::from_secs_f64(1.0 / sample_rate_hz))
    }

    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            tick_start: Instant::now(),
            num_ticks: 0,
            num_overruns: 0,
            num_consec_overruns: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn num_ticks(&self) -> u64 {
        self.num_ticks
    }

    /// Total number of ticks whose work took longer than the period.
    pub fn num_overruns(&self) -> u64 {
        self.num_overruns
    }

    fn end_tick(&mut self) {
        self.tick_start = Instant::now();
        self.num_ticks += 1;
    }
}

impl Pacer for SleepPacer {
    fn restart(&mut self) {
        self.tick_start = Instant::now();
        self.num_consec_overruns = 0;
    }

    fn wait_tick(&mut self) {
        let tick_dur = Instant::now() - self.tick_start;

        match self.period.checked_sub(tick_dur) {
            Some(d) => {
                if self.num_consec_overruns > 1 {
                    warn!("{} consecutive tick overruns", self.num_consec_overruns);
                }
                self.num_consec_overruns = 0;
                thread::sleep(d);
            }
            None => {
                self.num_overruns += 1;
                self.num_consec_overruns += 1;

                // Only the first of a burst is reported, later ones are
                // summarised when the burst ends.
                if self.num_consec_overruns == 1 {
                    warn!(
                        "Tick overran by {:.06} s",
                        tick_dur.as_secs_f64() - self.period.as_secs_f64()
                    );
                }
            }
        }

        self.end_tick();
    }

    fn wait_command(
        &mut self,
        channel: &CommandChannel,
        accept: &dyn Fn(CommandByte) -> bool,
    ) -> Option<CommandByte> {
        let cmd = channel.wait_consume_if(accept, self.period);
        self.num_consec_overruns = 0;
        self.end_tick();
        cmd
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sleep_pacer_holds_period() {
        let mut pacer = SleepPacer::with_period(Duration::from_millis(5));
        let start = Instant::now();

        for _ in 0..10 {
            pacer.wait_tick();
        }

        assert!(start.elapsed() >= Duration::from_millis(45));
        assert_eq!(pacer.num_ticks(), 10);
    }

    #[test]
    fn test_sleep_pacer_counts_overruns() {
        let mut pacer = SleepPacer::with_period(Duration::from_millis(1));
        thread::sleep(Duration::from_millis(5));
        pacer.wait_tick();

        assert_eq!(pacer.num_overruns(), 1);
    }

    #[test]
    fn test_restart_forgets_idle_time() {
        let mut pacer = SleepPacer::with_period(Duration::from_millis(20));

        // Time spent before the loop starts, a countdown for example
        thread::sleep(Duration::from_millis(40));
        pacer.restart();
        pacer.wait_tick();

        assert_eq!(pacer.num_overruns(), 0);
        assert_eq!(pacer.num_ticks(), 1);
    }

    #[test]
    fn test_wait_command() {
        let channel = CommandChannel::new();
        let mut pacer = SleepPacer::with_period(Duration::from_millis(5));

        channel.publish(CommandByte::Stop);
        assert_eq!(pacer.wait_command(&channel, &|c| c == CommandByte::Go), None);
        assert_eq!(channel.peek(), Some(CommandByte::Stop));
        assert_eq!(
            pacer.wait_command(&channel, &|c| c == CommandByte::Stop),
            Some(CommandByte::Stop)
        );
    }
}
