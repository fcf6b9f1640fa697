//! # Command sources
//!
//! Background threads feeding the [`CommandChannel`]. The live source reads
//! datagrams from the command socket; the scripted source replays a
//! timestamped command script, which is used for dry runs and rehearsals.
//!
//! Both run until the handle is dropped, at which point the thread is asked to
//! stop and joined.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use comms_if::net::{CmdSocket, NetError, RecvOutcome};
use log::{debug, error, info, warn};
use util::script_interpreter::{PendingCmds, ScriptInterpreter};

use crate::cmd_channel::CommandChannel;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Back-off after a socket error so a persistently failing socket doesn't spin.
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Polling period of the scripted source.
const SCRIPT_POLL_PERIOD: Duration = Duration::from_millis(1);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Handle to a running command source thread.
pub struct CmdSourceHandle {
    name: &'static str,
    local_addr: Option<SocketAddr>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CmdSourceError {
    #[error("Network error: {0}")]
    NetError(#[from] NetError),

    #[error("Could not spawn the {0} thread: {1}")]
    SpawnError(&'static str, std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CmdSourceHandle {
    /// Start receiving commands from the socket, publishing every valid
    /// command into the channel.
    pub fn spawn_udp(
        mut socket: CmdSocket,
        channel: Arc<CommandChannel>,
    ) -> Result<Self, CmdSourceError> {
        let name = "cmd_receiver";
        let local_addr = socket.local_addr()?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = shutdown.clone();

        let join_handle = thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                info!("Listening for commands on {}", local_addr);

                while !thread_shutdown.load(Ordering::Relaxed) {
                    match socket.recv_cmd() {
                        Ok(RecvOutcome::Timeout) => (),
                        Ok(RecvOutcome::Cmd { from, cmd }) => {
                            info!("Client {}: {}", from, cmd);
                            channel.publish(cmd);
                        }
                        Ok(RecvOutcome::Malformed { from, error }) => {
                            warn!("Ignoring datagram from {}: {}", from, error);
                        }
                        Err(e) => {
                            error!("Command socket error: {}", e);
                            thread::sleep(RECV_ERROR_BACKOFF);
                        }
                    }
                }

                debug!("Command receiver stopped");
            })
            .map_err(|e| CmdSourceError::SpawnError(name, e))?;

        Ok(Self {
            name,
            local_addr: Some(local_addr),
            shutdown,
            join_handle: Some(join_handle),
        })
    }

    /// Start replaying a command script. Script timestamps are measured from
    /// the moment this is called.
    pub fn spawn_script(
        mut interpreter: ScriptInterpreter,
        channel: Arc<CommandChannel>,
    ) -> Result<Self, CmdSourceError> {
        let name = "script_feeder";
        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = shutdown.clone();

        info!(
            "Replaying {} scripted commands over {:.3} s",
            interpreter.get_num_cmds(),
            interpreter.get_duration()
        );

        let join_handle = thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                let start = Instant::now();

                while !thread_shutdown.load(Ordering::Relaxed) {
                    match interpreter.get_pending_cmds(start.elapsed().as_secs_f64()) {
                        PendingCmds::None => (),
                        PendingCmds::Some(cmds) => {
                            for cmd in cmds {
                                info!("Script: {}", cmd);
                                channel.publish(cmd);
                            }
                        }
                        PendingCmds::EndOfScript => {
                            info!("End of command script");
                            break;
                        }
                    }

                    thread::sleep(SCRIPT_POLL_PERIOD);
                }
            })
            .map_err(|e| CmdSourceError::SpawnError(name, e))?;

        Ok(Self {
            name,
            local_addr: None,
            shutdown,
            join_handle: Some(join_handle),
        })
    }

    /// Address of the command socket, `None` for a scripted source.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

impl Drop for CmdSourceHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        if let Some(jh) = self.join_handle.take() {
            if jh.join().is_err() {
                error!("The {} thread panicked", self.name);
            }
        }
    }
}
