//! # Network Module
//!
//! Commands travel as UDP datagrams whose first byte is the command. There is
//! no response and no acknowledgement, the sender simply fires and forgets.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use crate::cmd::{CmdParseError, CommandByte};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network parameters, loaded from `net.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetParams {
    /// Address the command socket binds to.
    pub cmd_bind_addr: String,

    /// Address that command senders send to.
    pub cmd_target_addr: String,

    /// Largest datagram read in one receive, longer datagrams are truncated.
    pub max_datagram_size: usize,

    /// Receive timeout of the command socket. Bounds how long the receiver
    /// thread takes to notice a shutdown request.
    ///
    /// Units: milliseconds
    pub recv_timeout_ms: u64,
}

/// A bound socket receiving command datagrams.
pub struct CmdSocket {
    socket: UdpSocket,
    buffer: Vec<u8>,
}

/// A socket sending command datagrams to a fixed target.
pub struct CmdSender {
    socket: UdpSocket,
    target: SocketAddr,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum NetError {
    #[error("Invalid socket address \"{0}\": {1}")]
    InvalidAddress(String, std::net::AddrParseError),

    #[error("Could not bind the socket to {0}: {1}")]
    BindError(String, std::io::Error),

    #[error("Could not set the {0} socket option: {1}")]
    SocketOptionError(&'static str, std::io::Error),

    #[error("Could not receive from the socket: {0}")]
    RecvError(std::io::Error),

    #[error("Could not send to {0}: {1}")]
    SendError(SocketAddr, std::io::Error),
}

/// The result of waiting for one datagram.
#[derive(Debug, PartialEq)]
pub enum RecvOutcome {
    /// The receive timeout elapsed with nothing received.
    Timeout,

    /// A valid command was received.
    Cmd {
        from: SocketAddr,
        cmd: CommandByte,
    },

    /// A datagram was received but its first byte isn't a command.
    Malformed {
        from: SocketAddr,
        error: CmdParseError,
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for NetParams {
    fn default() -> Self {
        Self {
            cmd_bind_addr: String::from("0.0.0.0:8080"),
            cmd_target_addr: String::from("127.0.0.1:8080"),
            max_datagram_size: 1024,
            recv_timeout_ms: 100,
        }
    }
}

impl CmdSocket {
    /// Bind a new command socket as given by the parameters.
    pub fn bind(params: &NetParams) -> Result<Self, NetError> {
        Self::bind_addr(&params.cmd_bind_addr, params)
    }

    /// Bind a new command socket on an explicit address, taking the remaining
    /// options from the parameters.
    pub fn bind_addr(addr: &str, params: &NetParams) -> Result<Self, NetError> {
        let socket = UdpSocket::bind(addr)
            .map_err(|e| NetError::BindError(addr.to_string(), e))?;

        // A zero duration is rejected by the standard library, so clamp to 1 ms
        let timeout = Duration::from_millis(params.recv_timeout_ms.max(1));
        socket.set_read_timeout(Some(timeout))
            .map_err(|e| NetError::SocketOptionError("read_timeout", e))?;

        debug!("Command socket bound to {} ({} ms receive timeout)", addr, timeout.as_millis());

        Ok(Self {
            socket,
            buffer: vec![0u8; params.max_datagram_size.max(1)],
        })
    }

    /// The address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, NetError> {
        self.socket.local_addr().map_err(NetError::RecvError)
    }

    /// Wait up to the receive timeout for one datagram and parse it.
    pub fn recv_cmd(&mut self) -> Result<RecvOutcome, NetError> {
        match self.socket.recv_from(&mut self.buffer) {
            Ok((n, from)) => Ok(match CommandByte::from_datagram(&self.buffer[..n]) {
                Ok(cmd) => RecvOutcome::Cmd { from, cmd },
                Err(error) => RecvOutcome::Malformed { from, error },
            }),
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                Ok(RecvOutcome::Timeout)
            },
            Err(e) => Err(NetError::RecvError(e)),
        }
    }
}

impl CmdSender {
    /// Create a sender targeting the address given in the parameters.
    pub fn new(params: &NetParams) -> Result<Self, NetError> {
        Self::to_addr(&params.cmd_target_addr)
    }

    /// Create a sender targeting an explicit address.
    pub fn to_addr(target: &str) -> Result<Self, NetError> {
        let target: SocketAddr = target
            .parse()
            .map_err(|e| NetError::InvalidAddress(target.to_string(), e))?;

        let bind_addr = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr)
            .map_err(|e| NetError::BindError(bind_addr.to_string(), e))?;

        debug!("Command sender targeting {}", target);

        Ok(Self { socket, target })
    }

    /// Send a single command.
    pub fn send_cmd(&self, cmd: CommandByte) -> Result<(), NetError> {
        self.send_raw(&[cmd.as_byte()])
    }

    /// Send an arbitrary payload, for exercising the receiver's handling of
    /// malformed datagrams.
    pub fn send_raw(&self, payload: &[u8]) -> Result<(), NetError> {
        self.socket
            .send_to(payload, self.target)
            .map(|_| ())
            .map_err(|e| NetError::SendError(self.target, e))
    }

    /// The address commands are sent to.
    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn loopback_params() -> NetParams {
        NetParams {
            cmd_bind_addr: String::from("127.0.0.1:0"),
            recv_timeout_ms: 50,
            ..Default::default()
        }
    }

    #[test]
    fn test_send_and_receive() {
        let mut socket = CmdSocket::bind(&loopback_params()).unwrap();
        let addr = socket.local_addr().unwrap();
        let sender = CmdSender::to_addr(&addr.to_string()).unwrap();

        sender.send_cmd(CommandByte::Go).unwrap();
        sender.send_raw(b"?").unwrap();

        match socket.recv_cmd().unwrap() {
            RecvOutcome::Cmd { cmd, .. } => assert_eq!(cmd, CommandByte::Go),
            o => panic!("Expected a command, got {:?}", o),
        }
        match socket.recv_cmd().unwrap() {
            RecvOutcome::Malformed { error, .. } => {
                assert_eq!(error, CmdParseError::UnrecognisedByte(b'?'))
            },
            o => panic!("Expected a malformed datagram, got {:?}", o),
        }
        assert_eq!(socket.recv_cmd().unwrap(), RecvOutcome::Timeout);
    }

    #[test]
    fn test_invalid_target() {
        assert!(matches!(
            CmdSender::to_addr("not an address"),
            Err(NetError::InvalidAddress(_, _))
        ));
    }
}
