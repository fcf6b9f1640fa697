//! Receive-only command monitor
//!
//! Binds the command port and prints every datagram received. Nothing is
//! actuated, this is for checking that the decoder is reaching the machine.

use comms_if::net::{CmdSocket, NetParams, RecvOutcome};
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(name = "test_cmd_monitor", about = "Print command datagrams as they arrive")]
struct Opt {
    /// Address to bind to
    #[structopt(long, default_value = "0.0.0.0:8080")]
    bind: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::from_args();

    let params = NetParams {
        cmd_bind_addr: opt.bind,
        recv_timeout_ms: 1000,
        ..Default::default()
    };

    let mut socket = CmdSocket::bind(&params)?;

    println!("Monitoring commands on {}", socket.local_addr()?);

    loop {
        match socket.recv_cmd()? {
            RecvOutcome::Timeout => (),
            RecvOutcome::Cmd { from, cmd } => println!("{}: {:?} ('{}')", from, cmd, cmd),
            RecvOutcome::Malformed { from, error } => println!("{}: ignored, {}", from, error),
        }
    }
}
