//! Send a single command datagram

use comms_if::{cmd::CommandByte, net::CmdSender};
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(name = "test_cmd_send", about = "Send one command to the exercise executable")]
struct Opt {
    /// Address of the exercise executable
    #[structopt(long, default_value = "127.0.0.1:8080")]
    target: String,

    /// Command to send (x, y, z, g, s, e or a long alias such as `stop`)
    cmd: CommandByte,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::from_args();

    let sender = match CmdSender::to_addr(&opt.target) {
        Ok(s) => s,
        Err(e) => {
            println!("Could not create the sender");
            return Err(e.into())
        }
    };

    sender.send_cmd(opt.cmd)?;

    println!("Sent '{}' to {}", opt.cmd, sender.target());

    Ok(())
}
