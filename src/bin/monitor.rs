//! Prints status tokens published on the status topic.
//!
//! This is the notification side of the status monitor: run a state node with
//! `--monitor` and list this process as one of its peers.
//!
//! Usage:
//!   magellan-monitor --bind 127.0.0.1:14610

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use magellan::bus::{MessageBus, UdpBus};
use magellan::config::MagellanConfig;
use magellan::logging;
use magellan::shutdown;
use magellan_core::protocol::STATUS_TOPIC;

#[derive(Parser)]
#[command(name = "magellan-monitor")]
#[command(version, about = "Print vehicle status tokens", long_about = None)]
struct Args {
    /// Configuration file (defaults apply when missing)
    #[arg(short, long, default_value = "magellan.toml")]
    config: PathBuf,

    /// Override the bus bind address
    #[arg(long)]
    bind: Option<SocketAddr>,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Monitor failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut shutdown = shutdown::on_ctrl_c();
    let config = MagellanConfig::load(&args.config).await?;

    let mut bus_config = config.udp_bus();
    if let Some(bind) = args.bind {
        bus_config.bind = bind;
    }
    let bus = UdpBus::bind(bus_config).await?;
    let mut status = bus.subscribe(STATUS_TOPIC)?;
    info!(addr = %bus.local_addr(), topic = STATUS_TOPIC, "Listening for status");

    loop {
        tokio::select! {
            _ = shutdown::signaled(&mut shutdown) => break,
            token = status.recv() => match token {
                Some(token) => println!("{token}"),
                None => break,
            },
        }
    }
    Ok(())
}
