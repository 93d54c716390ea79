//! Sends one command envelope to a state node, optionally waiting for the
//! state's transition.
//!
//! Usage:
//!   magellan-exec FollowWaypoint START --wait --bind 127.0.0.1:14600 --peer 127.0.0.1:14601
//!
//! With `--wait`, prints the transition as `<StateId> <SIGNAL>:<transition>`.
//! The state node must list this process's bind address as a peer.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, warn};

use magellan::bus::{MessageBus, UdpBus};
use magellan::config::MagellanConfig;
use magellan::executor::ExecutorLink;
use magellan::{logging, Command, StateId, TransitionEnvelope};

#[derive(Parser)]
#[command(name = "magellan-exec")]
#[command(version, about = "Send a command to a mission state", long_about = None)]
struct Args {
    /// Target state
    state: StateId,

    /// START, RESET or PAUSE
    command: Command,

    /// Wait for the state's transition
    #[arg(long)]
    wait: bool,

    /// Give up waiting after this many seconds
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,

    /// Configuration file (defaults apply when missing)
    #[arg(short, long, default_value = "magellan.toml")]
    config: PathBuf,

    /// Override the bus bind address
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Override the bus peers (repeatable)
    #[arg(long = "peer")]
    peers: Vec<SocketAddr>,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = MagellanConfig::load(&args.config).await?;

    let mut bus_config = config.udp_bus();
    if let Some(bind) = args.bind {
        bus_config.bind = bind;
    }
    if !args.peers.is_empty() {
        bus_config.peers = args.peers;
    }
    let udp = UdpBus::bind(bus_config).await?;
    if udp.peers().is_empty() {
        warn!(
            addr = %udp.local_addr(),
            "No bus peers configured; messages stay in this process"
        );
    }
    let bus: Arc<dyn MessageBus> = Arc::new(udp);
    let mut link = ExecutorLink::connect(bus)?;

    match args.command {
        Command::Start => link.activate(args.state).await?,
        command => link.send_command(args.state, command).await?,
    }

    if !args.wait {
        return Ok(ExitCode::SUCCESS);
    }

    let timeout = Duration::from_secs(args.timeout_secs);
    match tokio::time::timeout(timeout, link.next_transition()).await {
        Ok(Some(notice)) => {
            let envelope = TransitionEnvelope::new(notice.signal, notice.transition);
            println!("{} {}", notice.from, envelope);
            Ok(ExitCode::SUCCESS)
        }
        Ok(None) => {
            warn!("Bus closed before a transition arrived");
            Ok(ExitCode::FAILURE)
        }
        Err(_) => {
            warn!(timeout_secs = args.timeout_secs, "No transition before timeout");
            Ok(ExitCode::FAILURE)
        }
    }
}
