//! Runs one StateNode process.
//!
//! Usage:
//!   magellan-state --state FollowWaypoint --bind 127.0.0.1:14601 --peer 127.0.0.1:14600
//!
//! The executor's address must be listed as a peer so transition envelopes
//! reach it. With `--monitor`, the vehicle status monitor runs in the same
//! process and publishes on the status topic.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use magellan::bus::{MessageBus, UdpBus};
use magellan::config::MagellanConfig;
use magellan::monitor::{StatusMonitor, DEFAULT_POLL_PERIOD};
use magellan::node::{behavior_for, StateNode};
use magellan::perception::RandomPerception;
use magellan::vehicle::SimVehicle;
use magellan::{logging, shutdown, StateId};

#[derive(Parser)]
#[command(name = "magellan-state")]
#[command(version, about = "Run one mission state node", long_about = None)]
struct Args {
    /// State this node implements
    #[arg(short, long)]
    state: StateId,

    /// Configuration file (defaults apply when missing)
    #[arg(short, long, default_value = "magellan.toml")]
    config: PathBuf,

    /// Override the bus bind address
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Override the bus peers (repeatable)
    #[arg(long = "peer")]
    peers: Vec<SocketAddr>,

    /// Also run the vehicle status monitor
    #[arg(long)]
    monitor: bool,

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
            error!(error = %e, "State node failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = shutdown::on_ctrl_c();
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

    let vehicle = Arc::new(SimVehicle::new(config.sim_vehicle()));
    let perception = Arc::new(RandomPerception::new(
        config.perception.seed,
        config.perception.probability,
    ));

    let profile = config.profile(args.state);
    info!(
        state = %profile.id,
        ticks = profile.tick_budget,
        mode = %profile.operating_mode,
        "Loaded state profile"
    );

    let (node, deliveries) = StateNode::new(
        behavior_for(profile, config.rc_pwm()),
        Arc::clone(&bus),
        vehicle.clone(),
        perception,
        config.tick_period(),
    )?;

    let monitor = if args.monitor {
        let mut monitor = StatusMonitor::new(vehicle, Arc::clone(&bus));
        let shutdown = shutdown.clone();
        Some(tokio::spawn(async move {
            monitor.run(DEFAULT_POLL_PERIOD, shutdown).await;
        }))
    } else {
        None
    };

    node.run(deliveries, shutdown).await;

    if let Some(task) = monitor {
        task.await?;
    }
    Ok(())
}
