//! Cooperative control loop
//!
//! Ticks at a fixed period. Each tick:
//!
//! 1. Counts the tick and logs progress
//! 2. Exits with [`LoopExit::Interrupted`] if the current command is no
//!    longer START
//! 3. Runs the behavior's tick action
//! 4. Exits with [`LoopExit::Exhausted`] once the tick budget is spent
//!
//! The shutdown signal is raced against the tick timer, so shutdown exits
//! between ticks. A command change is only seen on the next tick: the
//! cancellation latency is at most one tick period plus one tick action.

use std::time::Duration;

use magellan_core::{Command, StateProfile};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::info;

use super::behavior::StateBehavior;
use super::StateContext;
use crate::error::VehicleError;
use crate::shutdown;

/// Why the control loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Tick budget spent with START still current
    Exhausted { ticks: u32 },
    /// Current command changed away from START
    Interrupted { ticks: u32, command: Option<Command> },
    /// Shutdown signalled
    Shutdown { ticks: u32 },
}

pub(crate) async fn run_loop(
    ctx: &StateContext,
    behavior: &dyn StateBehavior,
    profile: &StateProfile,
    period: Duration,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<LoopExit, VehicleError> {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks: u32 = 0;

    loop {
        tokio::select! {
            _ = shutdown::signaled(shutdown) => return Ok(LoopExit::Shutdown { ticks }),
            _ = interval.tick() => {}
        }

        ticks += 1;
        info!(
            state = %profile.id,
            tick = ticks,
            budget = profile.tick_budget,
            "Control loop running"
        );

        let command = ctx.comm.current_command();
        if command != Some(Command::Start) {
            return Ok(LoopExit::Interrupted { ticks, command });
        }

        behavior.on_tick(ctx, ticks).await?;

        if ticks >= profile.tick_budget {
            return Ok(LoopExit::Exhausted { ticks });
        }
    }
}
