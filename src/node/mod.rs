//! StateNode
//!
//! One node per mission state. The node owns an [`ExecComm`], reacts to
//! START/RESET/PAUSE addressed to its state, and on START runs the state's
//! control loop, then reports the winning transition to the executor.
//!
//! # Architecture
//!
//! ```text
//! bus ──> listener task ──> ExecComm::on_envelope ──> command handler
//!                                 │ (records command)      │ (claims START, wakes)
//!                                 ▼                        ▼
//!                            CommandSlot <──polled── dispatcher ──> on_start / on_reset / on_pause
//! ```
//!
//! The listener and the dispatcher share only the command slot, the phase
//! cell and a wake-up [`Notify`].
//!
//! # Start sequence
//!
//! HOLD, arm, pull waypoints, operating mode, control loop. Any vehicle
//! failure on the way aborts the start: the vehicle is put back in HOLD and
//! disarmed, the phase returns to `Idle`, and no transition is sent.
//!
//! # Note
//!
//! A START delivered while the node is `Starting` or `Running` is recorded
//! as the current command and otherwise ignored; the loop is not restarted.
//! A START delivered while RESET or PAUSE is still safing the vehicle runs as
//! soon as that handler returns.

mod behavior;
mod control;
mod phase;

pub use behavior::{
    behavior_for, RcDriveBehavior, RcPwm, StateBehavior, WaypointBehavior, DEFAULT_SERVO_PWM,
    DEFAULT_THROTTLE_PWM,
};
pub use control::LoopExit;
pub use phase::PhaseCell;

use std::sync::Arc;
use std::time::Duration;

use magellan_core::protocol::select_transition;
use magellan_core::{
    Command, CommandEnvelope, ExecSignal, NodePhase, StateId, StateProfile, Transition,
    VehicleMode,
};
use tokio::sync::{watch, Notify};
use tracing::{debug, error, info, warn};

use crate::bus::{MessageBus, Subscription};
use crate::comm::{CommandHandler, ExecComm};
use crate::error::{BusError, NodeError};
use crate::perception::Perception;
use crate::shutdown;
use crate::vehicle::{safe_hold, try_safe_hold, VehicleInterface};

/// Default control loop period (0.5 Hz)
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(2);

/// Collaborators handed to every handler.
#[derive(Clone)]
pub struct StateContext {
    pub vehicle: Arc<dyn VehicleInterface>,
    pub perception: Arc<dyn Perception>,
    pub comm: Arc<ExecComm>,
}

/// How a START ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Loop exhausted and `(DONE, transition)` was sent
    Transitioned(Transition),
    /// Loop exhausted with no predicate holding; vehicle safed, no transition
    Stalled,
    /// Current command changed away from START; no transition
    Interrupted(Option<Command>),
    /// Shutdown during the loop; vehicle safed, no transition
    Shutdown,
}

pub struct StateNode {
    ctx: StateContext,
    behavior: Box<dyn StateBehavior>,
    phase: Arc<PhaseCell>,
    wake: Arc<Notify>,
    tick_period: Duration,
}

impl StateNode {
    /// Build a node for `behavior`'s state and subscribe it to the command
    /// topic.
    ///
    /// The returned subscription is consumed by [`StateNode::run`].
    pub fn new(
        behavior: Box<dyn StateBehavior>,
        bus: Arc<dyn MessageBus>,
        vehicle: Arc<dyn VehicleInterface>,
        perception: Arc<dyn Perception>,
        tick_period: Duration,
    ) -> Result<(Self, Subscription), BusError> {
        let state = behavior.profile().id;
        let phase = Arc::new(PhaseCell::default());
        let wake = Arc::new(Notify::new());

        let handler = command_handler(Arc::clone(&phase), Arc::clone(&wake));
        let (comm, deliveries) = ExecComm::new(state, bus, handler)?;

        info!(%state, period_ms = tick_period.as_millis() as u64, "State node ready");

        Ok((
            Self {
                ctx: StateContext {
                    vehicle,
                    perception,
                    comm: Arc::new(comm),
                },
                behavior,
                phase,
                wake,
                tick_period,
            },
            deliveries,
        ))
    }

    pub fn state(&self) -> StateId {
        self.ctx.comm.state()
    }

    pub fn phase(&self) -> NodePhase {
        self.phase.get()
    }

    pub fn profile(&self) -> StateProfile {
        self.behavior.profile()
    }

    pub fn comm(&self) -> &ExecComm {
        &self.ctx.comm
    }

    // ========================================================================
    // Handlers
    // ========================================================================

    /// Put the vehicle in HOLD, disarm, and return to `Idle`.
    ///
    /// Safe to call in any phase and any number of times.
    pub async fn on_reset(&self) -> Result<(), NodeError> {
        info!(state = %self.state(), "Reset");
        let result = safe_hold(self.ctx.vehicle.as_ref()).await;
        self.phase.set(NodePhase::Idle);
        result.map_err(NodeError::from)
    }

    /// Same vehicle effect as reset; the phase becomes `Paused`.
    pub async fn on_pause(&self) -> Result<(), NodeError> {
        info!(state = %self.state(), "Pause");
        let result = safe_hold(self.ctx.vehicle.as_ref()).await;
        self.phase.set(NodePhase::Paused);
        result.map_err(NodeError::from)
    }

    /// Enter the state, run the control loop, and signal the transition.
    pub async fn on_start(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<StartOutcome, NodeError> {
        let profile = self.behavior.profile();
        self.phase.set(NodePhase::Starting);
        info!(state = %profile.id, mode = %profile.operating_mode, "Start");

        if let Err(e) = self.enter(&profile).await {
            warn!(state = %profile.id, error = %e, "Start aborted");
            self.abort().await;
            return Err(e);
        }

        self.phase.set(NodePhase::Running);
        let exit = match control::run_loop(
            &self.ctx,
            self.behavior.as_ref(),
            &profile,
            self.tick_period,
            shutdown,
        )
        .await
        {
            Ok(exit) => exit,
            Err(e) => {
                warn!(state = %profile.id, error = %e, "Control loop aborted");
                self.abort().await;
                return Err(e.into());
            }
        };
        debug!(state = %profile.id, ?exit, "Control loop exited");

        match exit {
            LoopExit::Exhausted { .. } => self.finish(&profile).await,
            LoopExit::Interrupted { command, .. } => {
                info!(state = %profile.id, ?command, "Control loop interrupted");
                self.phase.set(NodePhase::Idle);
                Ok(StartOutcome::Interrupted(command))
            }
            LoopExit::Shutdown { .. } => {
                self.abort().await;
                Ok(StartOutcome::Shutdown)
            }
        }
    }

    /// Safe hold, arm, refresh waypoints, operating mode.
    async fn enter(&self, profile: &StateProfile) -> Result<(), NodeError> {
        let vehicle = self.ctx.vehicle.as_ref();

        vehicle.set_mode(VehicleMode::Hold).await?;
        vehicle.set_arm(true).await?;

        let pull = vehicle.pull_waypoints().await?;
        info!(state = %profile.id, waypoints = pull.received, "Waypoints refreshed");
        if profile.requires_waypoints && pull.received == 0 {
            return Err(NodeError::NoWaypoints { state: profile.id });
        }

        vehicle.set_mode(profile.operating_mode).await?;
        Ok(())
    }

    async fn finish(&self, profile: &StateProfile) -> Result<StartOutcome, NodeError> {
        let perception = &self.ctx.perception;
        match select_transition(profile.transitions, |t| perception.holds(t)) {
            Some(transition) => {
                self.phase.set(NodePhase::Idle);
                self.ctx
                    .comm
                    .send_transition(ExecSignal::Done, transition)
                    .await?;
                Ok(StartOutcome::Transitioned(transition))
            }
            None => {
                warn!(
                    state = %profile.id,
                    "No transition predicate holds; holding vehicle"
                );
                self.abort().await;
                Ok(StartOutcome::Stalled)
            }
        }
    }

    async fn abort(&self) {
        try_safe_hold(self.ctx.vehicle.as_ref()).await;
        self.phase.set(NodePhase::Idle);
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Listen for commands and dispatch them until shutdown.
    ///
    /// The phase is `Stopped` once this returns.
    pub async fn run(&self, deliveries: Subscription, mut shutdown: watch::Receiver<bool>) {
        let listener = {
            let comm = Arc::clone(&self.ctx.comm);
            let shutdown = shutdown.clone();
            tokio::spawn(async move { comm.listen(deliveries, shutdown).await })
        };

        loop {
            tokio::select! {
                _ = shutdown::signaled(&mut shutdown) => break,
                _ = self.wake.notified() => {}
            }
            self.dispatch(&mut shutdown).await;
            if *shutdown.borrow() {
                break;
            }
        }

        self.phase.set(NodePhase::Stopped);
        if let Err(e) = listener.await {
            warn!(state = %self.state(), error = %e, "Listener task failed");
        }
        info!(state = %self.state(), "State node stopped");
    }

    /// Act on the latest command.
    ///
    /// A START recorded while RESET/PAUSE was safing the vehicle is newer
    /// than the command just handled, so it runs before waiting again. The
    /// hold handler's phase write may have replaced that START's claim.
    async fn dispatch(&self, shutdown: &mut watch::Receiver<bool>) {
        let state = self.state();
        let mut command = self.ctx.comm.current_command();
        loop {
            let result = match command {
                Some(Command::Start) if self.phase.get() == NodePhase::Starting => {
                    self.on_start(shutdown).await.map(|outcome| {
                        info!(%state, ?outcome, "Start finished");
                    })
                }
                Some(Command::Start) => {
                    debug!(%state, phase = %self.phase.get(), "No start claimed");
                    Ok(())
                }
                Some(Command::Reset) => self.on_reset().await,
                Some(Command::Pause) => self.on_pause().await,
                None => Ok(()),
            };
            if let Err(e) = result {
                error!(%state, error = %e, "Command handling failed");
            }

            let held = matches!(command, Some(Command::Reset | Command::Pause));
            if !held || *shutdown.borrow() {
                return;
            }
            command = self.ctx.comm.current_command();
            if command != Some(Command::Start) {
                return;
            }
            if self.phase.get() != NodePhase::Starting && !self.phase.try_claim_start() {
                return;
            }
            debug!(%state, "START arrived during hold; starting");
        }
    }
}

/// Handler run on the delivery path: claims START, wakes the dispatcher.
fn command_handler(phase: Arc<PhaseCell>, wake: Arc<Notify>) -> CommandHandler {
    Box::new(move |envelope: CommandEnvelope| match envelope.command {
        Command::Start => {
            if phase.try_claim_start() {
                wake.notify_one();
            } else {
                debug!(
                    state = %envelope.target,
                    phase = %phase.get(),
                    "START ignored while active"
                );
            }
        }
        Command::Reset | Command::Pause => wake.notify_one(),
    })
}

impl std::fmt::Debug for StateNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateNode")
            .field("state", &self.state())
            .field("phase", &self.phase.get())
            .field("tick_period", &self.tick_period)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::LocalBus;
    use crate::error::{VehicleError, VehicleOp};
    use crate::perception::ScriptedPerception;
    use crate::vehicle::{SimVehicle, VehicleCall};
    use magellan_core::mission::Waypoint;

    struct Fixture {
        node: StateNode,
        vehicle: Arc<SimVehicle>,
        perception: Arc<ScriptedPerception>,
        responses: Subscription,
    }

    fn fixture(state: StateId, waypoints: u16) -> Fixture {
        let bus = Arc::new(LocalBus::default());
        let mission = (0..waypoints)
            .map(|seq| Waypoint::from_degrees(seq, 37.0, -122.0, 0.0))
            .collect();
        let vehicle = Arc::new(SimVehicle::with_mission(mission));
        let perception = Arc::new(ScriptedPerception::new());
        let responses = bus
            .subscribe(&magellan_core::protocol::transition_topic(state))
            .unwrap();
        let profile = StateProfile::for_state(state);
        let (node, _deliveries) = StateNode::new(
            behavior_for(profile, RcPwm::default()),
            bus,
            vehicle.clone(),
            perception.clone(),
            DEFAULT_TICK_PERIOD,
        )
        .unwrap();
        Fixture {
            node,
            vehicle,
            perception,
            responses,
        }
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let f = fixture(StateId::FollowWaypoint, 0);
        for _ in 0..3 {
            f.node.on_reset().await.unwrap();
            assert_eq!(f.node.phase(), NodePhase::Idle);
        }
        let expected: Vec<VehicleCall> = (0..3)
            .flat_map(|_| [VehicleCall::SetMode(VehicleMode::Hold), VehicleCall::SetArm(false)])
            .collect();
        assert_eq!(f.vehicle.calls(), expected);
    }

    #[tokio::test]
    async fn test_pause_safes_vehicle() {
        let f = fixture(StateId::AvoidObstacle, 0);
        f.vehicle.set_arm(true).await.unwrap();
        f.vehicle.clear_calls();

        f.node.on_pause().await.unwrap();
        f.node.on_pause().await.unwrap();
        assert_eq!(f.node.phase(), NodePhase::Paused);
        assert!(!f.vehicle.armed().await.unwrap());
        assert_eq!(
            f.vehicle.calls(),
            vec![
                VehicleCall::SetMode(VehicleMode::Hold),
                VehicleCall::SetArm(false),
                VehicleCall::SetMode(VehicleMode::Hold),
                VehicleCall::SetArm(false),
            ]
        );
    }

    #[tokio::test]
    async fn test_reset_reports_vehicle_failure() {
        let f = fixture(StateId::FollowWaypoint, 0);
        f.vehicle.fail(VehicleOp::SetArm);
        let err = f.node.on_reset().await.unwrap_err();
        assert!(matches!(
            err,
            NodeError::Vehicle(VehicleError::CallFailed {
                op: VehicleOp::SetArm,
                ..
            })
        ));
        assert_eq!(f.node.phase(), NodePhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_without_start_command_is_interrupted() {
        let mut f = fixture(StateId::FollowWaypoint, 5);
        let (_tx, mut shutdown) = watch::channel(false);

        // No START recorded: the first tick sees no command and exits
        let outcome = f.node.on_start(&mut shutdown).await.unwrap();
        assert_eq!(outcome, StartOutcome::Interrupted(None));
        assert_eq!(f.node.phase(), NodePhase::Idle);
        assert_eq!(f.responses.try_recv(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_entry_sequence() {
        let mut f = fixture(StateId::FollowWaypoint, 5);
        f.perception.set(Transition::NearTarget, true);
        f.node.comm().on_envelope("FollowWaypoint:START");
        let (_tx, mut shutdown) = watch::channel(false);

        let outcome = f.node.on_start(&mut shutdown).await.unwrap();
        assert_eq!(outcome, StartOutcome::Transitioned(Transition::NearTarget));
        assert_eq!(
            f.vehicle.calls(),
            vec![
                VehicleCall::SetMode(VehicleMode::Hold),
                VehicleCall::SetArm(true),
                VehicleCall::PullWaypoints,
                VehicleCall::SetMode(VehicleMode::Auto),
            ]
        );
        assert_eq!(f.responses.try_recv().as_deref(), Some("DONE:near_target"));
        assert_eq!(f.responses.try_recv(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_waypoints_aborts_follow_waypoint() {
        let mut f = fixture(StateId::FollowWaypoint, 0);
        f.perception.set(Transition::NearTarget, true);
        f.node.comm().on_envelope("FollowWaypoint:START");
        let (_tx, mut shutdown) = watch::channel(false);

        let err = f.node.on_start(&mut shutdown).await.unwrap_err();
        assert!(matches!(
            err,
            NodeError::NoWaypoints {
                state: StateId::FollowWaypoint
            }
        ));
        assert_eq!(f.node.phase(), NodePhase::Idle);
        assert!(!f.vehicle.armed().await.unwrap());
        assert_eq!(f.vehicle.mode().await.unwrap(), VehicleMode::Hold);
        assert_eq!(f.responses.try_recv(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rc_states_do_not_need_waypoints() {
        let mut f = fixture(StateId::AvoidObstacle, 0);
        f.perception.set(Transition::ObstacleCleared, true);
        f.node.comm().on_envelope("AvoidObstacle:START");
        let (_tx, mut shutdown) = watch::channel(false);

        let outcome = f.node.on_start(&mut shutdown).await.unwrap();
        assert_eq!(
            outcome,
            StartOutcome::Transitioned(Transition::ObstacleCleared)
        );
        // One override per tick of the budget
        assert_eq!(
            f.vehicle.overrides_sent(),
            StateProfile::for_state(StateId::AvoidObstacle).tick_budget
        );
        assert_eq!(f.responses.try_recv().as_deref(), Some("DONE:obstacle_cleared"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rc_override_failure_aborts_start() {
        let mut f = fixture(StateId::DriveTowardTarget, 0);
        f.perception.set(Transition::TargetTouched, true);
        f.vehicle.fail(VehicleOp::SetThrottleServo);
        f.node.comm().on_envelope("DriveTowardTarget:START");
        let (_tx, mut shutdown) = watch::channel(false);

        let err = f.node.on_start(&mut shutdown).await.unwrap_err();
        assert!(matches!(err, NodeError::Vehicle(_)));
        assert_eq!(f.node.phase(), NodePhase::Idle);
        assert!(!f.vehicle.armed().await.unwrap());
        assert_eq!(f.responses.try_recv(), None);
    }
}
