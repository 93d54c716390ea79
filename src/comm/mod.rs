//! Executor/state messaging
//!
//! `ExecComm` is the per-node façade over the bus: it filters the shared
//! command topic down to envelopes addressed to its own state, records the
//! latest command for the control loop, and publishes transition envelopes
//! back to the executor.
//!
//! # Delivery rules
//!
//! - Malformed payload: logged at warn, dropped, current command unchanged
//! - Envelope for another state: dropped silently
//! - Envelope for this state: command recorded first, then handler invoked
//!
//! # Note
//!
//! The handler runs on the delivery task. It must return quickly; long work
//! belongs on the node's dispatcher.

mod slot;

pub use slot::CommandSlot;

use std::sync::Arc;

use magellan_core::protocol::{transition_topic, COMMAND_TOPIC};
use magellan_core::{
    Command, CommandEnvelope, DecodeError, ExecSignal, StateId, Transition, TransitionEnvelope,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::bus::{MessageBus, Subscription};
use crate::error::BusError;
use crate::shutdown;

/// Callback invoked for every accepted command envelope.
pub type CommandHandler = Box<dyn Fn(CommandEnvelope) + Send + Sync>;

/// Result of handling one bus delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Addressed to this state; recorded and handed to the handler
    Accepted(CommandEnvelope),
    /// Addressed to another state
    Ignored,
    /// Payload did not decode
    Malformed(DecodeError),
}

/// Messaging façade owned by one StateNode.
pub struct ExecComm {
    state: StateId,
    bus: Arc<dyn MessageBus>,
    current: CommandSlot,
    handler: CommandHandler,
}

impl ExecComm {
    /// Subscribe to the command topic for `state`.
    ///
    /// The returned subscription must be driven with [`ExecComm::listen`].
    pub fn new(
        state: StateId,
        bus: Arc<dyn MessageBus>,
        handler: CommandHandler,
    ) -> Result<(Self, Subscription), BusError> {
        let deliveries = bus.subscribe(COMMAND_TOPIC)?;
        debug!(%state, topic = COMMAND_TOPIC, "ExecComm subscribed");
        Ok((
            Self {
                state,
                bus,
                current: CommandSlot::new(),
                handler,
            },
            deliveries,
        ))
    }

    /// State this instance speaks for.
    pub fn state(&self) -> StateId {
        self.state
    }

    /// Most recently accepted command.
    pub fn current_command(&self) -> Option<Command> {
        self.current.load()
    }

    /// Handle one raw payload from the command topic.
    pub fn on_envelope(&self, raw: &str) -> Delivery {
        let envelope = match CommandEnvelope::decode(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(state = %self.state, payload = raw, error = %e, "Dropping malformed command");
                return Delivery::Malformed(e);
            }
        };

        if !envelope.is_for(self.state) {
            return Delivery::Ignored;
        }

        info!(state = %self.state, command = %envelope.command, "Command received");
        self.current.store(envelope.command);
        (self.handler)(envelope);
        Delivery::Accepted(envelope)
    }

    /// Drive deliveries until shutdown or until the bus goes away.
    pub async fn listen(&self, mut deliveries: Subscription, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown::signaled(&mut shutdown) => break,
                payload = deliveries.recv() => match payload {
                    Some(raw) => {
                        self.on_envelope(&raw);
                    }
                    None => {
                        warn!(state = %self.state, "Command subscription closed");
                        break;
                    }
                },
            }
        }
        debug!(state = %self.state, "ExecComm listener stopped");
    }

    /// Publish a transition envelope for this state. No acknowledgement.
    pub async fn send_transition(
        &self,
        signal: ExecSignal,
        transition: Transition,
    ) -> Result<(), BusError> {
        let envelope = TransitionEnvelope::new(signal, transition);
        let topic = transition_topic(self.state);
        info!(state = %self.state, %signal, %transition, "Sending transition");
        self.bus.publish(&topic, &envelope.encode()).await
    }
}

impl std::fmt::Debug for ExecComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecComm")
            .field("state", &self.state)
            .field("current", &self.current.load())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::LocalBus;
    use std::sync::Mutex;

    fn recording_comm(state: StateId) -> (ExecComm, Subscription, Arc<Mutex<Vec<CommandEnvelope>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let bus: Arc<dyn MessageBus> = Arc::new(LocalBus::default());
        let (comm, deliveries) = ExecComm::new(
            state,
            bus,
            Box::new(move |env: CommandEnvelope| sink.lock().unwrap().push(env)),
        )
        .unwrap();
        (comm, deliveries, seen)
    }

    #[test]
    fn test_new_has_no_current_command() {
        let (comm, deliveries, _) = recording_comm(StateId::FollowWaypoint);
        assert_eq!(comm.current_command(), None);
        assert_eq!(comm.state(), StateId::FollowWaypoint);
        assert_eq!(deliveries.topic(), COMMAND_TOPIC);
    }

    #[test]
    fn test_accepts_own_envelope() {
        let (comm, _deliveries, seen) = recording_comm(StateId::FollowWaypoint);

        let delivery = comm.on_envelope("FollowWaypoint:START");
        let expected = CommandEnvelope::new(StateId::FollowWaypoint, Command::Start);
        assert_eq!(delivery, Delivery::Accepted(expected));
        assert_eq!(comm.current_command(), Some(Command::Start));
        assert_eq!(*seen.lock().unwrap(), vec![expected]);
    }

    #[test]
    fn test_ignores_other_states() {
        let (comm, _deliveries, seen) = recording_comm(StateId::FollowWaypoint);
        comm.on_envelope("FollowWaypoint:START");

        for raw in ["DriveTowardTarget:RESET", "AvoidObstacle:PAUSE"] {
            assert_eq!(comm.on_envelope(raw), Delivery::Ignored);
        }
        assert_eq!(comm.current_command(), Some(Command::Start));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_leaves_command_unchanged() {
        let (comm, _deliveries, seen) = recording_comm(StateId::FollowWaypoint);
        comm.on_envelope("FollowWaypoint:PAUSE");

        for raw in ["", "FollowWaypoint", "A:B:C", "FollowWaypoint:JUMP", "Nowhere:START"] {
            assert!(matches!(comm.on_envelope(raw), Delivery::Malformed(_)));
        }
        assert_eq!(comm.current_command(), Some(Command::Pause));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_last_write_wins() {
        let (comm, _deliveries, _) = recording_comm(StateId::AvoidObstacle);
        comm.on_envelope("AvoidObstacle:START");
        comm.on_envelope("AvoidObstacle:RESET");
        assert_eq!(comm.current_command(), Some(Command::Reset));
    }

    #[tokio::test]
    async fn test_send_transition_topic_and_payload() {
        let bus = Arc::new(LocalBus::default());
        let mut responses = bus.subscribe("exec_response/FollowWaypoint").unwrap();
        let (comm, _deliveries) = ExecComm::new(
            StateId::FollowWaypoint,
            bus.clone(),
            Box::new(|_: CommandEnvelope| {}),
        )
        .unwrap();

        comm.send_transition(ExecSignal::Done, Transition::NearTarget)
            .await
            .unwrap();
        assert_eq!(responses.try_recv().as_deref(), Some("DONE:near_target"));
    }

    #[tokio::test]
    async fn test_listen_dispatches_until_shutdown() {
        let bus = Arc::new(LocalBus::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let (comm, deliveries) = ExecComm::new(
            StateId::DriveTowardTarget,
            bus.clone(),
            Box::new(move |env: CommandEnvelope| sink.lock().unwrap().push(env.command)),
        )
        .unwrap();
        let comm = Arc::new(comm);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let listener = {
            let comm = Arc::clone(&comm);
            tokio::spawn(async move { comm.listen(deliveries, shutdown_rx).await })
        };

        bus.publish(COMMAND_TOPIC, "DriveTowardTarget:START").await.unwrap();
        bus.publish(COMMAND_TOPIC, "FollowWaypoint:RESET").await.unwrap();
        bus.publish(COMMAND_TOPIC, "DriveTowardTarget:PAUSE").await.unwrap();

        // Let the listener drain the channel
        while seen.lock().unwrap().len() < 2 {
            tokio::task::yield_now().await;
        }

        shutdown_tx.send(true).unwrap();
        listener.await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![Command::Start, Command::Pause]);
        assert_eq!(comm.current_command(), Some(Command::Pause));
    }
}
