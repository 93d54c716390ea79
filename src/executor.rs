//! Executor-side link
//!
//! The executor owns the mission graph (outside this crate). This link gives
//! it the two things it needs from the protocol: addressing commands to a
//! state, and receiving that state's transition envelopes.
//!
//! One forwarding task per state transition topic feeds a single channel,
//! so notices from different states arrive in no particular order relative
//! to each other.

use std::sync::Arc;

use magellan_core::protocol::{transition_topic, COMMAND_TOPIC};
use magellan_core::{
    Command, CommandEnvelope, ExecSignal, StateId, Transition, TransitionEnvelope,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bus::MessageBus;
use crate::error::BusError;

const NOTICE_CHANNEL_CAPACITY: usize = 64;

/// A decoded transition envelope with the state it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionNotice {
    pub from: StateId,
    pub signal: ExecSignal,
    pub transition: Transition,
}

pub struct ExecutorLink {
    bus: Arc<dyn MessageBus>,
    active: Option<StateId>,
    notices: mpsc::Receiver<(StateId, String)>,
    forwarders: Vec<JoinHandle<()>>,
}

impl ExecutorLink {
    /// Subscribe to every state's transition topic.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(bus: Arc<dyn MessageBus>) -> Result<Self, BusError> {
        let (tx, notices) = mpsc::channel(NOTICE_CHANNEL_CAPACITY);
        let mut forwarders = Vec::with_capacity(StateId::ALL.len());

        for state in StateId::ALL {
            let mut sub = bus.subscribe(&transition_topic(state))?;
            let tx = tx.clone();
            forwarders.push(tokio::spawn(async move {
                while let Some(payload) = sub.recv().await {
                    if tx.send((state, payload)).await.is_err() {
                        break;
                    }
                }
            }));
        }

        Ok(Self {
            bus,
            active: None,
            notices,
            forwarders,
        })
    }

    /// State most recently activated.
    pub fn active(&self) -> Option<StateId> {
        self.active
    }

    /// Publish one command envelope.
    pub async fn send_command(&self, target: StateId, command: Command) -> Result<(), BusError> {
        let envelope = CommandEnvelope::new(target, command);
        info!(%target, %command, "Sending command");
        self.bus.publish(COMMAND_TOPIC, &envelope.encode()).await
    }

    /// Send START to `next` and track it as the active state.
    pub async fn activate(&mut self, next: StateId) -> Result<(), BusError> {
        if let Some(previous) = self.active.filter(|prev| *prev != next) {
            debug!(%previous, %next, "Switching active state");
        }
        self.send_command(next, Command::Start).await?;
        self.active = Some(next);
        Ok(())
    }

    /// Wait for the next valid transition notice.
    ///
    /// Malformed envelopes and envelopes from a state other than the active
    /// one are logged and skipped. Returns `None` once the bus is gone.
    pub async fn next_transition(&mut self) -> Option<TransitionNotice> {
        while let Some((from, payload)) = self.notices.recv().await {
            let envelope = match TransitionEnvelope::decode(&payload) {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!(%from, payload = %payload, error = %e, "Dropping malformed transition");
                    continue;
                }
            };
            if let Some(active) = self.active.filter(|active| *active != from) {
                warn!(
                    %from,
                    %active,
                    transition = %envelope.transition,
                    "Transition from inactive state"
                );
                continue;
            }
            info!(
                %from,
                signal = %envelope.signal,
                transition = %envelope.transition,
                "Transition received"
            );
            return Some(TransitionNotice {
                from,
                signal: envelope.signal,
                transition: envelope.transition,
            });
        }
        None
    }
}

impl Drop for ExecutorLink {
    fn drop(&mut self) {
        for task in &self.forwarders {
            task.abort();
        }
    }
}

impl std::fmt::Debug for ExecutorLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorLink")
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::LocalBus;

    #[tokio::test]
    async fn test_activate_sends_start() {
        let bus = Arc::new(LocalBus::default());
        let mut commands = bus.subscribe(COMMAND_TOPIC).unwrap();
        let mut link = ExecutorLink::connect(bus.clone()).unwrap();

        link.activate(StateId::DriveTowardTarget).await.unwrap();
        assert_eq!(link.active(), Some(StateId::DriveTowardTarget));
        assert_eq!(
            commands.try_recv().as_deref(),
            Some("DriveTowardTarget:START")
        );
    }

    #[tokio::test]
    async fn test_next_transition_decodes_notice() {
        let bus = Arc::new(LocalBus::default());
        let mut link = ExecutorLink::connect(bus.clone()).unwrap();
        link.activate(StateId::FollowWaypoint).await.unwrap();

        bus.publish("exec_response/FollowWaypoint", "DONE:obstacle_seen")
            .await
            .unwrap();
        let notice = link.next_transition().await.unwrap();
        assert_eq!(
            notice,
            TransitionNotice {
                from: StateId::FollowWaypoint,
                signal: ExecSignal::Done,
                transition: Transition::ObstacleSeen,
            }
        );
    }

    #[tokio::test]
    async fn test_skips_malformed_and_inactive() {
        let bus = Arc::new(LocalBus::default());
        let mut link = ExecutorLink::connect(bus.clone()).unwrap();
        link.activate(StateId::AvoidObstacle).await.unwrap();

        bus.publish("exec_response/AvoidObstacle", "DONE").await.unwrap();
        bus.publish("exec_response/AvoidObstacle", "DONE:nowhere")
            .await
            .unwrap();
        bus.publish("exec_response/FollowWaypoint", "DONE:near_target")
            .await
            .unwrap();
        bus.publish("exec_response/AvoidObstacle", "DONE:obstacle_cleared")
            .await
            .unwrap();

        let notice = link.next_transition().await.unwrap();
        assert_eq!(notice.from, StateId::AvoidObstacle);
        assert_eq!(notice.transition, Transition::ObstacleCleared);
    }
}
