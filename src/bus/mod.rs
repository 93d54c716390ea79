//! Publish/subscribe message bus
//!
//! String payloads addressed by topic, shared between the executor and the
//! StateNode processes.
//!
//! # Architecture
//!
//! ```text
//! publisher ──> MessageBus::publish(topic, payload)
//!                    │
//!                    ├── LocalBus: tokio broadcast, in-process only
//!                    └── UdpBus: broadcast + "<topic> <payload>" datagrams to peers
//!                    │
//! subscriber <── Subscription::recv() (filtered by topic)
//! ```
//!
//! Delivery is ordered within a topic for a single publisher. Nothing is
//! ordered across topics.

mod local;
mod udp;

pub use local::LocalBus;
pub use udp::{UdpBus, UdpBusConfig};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::BusError;

/// Default broadcast channel capacity
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// A message travelling on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: String,
}

impl BusMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Transport seam shared by every component.
///
/// Publishing is fire-and-forget: no acknowledgement is awaited and a topic
/// with no subscribers is not an error.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publish `payload` on `topic`.
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError>;

    /// Subscribe to `topic`. Only messages published after this call are seen.
    fn subscribe(&self, topic: &str) -> Result<Subscription, BusError>;
}

/// Receiving end of a topic subscription.
pub struct Subscription {
    topic: String,
    receiver: broadcast::Receiver<BusMessage>,
    lost: u64,
}

impl Subscription {
    pub(crate) fn new(topic: &str, receiver: broadcast::Receiver<BusMessage>) -> Self {
        Self {
            topic: topic.to_string(),
            receiver,
            lost: 0,
        }
    }

    /// Messages skipped because this subscriber fell behind.
    ///
    /// Counts every skipped message on the channel, whatever its topic.
    pub fn lost(&self) -> u64 {
        self.lost
    }

    fn lagged(&mut self, skipped: u64) {
        self.lost += skipped;
        warn!(topic = %self.topic, skipped, "Subscription lagged, messages dropped");
    }

    /// Topic this subscription is bound to.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for the next payload on this topic.
    ///
    /// Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<String> {
        loop {
            match self.receiver.recv().await {
                Ok(msg) if msg.topic == self.topic => return Some(msg.payload),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(n)) => self.lagged(n),
            }
        }
    }

    /// Take the next already-delivered payload, if any.
    pub fn try_recv(&mut self) -> Option<String> {
        loop {
            match self.receiver.try_recv() {
                Ok(msg) if msg.topic == self.topic => return Some(msg.payload),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(n)) => self.lagged(n),
                Err(broadcast::error::TryRecvError::Empty)
                | Err(broadcast::error::TryRecvError::Closed) => return None,
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("lost", &self.lost)
            .finish()
    }
}

/// Send into a local broadcast channel, treating "no receivers" as delivered.
pub(crate) fn fan_out(sender: &broadcast::Sender<BusMessage>, message: BusMessage) {
    if let Err(broadcast::error::SendError(msg)) = sender.send(message) {
        debug!(topic = %msg.topic, "No subscribers for topic");
    }
}
