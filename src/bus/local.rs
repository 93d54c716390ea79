//! In-process bus backed by a tokio broadcast channel.

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{fan_out, BusMessage, MessageBus, Subscription, DEFAULT_CHANNEL_CAPACITY};
use crate::error::BusError;

/// Bus shared by components running in the same process.
///
/// Used by the integration tests and by single-process demos.
#[derive(Clone)]
pub struct LocalBus {
    sender: broadcast::Sender<BusMessage>,
}

impl LocalBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Number of live subscriptions across all topics.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl std::fmt::Debug for LocalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBus")
            .field("receivers", &self.sender.receiver_count())
            .finish()
    }
}

#[async_trait]
impl MessageBus for LocalBus {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError> {
        fan_out(&self.sender, BusMessage::new(topic, payload));
        Ok(())
    }

    fn subscribe(&self, topic: &str) -> Result<Subscription, BusError> {
        Ok(Subscription::new(topic, self.sender.subscribe()))
    }
}
