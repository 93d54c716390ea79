//! Cross-process bus over UDP datagrams.
//!
//! Each datagram carries one message framed as `"<topic> <payload>"`. Topics
//! never contain a space; payloads are taken verbatim after the first one.
//!
//! Published messages are delivered to local subscribers and sent to every
//! configured peer. Datagrams received from peers are delivered locally only,
//! so messages never loop between processes.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{fan_out, BusMessage, MessageBus, Subscription, DEFAULT_CHANNEL_CAPACITY};
use crate::error::BusError;

/// Largest datagram accepted from a peer
const MAX_DATAGRAM: usize = 512;

/// First pause after a failed receive
const RECV_RETRY_MIN: Duration = Duration::from_millis(10);

/// Longest pause between failed receives
const RECV_RETRY_MAX: Duration = Duration::from_secs(1);

/// UDP bus configuration.
#[derive(Debug, Clone)]
pub struct UdpBusConfig {
    /// Local address to bind
    pub bind: SocketAddr,
    /// Processes that receive every published message
    pub peers: Vec<SocketAddr>,
    /// Local broadcast capacity
    pub capacity: usize,
}

impl UdpBusConfig {
    pub fn new(bind: SocketAddr, peers: Vec<SocketAddr>) -> Self {
        Self {
            bind,
            peers,
            capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Encode a message as a datagram.
pub fn encode_frame(topic: &str, payload: &str) -> Result<String, BusError> {
    if topic.is_empty() || topic.contains(char::is_whitespace) {
        return Err(BusError::InvalidFrame(format!("bad topic {topic:?}")));
    }
    Ok(format!("{topic} {payload}"))
}

/// Decode a datagram into a message.
pub fn decode_frame(data: &[u8]) -> Result<BusMessage, BusError> {
    let text = std::str::from_utf8(data)
        .map_err(|_| BusError::InvalidFrame("datagram is not UTF-8".to_string()))?;
    match text.split_once(' ') {
        Some((topic, payload)) if !topic.is_empty() => Ok(BusMessage::new(topic, payload)),
        _ => Err(BusError::InvalidFrame(format!("missing topic in {text:?}"))),
    }
}

/// Bus linking processes on one host or LAN.
pub struct UdpBus {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    peers: Vec<SocketAddr>,
    sender: broadcast::Sender<BusMessage>,
    recv_task: JoinHandle<()>,
}

impl UdpBus {
    /// Bind the socket and start the receive task.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn bind(config: UdpBusConfig) -> Result<Self, BusError> {
        let socket = UdpSocket::bind(config.bind)
            .await
            .map_err(|source| BusError::Bind {
                addr: config.bind,
                source,
            })?;
        let local_addr = socket.local_addr()?;
        let socket = Arc::new(socket);
        let (sender, _) = broadcast::channel(config.capacity.max(1));

        let recv_task = tokio::spawn(receive_loop(Arc::clone(&socket), sender.clone()));

        info!(
            addr = %local_addr,
            peers = config.peers.len(),
            "UDP bus bound"
        );

        Ok(Self {
            socket,
            local_addr,
            peers: config.peers,
            sender,
            recv_task,
        })
    }

    /// Address the socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Configured peers.
    pub fn peers(&self) -> &[SocketAddr] {
        &self.peers
    }
}

/// Pause before the next receive after `failures` consecutive errors.
fn recv_retry_delay(failures: u32) -> Duration {
    let doublings = failures.saturating_sub(1).min(16);
    RECV_RETRY_MIN
        .saturating_mul(1 << doublings)
        .min(RECV_RETRY_MAX)
}

async fn receive_loop(socket: Arc<UdpSocket>, sender: broadcast::Sender<BusMessage>) {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    let mut failures: u32 = 0;
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, from)) => {
                failures = 0;
                match decode_frame(&buf[..len]) {
                    Ok(message) => {
                        debug!(%from, topic = %message.topic, "Datagram received");
                        fan_out(&sender, message);
                    }
                    Err(e) => warn!(%from, error = %e, "Dropping datagram"),
                }
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                let delay = recv_retry_delay(failures);
                if failures == 1 {
                    warn!(error = %e, "UDP receive failed");
                } else {
                    debug!(
                        error = %e,
                        failures,
                        retry_ms = delay.as_millis() as u64,
                        "UDP receive failing"
                    );
                }
                tokio::time::sleep(delay).await;
            }
        }
    }
}

impl Drop for UdpBus {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

impl std::fmt::Debug for UdpBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpBus")
            .field("local_addr", &self.local_addr)
            .field("peers", &self.peers)
            .finish()
    }
}

#[async_trait]
impl MessageBus for UdpBus {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError> {
        let frame = encode_frame(topic, payload)?;
        fan_out(&self.sender, BusMessage::new(topic, payload));

        for peer in &self.peers {
            // A peer that is not up yet must not stop delivery to the others
            if let Err(e) = self.socket.send_to(frame.as_bytes(), peer).await {
                warn!(%peer, error = %e, "Failed to send datagram");
            }
        }
        Ok(())
    }

    fn subscribe(&self, topic: &str) -> Result<Subscription, BusError> {
        Ok(Subscription::new(topic, self.sender.subscribe()))
    }
}
