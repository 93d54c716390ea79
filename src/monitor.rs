//! Vehicle status monitor
//!
//! Polls mode and arm state and publishes a plain token on the status topic
//! whenever either changes. The tokens drive operator notifications (sound
//! playback in the field).
//!
//! # Tokens
//!
//! - Mode change: the mode name (`HOLD`, `AUTO`, `MANUAL`, ...)
//! - Arm change: `ARMED` or `DISARMED`
//!
//! The first successful poll always publishes both.

use std::sync::Arc;
use std::time::Duration;

use magellan_core::protocol::STATUS_TOPIC;
use magellan_core::VehicleMode;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::bus::MessageBus;
use crate::error::MonitorError;
use crate::shutdown;
use crate::vehicle::VehicleInterface;

/// Default polling period (0.5 Hz)
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(2);

pub const ARMED_TOKEN: &str = "ARMED";
pub const DISARMED_TOKEN: &str = "DISARMED";

pub struct StatusMonitor {
    vehicle: Arc<dyn VehicleInterface>,
    bus: Arc<dyn MessageBus>,
    last_mode: Option<VehicleMode>,
    last_armed: Option<bool>,
}

impl StatusMonitor {
    pub fn new(vehicle: Arc<dyn VehicleInterface>, bus: Arc<dyn MessageBus>) -> Self {
        Self {
            vehicle,
            bus,
            last_mode: None,
            last_armed: None,
        }
    }

    /// Poll once and publish whatever changed. Returns the number of tokens
    /// published.
    pub async fn poll_once(&mut self) -> Result<usize, MonitorError> {
        let mut published = 0;

        let mode = self.vehicle.mode().await?;
        if self.last_mode != Some(mode) {
            self.bus.publish(STATUS_TOPIC, mode.name()).await?;
            info!(%mode, "Mode");
            self.last_mode = Some(mode);
            published += 1;
        }

        let armed = self.vehicle.armed().await?;
        if self.last_armed != Some(armed) {
            let token = if armed { ARMED_TOKEN } else { DISARMED_TOKEN };
            self.bus.publish(STATUS_TOPIC, token).await?;
            info!(state = token, "Arm state");
            self.last_armed = Some(armed);
            published += 1;
        }

        Ok(published)
    }

    /// Poll every `period` until shutdown. Poll failures are logged and the
    /// next poll retries.
    pub async fn run(&mut self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown::signaled(&mut shutdown) => break,
                _ = interval.tick() => {}
            }
            if let Err(e) = self.poll_once().await {
                warn!(error = %e, "Status poll failed");
            }
        }
        debug!("Status monitor stopped");
    }
}

impl std::fmt::Debug for StatusMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusMonitor")
            .field("last_mode", &self.last_mode)
            .field("last_armed", &self.last_armed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{LocalBus, Subscription};
    use crate::error::VehicleOp;
    use crate::vehicle::SimVehicle;

    fn drain(sub: &mut Subscription) -> Vec<String> {
        std::iter::from_fn(|| sub.try_recv()).collect()
    }

    #[tokio::test]
    async fn test_first_poll_publishes_both() {
        let bus = Arc::new(LocalBus::default());
        let mut status = bus.subscribe(STATUS_TOPIC).unwrap();
        let vehicle = Arc::new(SimVehicle::with_defaults());
        let mut monitor = StatusMonitor::new(vehicle, bus);

        assert_eq!(monitor.poll_once().await.unwrap(), 2);
        assert_eq!(drain(&mut status), vec!["HOLD", "DISARMED"]);
    }

    #[tokio::test]
    async fn test_publishes_on_change_only() {
        let bus = Arc::new(LocalBus::default());
        let mut status = bus.subscribe(STATUS_TOPIC).unwrap();
        let vehicle = Arc::new(SimVehicle::with_defaults());
        let mut monitor = StatusMonitor::new(vehicle.clone(), bus);

        monitor.poll_once().await.unwrap();
        drain(&mut status);

        assert_eq!(monitor.poll_once().await.unwrap(), 0);
        assert!(drain(&mut status).is_empty());

        vehicle.set_arm(true).await.unwrap();
        assert_eq!(monitor.poll_once().await.unwrap(), 1);
        assert_eq!(drain(&mut status), vec!["ARMED"]);

        vehicle.set_mode(VehicleMode::Auto).await.unwrap();
        vehicle.set_arm(false).await.unwrap();
        monitor.poll_once().await.unwrap();
        assert_eq!(drain(&mut status), vec!["AUTO", "DISARMED"]);
    }

    #[tokio::test]
    async fn test_poll_failure_keeps_last_values() {
        let bus = Arc::new(LocalBus::default());
        let mut status = bus.subscribe(STATUS_TOPIC).unwrap();
        let vehicle = Arc::new(SimVehicle::with_defaults());
        let mut monitor = StatusMonitor::new(vehicle.clone(), bus);
        monitor.poll_once().await.unwrap();
        drain(&mut status);

        vehicle.fail(VehicleOp::GetMode);
        assert!(monitor.poll_once().await.is_err());

        vehicle.restore(VehicleOp::GetMode);
        assert_eq!(monitor.poll_once().await.unwrap(), 0);
        assert!(drain(&mut status).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let bus = Arc::new(LocalBus::default());
        let mut status = bus.subscribe(STATUS_TOPIC).unwrap();
        let vehicle = Arc::new(SimVehicle::with_defaults());
        let mut monitor = StatusMonitor::new(vehicle.clone(), bus);
        let (tx, rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            monitor.run(DEFAULT_POLL_PERIOD, rx).await;
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(drain(&mut status), vec!["HOLD", "DISARMED"]);

        vehicle.set_mode(VehicleMode::Manual).await.unwrap();
        tokio::time::sleep(DEFAULT_POLL_PERIOD).await;
        assert_eq!(drain(&mut status), vec!["MANUAL"]);

        tx.send(true).unwrap();
        task.await.unwrap();
    }
}
