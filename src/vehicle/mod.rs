//! Vehicle Interface
//!
//! The narrow set of flight-controller operations the state logic calls:
//! mode and arm control, mission waypoint transfer, and RC throttle/servo
//! override.
//!
//! # Note
//!
//! Every operation returns a `Result`. A call the flight controller refuses
//! is an `Err`, never a silently ignored `false`.

mod sim;

pub use sim::{SimVehicle, SimVehicleConfig, VehicleCall};

use async_trait::async_trait;
use magellan_core::mission::Waypoint;
use magellan_core::VehicleMode;
use tracing::warn;

use crate::error::VehicleError;

/// Result of refreshing the mission from the flight controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaypointPull {
    /// Number of waypoints received
    pub received: u16,
}

/// Result of uploading a mission to the flight controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaypointPush {
    /// Number of waypoints the flight controller accepted
    pub accepted: u16,
}

/// Flight-controller operations consumed by StateNodes and the monitor.
#[async_trait]
pub trait VehicleInterface: Send + Sync {
    /// Request a control mode.
    async fn set_mode(&self, mode: VehicleMode) -> Result<(), VehicleError>;

    /// Arm (`true`) or disarm (`false`).
    async fn set_arm(&self, armed: bool) -> Result<(), VehicleError>;

    /// Refresh the active waypoint set from the flight controller.
    async fn pull_waypoints(&self) -> Result<WaypointPull, VehicleError>;

    /// Replace the flight controller's mission.
    async fn push_waypoints(&self, waypoints: &[Waypoint]) -> Result<WaypointPush, VehicleError>;

    /// Remove every mission waypoint.
    async fn clear_waypoints(&self) -> Result<(), VehicleError>;

    /// Select the waypoint the autopilot drives to next.
    async fn set_current_waypoint(&self, seq: u16) -> Result<(), VehicleError>;

    /// Override throttle and steering servo PWM for a bounded duration, then
    /// release the override.
    async fn set_throttle_servo(&self, throttle: u16, servo: u16) -> Result<(), VehicleError>;

    /// Current control mode.
    async fn mode(&self) -> Result<VehicleMode, VehicleError>;

    /// Current arm state.
    async fn armed(&self) -> Result<bool, VehicleError>;
}

/// Put the vehicle in HOLD and disarm it.
///
/// Both calls are attempted even if the first fails; the first error is
/// returned.
pub async fn safe_hold(vehicle: &dyn VehicleInterface) -> Result<(), VehicleError> {
    let mode = vehicle.set_mode(VehicleMode::Hold).await;
    let arm = vehicle.set_arm(false).await;
    mode.and(arm)
}

/// Best-effort [`safe_hold`] used on abort paths, where the original error
/// is what gets reported.
pub(crate) async fn try_safe_hold(vehicle: &dyn VehicleInterface) {
    if let Err(e) = safe_hold(vehicle).await {
        warn!(error = %e, "Failed to put vehicle in safe hold");
    }
}
