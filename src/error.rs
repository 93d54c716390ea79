use std::net::SocketAddr;
use std::path::PathBuf;

use magellan_core::mission::MissionError;
use magellan_core::StateId;

/// Errors raised by a message bus transport.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Failed to bind bus socket {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Bus transport closed")]
    Closed,

    #[error("Invalid bus frame: {0}")]
    InvalidFrame(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Vehicle interface operation, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleOp {
    SetMode,
    SetArm,
    PullWaypoints,
    PushWaypoints,
    ClearWaypoints,
    SetCurrentWaypoint,
    SetThrottleServo,
    GetMode,
    GetArm,
}

impl VehicleOp {
    pub const fn name(self) -> &'static str {
        match self {
            VehicleOp::SetMode => "set_mode",
            VehicleOp::SetArm => "set_arm",
            VehicleOp::PullWaypoints => "pull_waypoints",
            VehicleOp::PushWaypoints => "push_waypoints",
            VehicleOp::ClearWaypoints => "clear_waypoints",
            VehicleOp::SetCurrentWaypoint => "set_current_waypoint",
            VehicleOp::SetThrottleServo => "set_throttle_servo",
            VehicleOp::GetMode => "get_mode",
            VehicleOp::GetArm => "get_arm",
        }
    }
}

impl std::fmt::Display for VehicleOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors returned by vehicle interface calls.
///
/// A call that the flight controller answers with "not accepted" is a
/// `Rejected`; a call that produced no answer at all is a `CallFailed`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VehicleError {
    #[error("Vehicle rejected {op}")]
    Rejected { op: VehicleOp },

    #[error("Vehicle call {op} failed: {reason}")]
    CallFailed { op: VehicleOp, reason: String },

    #[error("Mission error: {0}")]
    Mission(#[from] MissionError),
}

impl VehicleError {
    /// Operation that failed, when known.
    pub fn op(&self) -> Option<VehicleOp> {
        match self {
            VehicleError::Rejected { op } | VehicleError::CallFailed { op, .. } => Some(*op),
            VehicleError::Mission(_) => None,
        }
    }
}

/// Errors surfaced by StateNode handlers.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Vehicle error: {0}")]
    Vehicle(#[from] VehicleError),

    #[error("{state} requires waypoints but the vehicle reported none")]
    NoWaypoints { state: StateId },
}

/// Errors raised while polling and publishing vehicle status.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Vehicle error: {0}")]
    Vehicle(#[from] VehicleError),
}

/// Errors loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}
