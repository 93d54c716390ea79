//! Vehicle Control Modes
//!
//! Flight-controller modes a state can request through the vehicle
//! interface. Names follow ArduPilot Rover's mode names, which is what the
//! flight-control subsystem accepts.
//!
//! # Safe Hold
//!
//! [`VehicleMode::Hold`] is the safing mode: reset, pause and every aborted
//! start put the vehicle in HOLD and disarm it.

use core::fmt;
use core::str::FromStr;

/// Vehicle control mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum VehicleMode {
    /// Direct RC control (required for RC override driving)
    Manual,
    /// Record waypoints while driving manually
    Learning,
    /// Steering-assisted manual control
    Steering,
    /// Motors stopped, position not held
    #[default]
    Hold,
    /// Hold position
    Loiter,
    /// Follow the uploaded mission
    Auto,
    /// Return to launch
    Rtl,
    /// Navigate to externally supplied targets
    Guided,
}

impl VehicleMode {
    /// All modes
    pub const ALL: [VehicleMode; 8] = [
        VehicleMode::Manual,
        VehicleMode::Learning,
        VehicleMode::Steering,
        VehicleMode::Hold,
        VehicleMode::Loiter,
        VehicleMode::Auto,
        VehicleMode::Rtl,
        VehicleMode::Guided,
    ];

    /// Mode name as understood by the flight controller
    pub const fn name(self) -> &'static str {
        match self {
            VehicleMode::Manual => "MANUAL",
            VehicleMode::Learning => "LEARNING",
            VehicleMode::Steering => "STEERING",
            VehicleMode::Hold => "HOLD",
            VehicleMode::Loiter => "LOITER",
            VehicleMode::Auto => "AUTO",
            VehicleMode::Rtl => "RTL",
            VehicleMode::Guided => "GUIDED",
        }
    }

    /// Look up a mode by name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.name() == name)
    }

    /// Check if this mode accepts RC channel override
    pub fn accepts_rc_override(self) -> bool {
        matches!(
            self,
            VehicleMode::Manual | VehicleMode::Learning | VehicleMode::Steering
        )
    }
}

impl fmt::Display for VehicleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown vehicle mode name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownMode;

impl fmt::Display for UnknownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown vehicle mode")
    }
}

impl core::error::Error for UnknownMode {}

impl FromStr for VehicleMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or(UnknownMode)
    }
}
