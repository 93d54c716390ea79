//! StateNode Lifecycle Phases
//!
//! ```text
//! Idle ──START──▶ Starting ──entry ok──▶ Running ──loop exit──▶ Idle
//!   ▲                │                      │
//!   │           entry failed            RESET/PAUSE
//!   └────────────────┘                      ▼
//!                                     Idle / Paused
//! ```
//!
//! RESET always lands in `Idle`; PAUSE lands in `Paused`. `Stopped` is only
//! entered on process shutdown.

use core::fmt;

/// StateNode lifecycle phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NodePhase {
    /// Waiting for START
    #[default]
    Idle,
    /// Entry sequence in progress (hold, arm, waypoint refresh, mode switch)
    Starting,
    /// Control loop ticking
    Running,
    /// Vehicle safed by PAUSE
    Paused,
    /// Process shutting down
    Stopped,
}

impl NodePhase {
    /// Check if a START may begin a new run from this phase
    pub const fn accepts_start(self) -> bool {
        matches!(self, NodePhase::Idle | NodePhase::Paused)
    }

    /// Compact code for atomic storage
    pub const fn code(self) -> u8 {
        match self {
            NodePhase::Idle => 0,
            NodePhase::Starting => 1,
            NodePhase::Running => 2,
            NodePhase::Paused => 3,
            NodePhase::Stopped => 4,
        }
    }

    /// Inverse of [`NodePhase::code`]; unknown codes map to `Stopped`
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => NodePhase::Idle,
            1 => NodePhase::Starting,
            2 => NodePhase::Running,
            3 => NodePhase::Paused,
            _ => NodePhase::Stopped,
        }
    }

    /// Phase name for logging
    pub const fn name(self) -> &'static str {
        match self {
            NodePhase::Idle => "Idle",
            NodePhase::Starting => "Starting",
            NodePhase::Running => "Running",
            NodePhase::Paused => "Paused",
            NodePhase::Stopped => "Stopped",
        }
    }
}

impl fmt::Display for NodePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
