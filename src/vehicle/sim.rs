//! In-process simulated vehicle.
//!
//! Keeps mode, arm state and a mission mirror behind a lock, records every
//! command call, and can be told to fail chosen operations. Used by the
//! binaries when no flight controller is attached, and by the tests.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use magellan_core::mission::{MissionStorage, Waypoint};
use magellan_core::VehicleMode;
use tracing::{debug, info};

use super::{VehicleInterface, WaypointPull, WaypointPush};
use crate::error::{VehicleError, VehicleOp};

/// Simulated vehicle configuration.
#[derive(Debug, Clone)]
pub struct SimVehicleConfig {
    /// How long one RC override is held before release
    pub rc_override: Duration,
    /// Mission loaded on the flight controller at startup
    pub mission: Vec<Waypoint>,
}

impl Default for SimVehicleConfig {
    fn default() -> Self {
        Self {
            rc_override: Duration::from_secs(1),
            mission: Vec::new(),
        }
    }
}

/// Command call observed by the simulated vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleCall {
    SetMode(VehicleMode),
    SetArm(bool),
    PullWaypoints,
    PushWaypoints(u16),
    ClearWaypoints,
    SetCurrentWaypoint(u16),
    SetThrottleServo { throttle: u16, servo: u16 },
}

#[derive(Debug)]
struct SimState {
    mode: VehicleMode,
    armed: bool,
    mission: MissionStorage,
    rc_override: Option<(u16, u16)>,
    overrides_sent: u32,
    calls: Vec<VehicleCall>,
    failing: HashSet<VehicleOp>,
}

/// Simulated flight controller.
pub struct SimVehicle {
    config: SimVehicleConfig,
    state: Mutex<SimState>,
}

impl SimVehicle {
    /// Create a simulated vehicle. Waypoints past the mission capacity are
    /// dropped.
    pub fn new(config: SimVehicleConfig) -> Self {
        let mut mission = MissionStorage::new();
        if mission.replace(&config.mission).is_err() {
            debug!(
                loaded = mission.count(),
                "Initial mission truncated to storage capacity"
            );
        }
        Self {
            config,
            state: Mutex::new(SimState {
                mode: VehicleMode::default(),
                armed: false,
                mission,
                rc_override: None,
                overrides_sent: 0,
                calls: Vec::new(),
                failing: HashSet::new(),
            }),
        }
    }

    /// Create with default configuration (empty mission).
    pub fn with_defaults() -> Self {
        Self::new(SimVehicleConfig::default())
    }

    /// Create with `mission` preloaded.
    pub fn with_mission(mission: Vec<Waypoint>) -> Self {
        Self::new(SimVehicleConfig {
            mission,
            ..SimVehicleConfig::default()
        })
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `call` and fail it if `op` was marked failing.
    fn begin(&self, op: VehicleOp, call: VehicleCall) -> Result<MutexGuard<'_, SimState>, VehicleError> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.failing.contains(&op) {
            debug!(%op, "Injected vehicle failure");
            return Err(VehicleError::CallFailed {
                op,
                reason: "service unavailable".to_string(),
            });
        }
        Ok(state)
    }

    fn check(&self, op: VehicleOp) -> Result<MutexGuard<'_, SimState>, VehicleError> {
        let state = self.lock();
        if state.failing.contains(&op) {
            return Err(VehicleError::CallFailed {
                op,
                reason: "service unavailable".to_string(),
            });
        }
        Ok(state)
    }

    // ========================================================================
    // Test and demo hooks
    // ========================================================================

    /// Make every subsequent `op` call fail.
    pub fn fail(&self, op: VehicleOp) {
        self.lock().failing.insert(op);
    }

    /// Let `op` succeed again.
    pub fn restore(&self, op: VehicleOp) {
        self.lock().failing.remove(&op);
    }

    /// Command calls seen so far, in order.
    pub fn calls(&self) -> Vec<VehicleCall> {
        self.lock().calls.clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Active RC override, if one is being held.
    pub fn rc_override(&self) -> Option<(u16, u16)> {
        self.lock().rc_override
    }

    /// Number of RC overrides completed.
    pub fn overrides_sent(&self) -> u32 {
        self.lock().overrides_sent
    }

    /// Number of waypoints on the simulated flight controller.
    pub fn mission_count(&self) -> u16 {
        self.lock().mission.count()
    }
}

impl std::fmt::Debug for SimVehicle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SimVehicle")
            .field("mode", &state.mode)
            .field("armed", &state.armed)
            .field("waypoints", &state.mission.count())
            .finish()
    }
}

#[async_trait]
impl VehicleInterface for SimVehicle {
    async fn set_mode(&self, mode: VehicleMode) -> Result<(), VehicleError> {
        let mut state = self.begin(VehicleOp::SetMode, VehicleCall::SetMode(mode))?;
        if state.mode != mode {
            info!(from = %state.mode, to = %mode, "Mode changed");
        }
        state.mode = mode;
        Ok(())
    }

    async fn set_arm(&self, armed: bool) -> Result<(), VehicleError> {
        let mut state = self.begin(VehicleOp::SetArm, VehicleCall::SetArm(armed))?;
        if state.armed != armed {
            info!(armed, "Arm state changed");
        }
        state.armed = armed;
        if !armed {
            state.rc_override = None;
        }
        Ok(())
    }

    async fn pull_waypoints(&self) -> Result<WaypointPull, VehicleError> {
        let state = self.begin(VehicleOp::PullWaypoints, VehicleCall::PullWaypoints)?;
        Ok(WaypointPull {
            received: state.mission.count(),
        })
    }

    async fn push_waypoints(&self, waypoints: &[Waypoint]) -> Result<WaypointPush, VehicleError> {
        let count = waypoints.len().min(u16::MAX as usize) as u16;
        let mut state = self.begin(VehicleOp::PushWaypoints, VehicleCall::PushWaypoints(count))?;
        let mut mission = MissionStorage::new();
        let accepted = mission.replace(waypoints)?;
        state.mission = mission;
        Ok(WaypointPush { accepted })
    }

    async fn clear_waypoints(&self) -> Result<(), VehicleError> {
        let mut state = self.begin(VehicleOp::ClearWaypoints, VehicleCall::ClearWaypoints)?;
        state.mission.clear();
        Ok(())
    }

    async fn set_current_waypoint(&self, seq: u16) -> Result<(), VehicleError> {
        let mut state = self.begin(
            VehicleOp::SetCurrentWaypoint,
            VehicleCall::SetCurrentWaypoint(seq),
        )?;
        state.mission.set_current_index(seq)?;
        debug!(current = state.mission.current_index(), "Current waypoint set");
        Ok(())
    }

    async fn set_throttle_servo(&self, throttle: u16, servo: u16) -> Result<(), VehicleError> {
        {
            let mut state = self.begin(
                VehicleOp::SetThrottleServo,
                VehicleCall::SetThrottleServo { throttle, servo },
            )?;
            if !state.armed || !state.mode.accepts_rc_override() {
                return Err(VehicleError::Rejected {
                    op: VehicleOp::SetThrottleServo,
                });
            }
            state.rc_override = Some((throttle, servo));
        }

        tokio::time::sleep(self.config.rc_override).await;

        let mut state = self.lock();
        state.rc_override = None;
        state.overrides_sent += 1;
        Ok(())
    }

    async fn mode(&self) -> Result<VehicleMode, VehicleError> {
        Ok(self.check(VehicleOp::GetMode)?.mode)
    }

    async fn armed(&self) -> Result<bool, VehicleError> {
        Ok(self.check(VehicleOp::GetArm)?.armed)
    }
}
