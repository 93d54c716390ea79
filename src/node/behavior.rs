//! Per-state control behavior
//!
//! A behavior pairs a [`StateProfile`] with the action run on every control
//! loop tick. Waypoint following leaves driving to the autopilot; the
//! RC-driven states override throttle and steering each tick.

use async_trait::async_trait;
use magellan_core::StateProfile;
use tracing::debug;

use super::StateContext;
use crate::error::VehicleError;

/// Neutral-plus-forward throttle PWM
pub const DEFAULT_THROTTLE_PWM: u16 = 1600;

/// Centered steering servo PWM
pub const DEFAULT_SERVO_PWM: u16 = 1435;

/// What a state does while its control loop runs.
#[async_trait]
pub trait StateBehavior: Send + Sync {
    /// Profile driving entry, tick budget and transition priority.
    fn profile(&self) -> StateProfile;

    /// Action for tick number `tick` (1-based). Errors abort the state.
    async fn on_tick(&self, _ctx: &StateContext, _tick: u32) -> Result<(), VehicleError> {
        Ok(())
    }
}

/// Autopilot follows the mission; nothing to do per tick.
#[derive(Debug, Clone, Copy)]
pub struct WaypointBehavior {
    profile: StateProfile,
}

impl WaypointBehavior {
    pub fn new(profile: StateProfile) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl StateBehavior for WaypointBehavior {
    fn profile(&self) -> StateProfile {
        self.profile
    }
}

/// RC throttle/servo PWM pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RcPwm {
    pub throttle: u16,
    pub servo: u16,
}

impl Default for RcPwm {
    fn default() -> Self {
        Self {
            throttle: DEFAULT_THROTTLE_PWM,
            servo: DEFAULT_SERVO_PWM,
        }
    }
}

/// Drives with an RC override on every tick.
#[derive(Debug, Clone, Copy)]
pub struct RcDriveBehavior {
    profile: StateProfile,
    pwm: RcPwm,
}

impl RcDriveBehavior {
    pub fn new(profile: StateProfile, pwm: RcPwm) -> Self {
        Self { profile, pwm }
    }
}

#[async_trait]
impl StateBehavior for RcDriveBehavior {
    fn profile(&self) -> StateProfile {
        self.profile
    }

    async fn on_tick(&self, ctx: &StateContext, tick: u32) -> Result<(), VehicleError> {
        debug!(
            state = %self.profile.id,
            tick,
            throttle = self.pwm.throttle,
            servo = self.pwm.servo,
            "RC override"
        );
        ctx.vehicle
            .set_throttle_servo(self.pwm.throttle, self.pwm.servo)
            .await
    }
}

/// Behavior matching a profile's operating mode.
pub fn behavior_for(profile: StateProfile, pwm: RcPwm) -> Box<dyn StateBehavior> {
    if profile.operating_mode.accepts_rc_override() {
        Box::new(RcDriveBehavior::new(profile, pwm))
    } else {
        Box::new(WaypointBehavior::new(profile))
    }
}
