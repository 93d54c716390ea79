//! State Profiles
//!
//! Static description of how each mission state drives the vehicle and which
//! transitions it may signal.
//!
//! # Profile Fields
//!
//! - Operating mode requested after the safe-hold/arm/waypoint-refresh entry
//! - Tick budget: number of control-loop ticks before the loop exits on its own
//! - Transition priority: order in which predicates are evaluated on exit
//! - Whether an empty waypoint set aborts entry

use crate::mode::VehicleMode;
use crate::protocol::{StateId, Transition};

/// Default control-loop tick budget for waypoint following
pub const FOLLOW_WAYPOINT_TICKS: u32 = 5;

/// Default control-loop tick budget for target approach
pub const DRIVE_TOWARD_TARGET_TICKS: u32 = 10;

/// Default control-loop tick budget for obstacle avoidance
pub const AVOID_OBSTACLE_TICKS: u32 = 4;

/// Per-state execution profile
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateProfile {
    /// State this profile belongs to
    pub id: StateId,
    /// Mode requested once entry succeeded
    pub operating_mode: VehicleMode,
    /// Ticks before the control loop exits on its own (at least 1)
    pub tick_budget: u32,
    /// Transitions in evaluation priority order
    pub transitions: &'static [Transition],
    /// Abort entry when the vehicle reports no waypoints
    pub requires_waypoints: bool,
}

impl StateProfile {
    /// Default profile for a state
    pub const fn for_state(id: StateId) -> Self {
        match id {
            StateId::FollowWaypoint => Self {
                id,
                operating_mode: VehicleMode::Auto,
                tick_budget: FOLLOW_WAYPOINT_TICKS,
                transitions: &[Transition::ObstacleSeen, Transition::NearTarget],
                requires_waypoints: true,
            },
            StateId::DriveTowardTarget => Self {
                id,
                operating_mode: VehicleMode::Manual,
                tick_budget: DRIVE_TOWARD_TARGET_TICKS,
                transitions: &[
                    Transition::ObstacleSeen,
                    Transition::TargetLost,
                    Transition::TargetTouched,
                ],
                requires_waypoints: false,
            },
            StateId::AvoidObstacle => Self {
                id,
                operating_mode: VehicleMode::Manual,
                tick_budget: AVOID_OBSTACLE_TICKS,
                transitions: &[Transition::ObstacleCleared],
                requires_waypoints: false,
            },
        }
    }

    /// Replace the tick budget (clamped to at least one tick)
    pub const fn with_tick_budget(mut self, ticks: u32) -> Self {
        self.tick_budget = if ticks == 0 { 1 } else { ticks };
        self
    }

    /// Check if this state may signal `transition`
    pub fn can_signal(&self, transition: Transition) -> bool {
        self.transitions.contains(&transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follow_waypoint_profile() {
        let profile = StateProfile::for_state(StateId::FollowWaypoint);
        assert_eq!(profile.operating_mode, VehicleMode::Auto);
        assert_eq!(profile.tick_budget, 5);
        assert!(profile.requires_waypoints);
        // Obstacles take precedence over target proximity
        assert_eq!(
            profile.transitions,
            &[Transition::ObstacleSeen, Transition::NearTarget]
        );
    }

    #[test]
    fn test_every_state_has_a_transition() {
        for id in StateId::ALL {
            let profile = StateProfile::for_state(id);
            assert_eq!(profile.id, id);
            assert!(!profile.transitions.is_empty());
            assert!(profile.tick_budget >= 1);
        }
    }

    #[test]
    fn test_rc_driven_states_use_manual() {
        for id in [StateId::DriveTowardTarget, StateId::AvoidObstacle] {
            assert!(StateProfile::for_state(id)
                .operating_mode
                .accepts_rc_override());
        }
    }

    #[test]
    fn test_with_tick_budget_clamps_zero() {
        let profile = StateProfile::for_state(StateId::AvoidObstacle).with_tick_budget(0);
        assert_eq!(profile.tick_budget, 1);
        let profile = profile.with_tick_budget(12);
        assert_eq!(profile.tick_budget, 12);
    }

    #[test]
    fn test_can_signal() {
        let profile = StateProfile::for_state(StateId::AvoidObstacle);
        assert!(profile.can_signal(Transition::ObstacleCleared));
        assert!(!profile.can_signal(Transition::NearTarget));
    }
}
