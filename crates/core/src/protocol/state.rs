//! Mission State Identity
//!
//! Closed enumeration of the mission states that run as independent
//! StateNode processes. Only the name crosses the process boundary; the
//! registration order in [`StateId::ALL`] carries no meaning on the wire.

use core::fmt;
use core::str::FromStr;

use super::error::{DecodeError, EnvelopeField};

/// Mission state identity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateId {
    /// Drive the uploaded waypoint mission under autopilot control
    FollowWaypoint,
    /// Steer toward a perceived target (cone) using RC override
    DriveTowardTarget,
    /// Back away from and steer around a perceived obstacle
    AvoidObstacle,
}

impl StateId {
    /// All mission states in registration order
    pub const ALL: [StateId; 3] = [
        StateId::FollowWaypoint,
        StateId::DriveTowardTarget,
        StateId::AvoidObstacle,
    ];

    /// Stable wire name
    pub const fn name(self) -> &'static str {
        match self {
            StateId::FollowWaypoint => "FollowWaypoint",
            StateId::DriveTowardTarget => "DriveTowardTarget",
            StateId::AvoidObstacle => "AvoidObstacle",
        }
    }

    /// Look up a state by its wire name
    ///
    /// Returns None for names outside the enumeration (matching is exact and
    /// case-sensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|state| state.name() == name)
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StateId {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or(DecodeError::UnknownToken {
            field: EnvelopeField::State,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique() {
        for (i, a) in StateId::ALL.iter().enumerate() {
            for b in StateId::ALL.iter().skip(i + 1) {
                assert_ne!(a.name(), b.name());
            }
        }
    }

    #[test]
    fn test_from_name_known() {
        assert_eq!(
            StateId::from_name("FollowWaypoint"),
            Some(StateId::FollowWaypoint)
        );
        assert_eq!(
            StateId::from_name("AvoidObstacle"),
            Some(StateId::AvoidObstacle)
        );
    }

    #[test]
    fn test_from_name_is_case_sensitive() {
        assert_eq!(StateId::from_name("followwaypoint"), None);
        assert_eq!(StateId::from_name(" FollowWaypoint"), None);
        assert_eq!(StateId::from_name(""), None);
    }

    #[test]
    fn test_from_str_unknown_reports_state_field() {
        let err = "Loitering".parse::<StateId>().unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownToken {
                field: EnvelopeField::State
            }
        );
    }
}
