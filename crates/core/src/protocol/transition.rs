//! Mission Graph Transitions
//!
//! Named edges of the mission graph. A transition only has meaning together
//! with the state that emitted it; the executor resolves `(state, transition)`
//! to the next state.

use core::fmt;
use core::str::FromStr;

use super::error::{DecodeError, EnvelopeField};

/// Mission graph edge name
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Vehicle is close enough to the target to switch to terminal guidance
    NearTarget,
    /// Perception reported an obstacle in the drive path
    ObstacleSeen,
    /// Obstacle is no longer in the drive path
    ObstacleCleared,
    /// Vehicle made contact with the target
    TargetTouched,
    /// Perception lost track of the target
    TargetLost,
}

impl Transition {
    /// All transitions
    pub const ALL: [Transition; 5] = [
        Transition::NearTarget,
        Transition::ObstacleSeen,
        Transition::ObstacleCleared,
        Transition::TargetTouched,
        Transition::TargetLost,
    ];

    /// Stable wire name
    pub const fn name(self) -> &'static str {
        match self {
            Transition::NearTarget => "near_target",
            Transition::ObstacleSeen => "obstacle_seen",
            Transition::ObstacleCleared => "obstacle_cleared",
            Transition::TargetTouched => "target_touched",
            Transition::TargetLost => "target_lost",
        }
    }

    /// Look up a transition by its wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Transition {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or(DecodeError::UnknownToken {
            field: EnvelopeField::Transition,
        })
    }
}

/// Select the transition to signal at loop exit
///
/// Predicates are evaluated in `priority` order and evaluation stops at the
/// first one that holds. Returns None when no predicate holds.
///
/// # Example
///
/// ```
/// use magellan_core::protocol::{select_transition, Transition};
///
/// let priority = [Transition::ObstacleSeen, Transition::NearTarget];
/// let winner = select_transition(&priority, |t| t == Transition::NearTarget);
/// assert_eq!(winner, Some(Transition::NearTarget));
/// ```
pub fn select_transition<F>(priority: &[Transition], mut holds: F) -> Option<Transition>
where
    F: FnMut(Transition) -> bool,
{
    priority.iter().copied().find(|&t| holds(t))
}
