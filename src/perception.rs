//! Transition predicates
//!
//! Perception is outside this crate: detection results arrive here only as
//! booleans, one per transition, evaluated when a control loop exits.

use std::collections::HashSet;
use std::sync::Mutex;

use magellan_core::Transition;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of transition predicate values.
pub trait Perception: Send + Sync {
    /// Whether the condition behind `transition` currently holds.
    fn holds(&self, transition: Transition) -> bool;
}

/// Perception whose predicates are set explicitly.
#[derive(Debug, Default)]
pub struct ScriptedPerception {
    holding: Mutex<HashSet<Transition>>,
}

impl ScriptedPerception {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with `transitions` holding.
    pub fn holding(transitions: &[Transition]) -> Self {
        let perception = Self::new();
        for t in transitions {
            perception.set(*t, true);
        }
        perception
    }

    pub fn set(&self, transition: Transition, holds: bool) {
        let mut holding = self
            .holding
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if holds {
            holding.insert(transition);
        } else {
            holding.remove(&transition);
        }
    }
}

impl Perception for ScriptedPerception {
    fn holds(&self, transition: Transition) -> bool {
        self.holding
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(&transition)
    }
}

/// Perception that reports each predicate true with a fixed probability.
///
/// Stands in for detectors in demos. Deterministic when seeded.
pub struct RandomPerception {
    rng: Mutex<StdRng>,
    probability: f64,
}

impl RandomPerception {
    /// `probability` is clamped to `[0, 1]`. `seed = None` seeds from entropy.
    pub fn new(seed: Option<u64>, probability: f64) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
            probability: probability.clamp(0.0, 1.0),
        }
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl std::fmt::Debug for RandomPerception {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomPerception")
            .field("probability", &self.probability)
            .finish()
    }
}

impl Perception for RandomPerception {
    fn holds(&self, _transition: Transition) -> bool {
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        rng.gen_bool(self.probability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_perception() {
        let perception = ScriptedPerception::holding(&[Transition::NearTarget]);
        assert!(perception.holds(Transition::NearTarget));
        assert!(!perception.holds(Transition::ObstacleSeen));

        perception.set(Transition::NearTarget, false);
        perception.set(Transition::ObstacleSeen, true);
        assert!(!perception.holds(Transition::NearTarget));
        assert!(perception.holds(Transition::ObstacleSeen));
    }

    #[test]
    fn test_random_perception_extremes() {
        let never = RandomPerception::new(Some(1), 0.0);
        let always = RandomPerception::new(Some(1), 1.0);
        for t in Transition::ALL {
            assert!(!never.holds(t));
            assert!(always.holds(t));
        }
    }

    #[test]
    fn test_random_perception_is_deterministic_when_seeded() {
        let a = RandomPerception::new(Some(42), 0.5);
        let b = RandomPerception::new(Some(42), 0.5);
        let seq_a: Vec<bool> = (0..32).map(|_| a.holds(Transition::TargetLost)).collect();
        let seq_b: Vec<bool> = (0..32).map(|_| b.holds(Transition::TargetLost)).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn test_probability_clamped() {
        assert_eq!(RandomPerception::new(Some(0), 3.0).probability(), 1.0);
        assert_eq!(RandomPerception::new(Some(0), -1.0).probability(), 0.0);
    }
}
