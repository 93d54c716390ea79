use std::sync::atomic::{AtomicU8, Ordering};

use magellan_core::NodePhase;

/// Lifecycle phase shared between the delivery path and the dispatcher.
#[derive(Debug)]
pub struct PhaseCell {
    code: AtomicU8,
}

impl PhaseCell {
    pub fn new(phase: NodePhase) -> Self {
        Self {
            code: AtomicU8::new(phase.code()),
        }
    }

    pub fn get(&self) -> NodePhase {
        NodePhase::from_code(self.code.load(Ordering::Acquire))
    }

    pub fn set(&self, phase: NodePhase) {
        self.code.store(phase.code(), Ordering::Release);
    }

    /// Move `Idle | Paused` to `Starting`.
    ///
    /// Returns `false`, leaving the phase untouched, when a start is already
    /// in progress or the node has stopped.
    pub fn try_claim_start(&self) -> bool {
        let mut current = self.code.load(Ordering::Acquire);
        loop {
            if !NodePhase::from_code(current).accepts_start() {
                return false;
            }
            match self.code.compare_exchange_weak(
                current,
                NodePhase::Starting.code(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for PhaseCell {
    fn default() -> Self {
        Self::new(NodePhase::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_from_idle_and_paused() {
        let cell = PhaseCell::default();
        assert!(cell.try_claim_start());
        assert_eq!(cell.get(), NodePhase::Starting);

        cell.set(NodePhase::Paused);
        assert!(cell.try_claim_start());
        assert_eq!(cell.get(), NodePhase::Starting);
    }

    #[test]
    fn test_claim_refused_while_active_or_stopped() {
        for phase in [NodePhase::Starting, NodePhase::Running, NodePhase::Stopped] {
            let cell = PhaseCell::new(phase);
            assert!(!cell.try_claim_start());
            assert_eq!(cell.get(), phase);
        }
    }
}
