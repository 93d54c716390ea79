use std::sync::atomic::{AtomicU8, Ordering};

use magellan_core::Command;

/// Code stored while no command has been received
const NO_COMMAND: u8 = 0;

/// Single-slot, last-write-wins holder for the current command.
///
/// Written by the bus delivery path and read by the control loop on every
/// tick. Commands are never queued: a store overwrites whatever was there.
#[derive(Debug)]
pub struct CommandSlot {
    code: AtomicU8,
}

impl CommandSlot {
    pub const fn new() -> Self {
        Self {
            code: AtomicU8::new(NO_COMMAND),
        }
    }

    pub fn store(&self, command: Command) {
        self.code.store(command.code(), Ordering::Release);
    }

    pub fn load(&self) -> Option<Command> {
        Command::from_code(self.code.load(Ordering::Acquire))
    }
}

impl Default for CommandSlot {
    fn default() -> Self {
        Self::new()
    }
}
