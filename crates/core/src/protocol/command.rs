//! Executor Commands and Signals
//!
//! `Command` flows from the executor to a state; `ExecSignal` flows from a
//! state back to the executor.

use core::fmt;
use core::str::FromStr;

use super::error::{DecodeError, EnvelopeField};

/// Command sent to a state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    /// Enter the state and run its control loop
    Start,
    /// Safe the vehicle and return the state to idle
    Reset,
    /// Safe the vehicle and hold the state paused
    Pause,
}

impl Command {
    /// Stable wire name
    pub const fn name(self) -> &'static str {
        match self {
            Command::Start => "START",
            Command::Reset => "RESET",
            Command::Pause => "PAUSE",
        }
    }

    /// Look up a command by its wire name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "START" => Some(Command::Start),
            "RESET" => Some(Command::Reset),
            "PAUSE" => Some(Command::Pause),
            _ => None,
        }
    }

    /// Compact non-zero code for atomic storage
    pub const fn code(self) -> u8 {
        match self {
            Command::Start => 1,
            Command::Reset => 2,
            Command::Pause => 3,
        }
    }

    /// Inverse of [`Command::code`]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Command::Start),
            2 => Some(Command::Reset),
            3 => Some(Command::Pause),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or(DecodeError::UnknownToken {
            field: EnvelopeField::Command,
        })
    }
}

/// Completion signal sent by a state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExecSignal {
    /// State finished and selected a transition
    Done,
    /// State failed
    Error,
}

impl ExecSignal {
    /// Stable wire name
    pub const fn name(self) -> &'static str {
        match self {
            ExecSignal::Done => "DONE",
            ExecSignal::Error => "ERROR",
        }
    }

    /// Look up a signal by its wire name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "DONE" => Some(ExecSignal::Done),
            "ERROR" => Some(ExecSignal::Error),
            _ => None,
        }
    }
}

impl fmt::Display for ExecSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExecSignal {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or(DecodeError::UnknownToken {
            field: EnvelopeField::Signal,
        })
    }
}
