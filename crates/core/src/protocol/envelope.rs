//! Envelope Codec
//!
//! String encoding of the two envelopes that cross the process boundary.
//!
//! # Wire Format
//!
//! - CommandEnvelope: `<StateId>:<COMMAND>` (e.g. `FollowWaypoint:START`)
//! - TransitionEnvelope: `<SIGNAL>:<transition>` (e.g. `DONE:near_target`)
//!
//! The sending state of a TransitionEnvelope is not part of the payload; it
//! is implied by the topic the envelope is published on
//! (see [`transition_topic`](super::transition_topic)).
//!
//! Decoding is strict: the payload must split on [`DELIMITER`] into exactly
//! two tokens and both tokens must name known enumeration members.

use core::fmt;
use core::str::FromStr;

use heapless::String;

use super::command::{Command, ExecSignal};
use super::error::DecodeError;
use super::state::StateId;
use super::transition::Transition;

/// Token delimiter shared by both envelopes
pub const DELIMITER: char = ':';

/// Encoded envelope capacity (fits the longest state/transition names)
pub const ENVELOPE_CAPACITY: usize = 48;

/// Encoded envelope payload
pub type EnvelopeString = String<ENVELOPE_CAPACITY>;

/// Split a payload into exactly two tokens
fn split_pair(payload: &str) -> Result<(&str, &str), DecodeError> {
    let found = payload.split(DELIMITER).count();
    if found != 2 {
        return Err(DecodeError::TokenCount { found });
    }
    payload
        .split_once(DELIMITER)
        .ok_or(DecodeError::TokenCount { found })
}

fn join_pair(first: &str, second: &str) -> EnvelopeString {
    // Capacity covers the longest enumeration names, so pushes cannot fail.
    let mut out = EnvelopeString::new();
    let _ = out.push_str(first);
    let _ = out.push(DELIMITER);
    let _ = out.push_str(second);
    out
}

/// Command addressed to one state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandEnvelope {
    /// State the command is addressed to
    pub target: StateId,
    /// Command to apply
    pub command: Command,
}

impl CommandEnvelope {
    /// Create a new command envelope
    pub const fn new(target: StateId, command: Command) -> Self {
        Self { target, command }
    }

    /// Check whether this envelope is addressed to `state`
    pub fn is_for(&self, state: StateId) -> bool {
        self.target == state
    }

    /// Encode to the wire payload
    pub fn encode(&self) -> EnvelopeString {
        join_pair(self.target.name(), self.command.name())
    }

    /// Decode a wire payload
    pub fn decode(payload: &str) -> Result<Self, DecodeError> {
        let (state, command) = split_pair(payload)?;
        Ok(Self {
            target: state.parse()?,
            command: command.parse()?,
        })
    }
}

impl fmt::Display for CommandEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.target, DELIMITER, self.command)
    }
}

impl FromStr for CommandEnvelope {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

/// Completion notice from a state to the executor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionEnvelope {
    /// Completion signal
    pub signal: ExecSignal,
    /// Mission graph edge selected by the state
    pub transition: Transition,
}

impl TransitionEnvelope {
    /// Create a new transition envelope
    pub const fn new(signal: ExecSignal, transition: Transition) -> Self {
        Self { signal, transition }
    }

    /// Encode to the wire payload
    pub fn encode(&self) -> EnvelopeString {
        join_pair(self.signal.name(), self.transition.name())
    }

    /// Decode a wire payload
    pub fn decode(payload: &str) -> Result<Self, DecodeError> {
        let (signal, transition) = split_pair(payload)?;
        Ok(Self {
            signal: signal.parse()?,
            transition: transition.parse()?,
        })
    }
}

impl fmt::Display for TransitionEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.signal, DELIMITER, self.transition)
    }
}

impl FromStr for TransitionEnvelope {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
