//! Envelope Decode Errors
//!
//! Errors produced when a payload received from the message bus cannot be
//! decoded into a protocol envelope.

use core::fmt;

/// Envelope field that failed to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeField {
    /// Target state name (CommandEnvelope first token)
    State,
    /// Command name (CommandEnvelope second token)
    Command,
    /// Executor signal name (TransitionEnvelope first token)
    Signal,
    /// Transition name (TransitionEnvelope second token)
    Transition,
}

impl fmt::Display for EnvelopeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvelopeField::State => write!(f, "state"),
            EnvelopeField::Command => write!(f, "command"),
            EnvelopeField::Signal => write!(f, "signal"),
            EnvelopeField::Transition => write!(f, "transition"),
        }
    }
}

/// Errors that can occur while decoding an envelope payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload did not split into exactly two tokens
    TokenCount {
        /// Number of tokens found
        found: usize,
    },
    /// A token did not name a known enumeration member
    UnknownToken {
        /// Field holding the unknown token
        field: EnvelopeField,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::TokenCount { found } => {
                write!(f, "Expected 2 envelope tokens, found {}", found)
            }
            DecodeError::UnknownToken { field } => write!(f, "Unknown {} token", field),
        }
    }
}

impl core::error::Error for DecodeError {}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::format;

    use super::*;

    #[test]
    fn test_token_count_display() {
        let error = DecodeError::TokenCount { found: 3 };
        assert_eq!(format!("{}", error), "Expected 2 envelope tokens, found 3");
    }

    #[test]
    fn test_unknown_token_display() {
        let error = DecodeError::UnknownToken {
            field: EnvelopeField::Transition,
        };
        assert_eq!(format!("{}", error), "Unknown transition token");
    }
}
