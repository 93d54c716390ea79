//! State Orchestration Protocol
//!
//! Message vocabulary shared by the executor and every StateNode process.
//!
//! # Contents
//!
//! - Closed enumerations with stable wire names: [`StateId`], [`Command`],
//!   [`ExecSignal`], [`Transition`]
//! - Envelope codec: [`CommandEnvelope`], [`TransitionEnvelope`]
//! - Logical topic names
//! - Priority-ordered transition selection
//!
//! # Note
//!
//! Enumeration ordinals are never serialized. Unknown names are rejected at
//! decode time instead of being matched loosely.

mod command;
mod envelope;
mod error;
mod state;
mod topic;
mod transition;

pub use command::{Command, ExecSignal};
pub use envelope::{
    CommandEnvelope, EnvelopeString, TransitionEnvelope, DELIMITER, ENVELOPE_CAPACITY,
};
pub use error::{DecodeError, EnvelopeField};
pub use state::StateId;
pub use topic::{
    transition_topic, TopicString, COMMAND_TOPIC, STATUS_TOPIC, TOPIC_CAPACITY,
    TRANSITION_TOPIC_PREFIX,
};
pub use transition::{select_transition, Transition};
