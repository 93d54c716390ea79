//! magellan_core - Pure no_std state-orchestration types for the magellan rover
//!
//! This crate contains the protocol vocabulary shared by the executor and the
//! StateNode processes. It has no runtime, transport or vehicle dependencies
//! and can be tested on host as-is.
//!
//! # Design Principles
//!
//! - **Zero cfg**: No `#[cfg(feature = ...)]` directives
//! - **Pure no_std**: Bounded `heapless` strings and vectors only
//! - **Closed enumerations**: Stable wire names, unknown names rejected on decode
//!
//! # Modules
//!
//! - [`protocol`]: State/command/signal/transition enumerations, envelope codec, topics
//! - [`profile`]: Per-state operating mode, tick budget and transition priority
//! - [`lifecycle`]: StateNode lifecycle phases
//! - [`mode`]: Vehicle control modes
//! - [`mission`]: Mission waypoint storage

#![no_std]

pub mod lifecycle;
pub mod mission;
pub mod mode;
pub mod profile;
pub mod protocol;

pub use lifecycle::NodePhase;
pub use mode::VehicleMode;
pub use profile::StateProfile;
pub use protocol::{
    Command, CommandEnvelope, DecodeError, ExecSignal, StateId, Transition, TransitionEnvelope,
};
