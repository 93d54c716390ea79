//! magellan - State orchestration runtime for the magellan rover
//!
//! Runs each mission state as its own StateNode process, commanded by an
//! executor over a string-envelope message bus.
//!
//! # Modules
//!
//! - [`bus`]: Publish/subscribe transport (in-process and UDP)
//! - [`comm`]: ExecComm, the per-node command filter and transition sender
//! - [`node`]: StateNode lifecycle, handlers and control loop
//! - [`vehicle`]: Vehicle interface seam and simulated vehicle
//! - [`perception`]: Transition predicate sources
//! - [`executor`]: Executor-side command/transition link
//! - [`monitor`]: Vehicle status monitor
//! - [`config`], [`logging`], [`error`], [`shutdown`]: Ambient setup
//!
//! Protocol types live in [`magellan_core`] and are re-exported here.

pub mod bus;
pub mod comm;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod monitor;
pub mod node;
pub mod perception;
pub mod shutdown;
pub mod vehicle;

pub use magellan_core::{
    Command, CommandEnvelope, DecodeError, ExecSignal, NodePhase, StateId, StateProfile,
    Transition, TransitionEnvelope, VehicleMode,
};
