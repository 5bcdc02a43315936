//! Turn controller
//!
//! Implements the Elm Architecture pattern with pure state transitions.
//! The runtime feeds events in one at a time and executes the returned
//! effects; nothing here performs I/O.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{DialogueContext, DialogueState, PersistPolicy, SystemState};
pub use transition::{transition, TransitionError, TransitionResult};
