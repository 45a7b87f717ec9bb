//! Core conversation state machine
//!
//! Pure state transitions in the Elm style: an event goes in, a new state
//! and a list of effects come out. All I/O lives in the session runtime;
//! collaborator results re-enter the machine as events.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, InlineButton, Keyboard};
pub use event::{Command, Event, SelectionAction};
pub use state::{ConvState, Session, SessionContext, DEFAULT_CATALOG};
pub use transition::{transition, TransitionError, TransitionResult};
