//! Post composition state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.
//! The executor in `runtime` performs the effects and feeds their
//! outcomes back in as events.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use state::{ComposeState, PostDraft};
pub use transition::transition;
