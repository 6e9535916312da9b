//! Participant side of a race: local identity, view state and store bindings.

pub mod binding;
pub mod countdown;
pub mod identity;
pub mod keystrokes;
pub mod local_store;
pub mod phase;
pub mod profile;
#[cfg(feature = "remote-client")]
pub mod remote;
pub mod view;
