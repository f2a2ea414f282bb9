//! Conversation logic and port trait definitions for Parley.
//!
//! This crate defines the "ports" (sync API, budget gate, preference store)
//! that the infrastructure layer implements, the pure turn projector, and
//! the conversation controller. It depends only on `parley-types` -- never
//! on `parley-infra` or any network/database crate.

pub mod budget;
pub mod conversation;
pub mod event;
pub mod preference;
pub mod sync;
pub mod turn;

#[cfg(test)]
pub(crate) mod fakes;
