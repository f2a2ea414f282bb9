//! Remote conversation store abstractions for Parley.
//!
//! This module defines the `ConversationSync` trait that the infrastructure
//! layer implements against the server that owns the message log.

pub mod api;

pub use api::ConversationSync;
