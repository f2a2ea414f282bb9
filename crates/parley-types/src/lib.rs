//! Shared domain types for Parley.
//!
//! This crate contains the conversation domain types used across the Parley
//! workspace: messages, derived turns, boost pricing, conversation events,
//! configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod budget;
pub mod config;
pub mod conversation;
pub mod error;
pub mod event;
