//! Conversation controller: optimistic mutations against the remote log.
//!
//! - `controller`: the `ConversationController` driving every operation.
//! - `state`: the single owned state container and its phase enum.
//! - `undo`: inverse actions captured by optimistic mutations.
//! - `version_sync`: best-effort background persistence of version switches.
//! - `error`: `ConversationError` and its validation/transient/fatal kinds.

pub mod controller;
pub mod error;
pub mod state;
pub mod undo;
pub mod version_sync;

pub use controller::{ConversationController, SessionRequest};
pub use error::{ConversationError, ErrorKind};
pub use state::ConversationPhase;
pub use version_sync::VersionSyncStats;
