//! ConversationSync trait definition.
//!
//! The server owns the message log and is the source of truth. Every
//! operation is a single request/response; there is no streaming at this
//! layer. Follows the same RPITIT pattern as the other ports.

use parley_types::conversation::{
    CharacterId, GenerationSettings, Message, MessageId, SessionId, SessionSnapshot,
};
use parley_types::error::SyncError;

/// Port to the remote conversation store.
///
/// Implementations live in parley-infra (e.g., `HttpConversationSync`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ConversationSync: Send + Sync {
    /// Resume the given (or latest) session for a character, or create one.
    ///
    /// `force_new` always creates a fresh session. Returns the full log.
    fn resume_or_create_session(
        &self,
        character_id: &CharacterId,
        session_id: Option<&SessionId>,
        force_new: bool,
    ) -> impl std::future::Future<Output = Result<SessionSnapshot, SyncError>> + Send;

    /// Append a user message and generate its first response.
    ///
    /// Returns every message the server created (the user message and,
    /// normally, the first model version).
    fn append_user_message(
        &self,
        session_id: &SessionId,
        text: &str,
        settings: &GenerationSettings,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, SyncError>> + Send;

    /// Replace a message's content.
    fn update_message_content(
        &self,
        message_id: MessageId,
        content: &str,
    ) -> impl std::future::Future<Output = Result<(), SyncError>> + Send;

    /// Delete a message. Deleting a user message cascades server-side to
    /// every model message of its turn.
    fn delete_message(
        &self,
        message_id: MessageId,
    ) -> impl std::future::Future<Output = Result<(), SyncError>> + Send;

    /// Generate a new model version for a turn. The returned message is the
    /// newly active version.
    fn regenerate(
        &self,
        session_id: &SessionId,
        turn_id: MessageId,
        settings: &GenerationSettings,
    ) -> impl std::future::Future<Output = Result<Message, SyncError>> + Send;

    /// Record which version of a turn is displayed.
    fn set_active_version(
        &self,
        turn_id: MessageId,
        message_id: MessageId,
    ) -> impl std::future::Future<Output = Result<(), SyncError>> + Send;
}
