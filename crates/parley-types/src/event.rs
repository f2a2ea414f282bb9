//! Event types for the Parley conversation event bus.
//!
//! `ConversationEvent` is broadcast by the conversation controller whenever
//! the local view changes or an operation fails. All variants are
//! Clone + Send + Sync for use with tokio broadcast channels.

use serde::{Deserialize, Serialize};

use crate::conversation::MessageId;

/// Mutating operations performed by the conversation controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Send,
    Edit,
    Delete,
    Regenerate,
    SwitchVersion,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Send => write!(f, "send"),
            Operation::Edit => write!(f, "edit"),
            Operation::Delete => write!(f, "delete"),
            Operation::Regenerate => write!(f, "regenerate"),
            Operation::SwitchVersion => write!(f, "switch_version"),
        }
    }
}

/// Events emitted by a conversation controller.
///
/// Front ends subscribe to re-render the turn view and to surface errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationEvent {
    /// New messages were appended to the log after a confirmed send.
    MessagesAppended { message_ids: Vec<MessageId> },

    /// A message's content changed (optimistic edit or its rollback).
    MessageEdited { message_id: MessageId },

    /// Messages were removed from the local view.
    MessagesRemoved { message_ids: Vec<MessageId> },

    /// Messages were put back after a failed delete.
    MessagesRestored { message_ids: Vec<MessageId> },

    /// A regeneration produced a new active version.
    VersionAdded {
        turn_id: MessageId,
        message_id: MessageId,
        version: u32,
    },

    /// The displayed version of a turn changed.
    VersionSwitched {
        turn_id: MessageId,
        active_index: usize,
        message_id: MessageId,
    },

    /// The local balance changed (after a send or a re-sync).
    BalanceChanged { balance: u32 },

    /// An operation failed and was rolled back. Surfaced to the user.
    OperationFailed { operation: Operation, error: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = ConversationEvent::VersionSwitched {
            turn_id: MessageId(1),
            active_index: 0,
            message_id: MessageId(2),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"version_switched\""));
        assert!(json.contains("\"turn_id\":1"));
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::SwitchVersion.to_string(), "switch_version");
        assert_eq!(Operation::Send.to_string(), "send");
    }
}
