//! Errors surfaced by conversation operations.

use parley_types::conversation::MessageId;
use parley_types::error::{BudgetError, SyncError};
use thiserror::Error;

use super::state::ConversationPhase;

/// How an error is handled by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected locally before any request was issued.
    Validation,
    /// A request failed; local state was rolled back.
    Transient,
    /// The conversation cannot continue (no session).
    Fatal,
}

/// Errors returned by `ConversationController` operations.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("message is empty")]
    EmptyInput,

    #[error("insufficient balance: {balance} points available, {required} required")]
    InsufficientBalance { balance: u32, required: u32 },

    #[error("another operation is in flight ({phase})")]
    Busy { phase: ConversationPhase },

    #[error("turn {0} is being regenerated")]
    TurnInFlight(MessageId),

    #[error("message {0} not found")]
    MessageNotFound(MessageId),

    #[error("turn {0} not found")]
    TurnNotFound(MessageId),

    #[error("turn {0} has no response versions")]
    NoVersions(MessageId),

    #[error("request failed: {0}")]
    Request(#[from] SyncError),

    #[error("could not open session: {0}")]
    SessionUnavailable(SyncError),

    #[error("budget unavailable: {0}")]
    Budget(#[from] BudgetError),
}

impl ConversationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConversationError::EmptyInput
            | ConversationError::InsufficientBalance { .. }
            | ConversationError::Busy { .. }
            | ConversationError::TurnInFlight(_)
            | ConversationError::MessageNotFound(_)
            | ConversationError::TurnNotFound(_)
            | ConversationError::NoVersions(_) => ErrorKind::Validation,
            ConversationError::Request(_) | ConversationError::Budget(_) => ErrorKind::Transient,
            ConversationError::SessionUnavailable(_) => ErrorKind::Fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(ConversationError::EmptyInput.kind(), ErrorKind::Validation);
        assert_eq!(
            ConversationError::InsufficientBalance {
                balance: 1,
                required: 3
            }
            .kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            ConversationError::Request(SyncError::NotFound).kind(),
            ErrorKind::Transient
        );
        assert_eq!(
            ConversationError::SessionUnavailable(SyncError::Connection("refused".into())).kind(),
            ErrorKind::Fatal
        );
    }

    #[test]
    fn test_error_display() {
        let err = ConversationError::InsufficientBalance {
            balance: 1,
            required: 3,
        };
        assert_eq!(
            err.to_string(),
            "insufficient balance: 1 points available, 3 required"
        );
        let err = ConversationError::Busy {
            phase: ConversationPhase::Sending,
        };
        assert_eq!(err.to_string(), "another operation is in flight (sending)");
    }
}
