//! Per-conversation state container.
//!
//! Everything the controller mutates lives in one `ConversationState` so that
//! validation of concurrent operations is a plain check against `phase`.

use std::fmt;

use parley_types::budget::BoostMultiplier;
use parley_types::conversation::{CharacterId, MessageId, SessionId};
use parley_types::event::Operation;

use super::error::ConversationError;
use crate::turn::MessageLog;

/// Lifecycle phase of a conversation.
///
/// `Sending` and `Regenerating` are exclusive: only one of them may be in
/// flight. `Failed` records the last failure and is not busy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConversationPhase {
    #[default]
    Idle,
    Sending,
    Regenerating { turn_id: MessageId },
    Failed { operation: Operation, reason: String },
}

impl ConversationPhase {
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            ConversationPhase::Sending | ConversationPhase::Regenerating { .. }
        )
    }
}

impl fmt::Display for ConversationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationPhase::Idle => write!(f, "idle"),
            ConversationPhase::Sending => write!(f, "sending"),
            ConversationPhase::Regenerating { turn_id } => write!(f, "regenerating turn {turn_id}"),
            ConversationPhase::Failed { operation, .. } => write!(f, "{operation} failed"),
        }
    }
}

/// Mutable state of one open conversation.
#[derive(Debug)]
pub struct ConversationState {
    pub session_id: SessionId,
    pub character_id: CharacterId,
    pub note: Option<String>,
    pub log: MessageLog,
    /// Local mirror of the budget gate balance.
    pub balance: u32,
    pub boost: BoostMultiplier,
    /// Pending text of the input field.
    pub input: String,
    pub phase: ConversationPhase,
}

impl ConversationState {
    pub fn new(
        session_id: SessionId,
        character_id: CharacterId,
        note: Option<String>,
        log: MessageLog,
        balance: u32,
        boost: BoostMultiplier,
    ) -> Self {
        Self {
            session_id,
            character_id,
            note,
            log,
            balance,
            boost,
            input: String::new(),
            phase: ConversationPhase::Idle,
        }
    }

    /// Enter an exclusive phase, rejecting if another one is in flight.
    pub fn begin(&mut self, next: ConversationPhase) -> Result<(), ConversationError> {
        if self.phase.is_busy() {
            return Err(ConversationError::Busy {
                phase: self.phase.clone(),
            });
        }
        self.phase = next;
        Ok(())
    }

    pub fn finish(&mut self) {
        self.phase = ConversationPhase::Idle;
    }

    pub fn fail(&mut self, operation: Operation, reason: impl Into<String>) {
        self.phase = ConversationPhase::Failed {
            operation,
            reason: reason.into(),
        };
    }

    /// Record a failed edit or delete.
    ///
    /// An in-flight send or regenerate keeps its phase.
    pub fn note_failure(&mut self, operation: Operation, reason: impl Into<String>) {
        if !self.phase.is_busy() {
            self.fail(operation, reason);
        }
    }

    /// Reject mutations of a message whose turn is being regenerated.
    ///
    /// The message must exist. Returns the message's turn, if it has one.
    pub fn check_mutable(&self, id: MessageId) -> Result<Option<MessageId>, ConversationError> {
        if !self.log.contains(id) {
            return Err(ConversationError::MessageNotFound(id));
        }
        let turn_id = self.log.turn_of(id);
        if let (ConversationPhase::Regenerating { turn_id: busy }, Some(turn_id)) =
            (&self.phase, turn_id)
        {
            if *busy == turn_id {
                return Err(ConversationError::TurnInFlight(turn_id));
            }
        }
        Ok(turn_id)
    }
}
