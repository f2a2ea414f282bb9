//! Inverse actions for optimistic mutations.
//!
//! Each optimistic change to the local log yields an `Undo` describing how
//! to put the log back. The controller keeps it until the server answers and
//! applies it only if the request failed.

use parley_types::conversation::{Message, MessageId};

use crate::turn::MessageLog;

/// Inverse of one optimistic log mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Undo {
    /// Put back the content a message had before an edit.
    RestoreContent { id: MessageId, previous: String },
    /// Reinsert messages removed by a delete, with their original flags.
    Reinsert(Vec<Message>),
}

impl Undo {
    /// Apply an edit to the log and capture its inverse.
    ///
    /// Returns `None` when the message is not in the log.
    pub fn edit(log: &mut MessageLog, id: MessageId, content: String) -> Option<Self> {
        let previous = log.set_content(id, content)?;
        Some(Undo::RestoreContent { id, previous })
    }

    /// Remove a message from the log and capture its inverse.
    ///
    /// Removing a user message takes every model version of its turn with it.
    /// Removing a model message removes only that message. Returns `None`
    /// when the message is not in the log.
    pub fn delete(log: &mut MessageLog, id: MessageId) -> Option<Self> {
        let message = log.get(id)?;
        let removed = if message.is_user() {
            log.remove_turn(id)
        } else {
            log.remove(id).into_iter().collect()
        };
        Some(Undo::Reinsert(removed))
    }

    /// Ids touched by this inverse action, in log order.
    pub fn message_ids(&self) -> Vec<MessageId> {
        match self {
            Undo::RestoreContent { id, .. } => vec![*id],
            Undo::Reinsert(messages) => messages.iter().map(|m| m.id).collect(),
        }
    }

    /// Revert the mutation this inverse was captured from.
    ///
    /// A reinserted version keeps its active flag only while its turn has no
    /// other active version; a switch made after the delete wins.
    pub fn apply(self, log: &mut MessageLog) {
        match self {
            Undo::RestoreContent { id, previous } => {
                log.set_content(id, previous);
            }
            Undo::Reinsert(mut messages) => {
                for message in messages.iter_mut().filter(|m| m.is_active && !m.is_user()) {
                    let switched = message
                        .turn_id
                        .is_some_and(|turn_id| log.versions(turn_id).iter().any(|v| v.is_active));
                    if switched {
                        message.is_active = false;
                    }
                }
                log.extend(messages);
            }
        }
    }
}
