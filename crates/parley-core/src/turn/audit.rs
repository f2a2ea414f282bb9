//! Anomaly detection for message logs received from the server.
//!
//! The projector tolerates malformed logs silently. The audit reports what it
//! tolerated so the controller can log it.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use parley_types::conversation::{Message, MessageId, MessageRole};

/// A deviation from the log invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogAnomaly {
    /// Model message whose turn reference matches no user message.
    OrphanVersion {
        message_id: MessageId,
        turn_id: Option<MessageId>,
    },
    /// More than one version of a turn is flagged active.
    MultipleActive {
        turn_id: MessageId,
        message_ids: Vec<MessageId>,
    },
    /// Versions of a turn are not exactly 1..=n.
    VersionGap {
        turn_id: MessageId,
        versions: Vec<u32>,
    },
    /// Two versions of a turn share a version number.
    DuplicateVersion { turn_id: MessageId, version: u32 },
}

impl fmt::Display for LogAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogAnomaly::OrphanVersion {
                message_id,
                turn_id: Some(turn_id),
            } => write!(f, "model message {message_id} references missing turn {turn_id}"),
            LogAnomaly::OrphanVersion {
                message_id,
                turn_id: None,
            } => write!(f, "model message {message_id} has no turn reference"),
            LogAnomaly::MultipleActive {
                turn_id,
                message_ids,
            } => write!(
                f,
                "turn {turn_id} has {} active versions",
                message_ids.len()
            ),
            LogAnomaly::VersionGap { turn_id, versions } => {
                write!(f, "turn {turn_id} has non-contiguous versions {versions:?}")
            }
            LogAnomaly::DuplicateVersion { turn_id, version } => {
                write!(f, "turn {turn_id} has duplicate version {version}")
            }
        }
    }
}

/// Check a log against the turn invariants.
///
/// Anomalies are reported in log order of the turn they concern.
pub fn audit_log(messages: &[Message]) -> Vec<LogAnomaly> {
    let user_ids: HashSet<MessageId> = messages
        .iter()
        .filter(|m| m.is_user())
        .map(|m| m.id)
        .collect();

    let mut anomalies = Vec::new();
    let mut per_turn: BTreeMap<MessageId, Vec<&Message>> = BTreeMap::new();

    for message in messages.iter().filter(|m| m.role == MessageRole::Model) {
        match message.turn_id {
            Some(turn_id) if user_ids.contains(&turn_id) => {
                per_turn.entry(turn_id).or_default().push(message);
            }
            turn_id => anomalies.push(LogAnomaly::OrphanVersion {
                message_id: message.id,
                turn_id,
            }),
        }
    }

    for (turn_id, mut versions) in per_turn {
        versions.sort_by_key(|m| (m.version, m.id));

        let active: Vec<MessageId> = versions
            .iter()
            .filter(|m| m.is_active)
            .map(|m| m.id)
            .collect();
        if active.len() > 1 {
            anomalies.push(LogAnomaly::MultipleActive {
                turn_id,
                message_ids: active,
            });
        }

        let numbers: Vec<u32> = versions.iter().map(|m| m.version).collect();
        let mut duplicate = false;
        for pair in numbers.windows(2) {
            if pair[0] == pair[1] {
                duplicate = true;
                anomalies.push(LogAnomaly::DuplicateVersion {
                    turn_id,
                    version: pair[0],
                });
            }
        }
        let contiguous = numbers
            .iter()
            .enumerate()
            .all(|(index, version)| *version as usize == index + 1);
        if !duplicate && !contiguous {
            anomalies.push(LogAnomaly::VersionGap {
                turn_id,
                versions: numbers,
            });
        }
    }

    anomalies
}
