//! Pure projection of a message log into ordered turns.
//!
//! For each user message in log order, the model messages referencing it are
//! collected and sorted by version. The active index is the flagged version,
//! or the last version when nothing is flagged. Model messages whose turn
//! reference matches no user message are dropped from the view.

use std::collections::HashMap;

use parley_types::conversation::{Message, MessageId, MessageRole, Turn};

/// Project the complete ordered log of a conversation into turns.
///
/// Total and side-effect free: malformed input never fails, orphans are
/// simply excluded.
pub fn project_turns(messages: &[Message]) -> Vec<Turn> {
    let mut versions: HashMap<MessageId, Vec<Message>> = HashMap::new();
    for message in messages.iter().filter(|m| m.role == MessageRole::Model) {
        if let Some(turn_id) = message.turn_id {
            versions.entry(turn_id).or_default().push(message.clone());
        }
    }

    messages
        .iter()
        .filter(|m| m.is_user())
        .map(|user| {
            let turn_versions = versions.remove(&user.id).unwrap_or_default();
            build_turn(user.clone(), turn_versions)
        })
        .collect()
}

/// Assemble one turn from its user message and unsorted versions.
///
/// Versions are sorted ascending (ties broken by id) and the active flags are
/// normalised so exactly the version at `active_index` is flagged.
pub(crate) fn build_turn(user_message: Message, mut versions: Vec<Message>) -> Turn {
    versions.sort_by_key(|m| (m.version, m.id));
    let active_index = resolve_active_index(&versions);
    for (index, version) in versions.iter_mut().enumerate() {
        version.is_active = index == active_index;
    }

    Turn {
        turn_id: user_message.id,
        user_message,
        versions,
        active_index,
    }
}

/// Position of the active version within sorted versions.
///
/// When several versions carry the flag the highest one wins; when none
/// does, the last version is shown. Returns 0 for an empty list.
pub fn resolve_active_index(versions: &[Message]) -> usize {
    versions
        .iter()
        .rposition(|m| m.is_active)
        .unwrap_or_else(|| versions.len().saturating_sub(1))
}
