//! Local copy of the message log with an incremental turn index.
//!
//! Messages are keyed by id (ids are monotonic, so key order is log order).
//! A second map keeps, per turn, the ids of its model versions sorted by
//! version, so a single turn can be read or mutated without rescanning the
//! whole log.

use std::collections::{BTreeMap, HashMap};

use parley_types::conversation::{Message, MessageId, MessageRole, Turn};

use super::projector::build_turn;

/// The client's read-mutate-reconcile copy of a conversation log.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: BTreeMap<MessageId, Message>,
    /// turn id -> model message ids ordered by (version, id).
    versions: HashMap<MessageId, Vec<MessageId>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from messages received from the server.
    pub fn from_messages(messages: impl IntoIterator<Item = Message>) -> Self {
        let mut log = Self::new();
        log.extend(messages);
        log
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.get(&id)
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.messages.contains_key(&id)
    }

    /// Messages in log order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.values()
    }

    /// Snapshot of all messages in log order.
    pub fn to_vec(&self) -> Vec<Message> {
        self.messages.values().cloned().collect()
    }

    /// Insert a message, replacing any message with the same id.
    pub fn insert(&mut self, message: Message) {
        if let Some(previous) = self.messages.remove(&message.id) {
            self.unindex(&previous);
        }
        let id = message.id;
        self.messages.insert(id, message);
        self.index(id);
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        for message in messages {
            self.insert(message);
        }
    }

    /// Replace a message's content, returning the previous content.
    pub fn set_content(&mut self, id: MessageId, content: String) -> Option<String> {
        self.messages
            .get_mut(&id)
            .map(|m| std::mem::replace(&mut m.content, content))
    }

    /// Remove a single message.
    pub fn remove(&mut self, id: MessageId) -> Option<Message> {
        let removed = self.messages.remove(&id)?;
        self.unindex(&removed);
        Some(removed)
    }

    /// Remove a user message and every model message referencing it.
    ///
    /// Returns the removed messages in log order (empty when `turn_id` is
    /// unknown).
    pub fn remove_turn(&mut self, turn_id: MessageId) -> Vec<Message> {
        let mut removed = Vec::new();
        if let Some(ids) = self.versions.remove(&turn_id) {
            removed.extend(ids.into_iter().filter_map(|id| self.messages.remove(&id)));
        }
        if let Some(user) = self.messages.remove(&turn_id) {
            removed.push(user);
        }
        removed.sort_by_key(|m| m.id);
        removed
    }

    /// The turn a message belongs to, if it belongs to one.
    pub fn turn_of(&self, id: MessageId) -> Option<MessageId> {
        self.messages.get(&id).and_then(Message::turn_key)
    }

    /// Model versions of a turn ordered by version.
    pub fn versions(&self, turn_id: MessageId) -> Vec<&Message> {
        self.versions
            .get(&turn_id)
            .map(|ids| ids.iter().filter_map(|id| self.messages.get(id)).collect())
            .unwrap_or_default()
    }

    /// Project a single turn. `None` when no user message has this id.
    pub fn turn(&self, turn_id: MessageId) -> Option<Turn> {
        let user = self.messages.get(&turn_id).filter(|m| m.is_user())?;
        let versions = self.versions(turn_id).into_iter().cloned().collect();
        Some(build_turn(user.clone(), versions))
    }

    /// Project every turn in chronological order of user messages.
    pub fn turns(&self) -> Vec<Turn> {
        self.messages
            .values()
            .filter(|m| m.is_user())
            .filter_map(|user| self.turn(user.id))
            .collect()
    }

    /// Id of the most recent user message.
    pub fn latest_turn_id(&self) -> Option<MessageId> {
        self.messages
            .values()
            .rev()
            .find(|m| m.is_user())
            .map(|m| m.id)
    }

    /// Flag `message_id` as the only active version of `turn_id`.
    ///
    /// Returns `false` (and changes nothing) when the message is not a
    /// version of that turn.
    pub fn set_active(&mut self, turn_id: MessageId, message_id: MessageId) -> bool {
        let Some(ids) = self.versions.get(&turn_id) else {
            return false;
        };
        if !ids.contains(&message_id) {
            return false;
        }
        for id in ids {
            if let Some(message) = self.messages.get_mut(id) {
                message.is_active = *id == message_id;
            }
        }
        true
    }

    /// Append a freshly generated version and make it the active one.
    ///
    /// Every prior version of the turn is marked inactive.
    pub fn add_active_version(&mut self, mut message: Message) {
        message.is_active = true;
        let turn_id = message.turn_id;
        let id = message.id;
        self.insert(message);
        if let Some(turn_id) = turn_id {
            self.set_active(turn_id, id);
        }
    }

    fn index(&mut self, id: MessageId) {
        let Some(message) = self.messages.get(&id) else {
            return;
        };
        if message.role != MessageRole::Model {
            return;
        }
        let Some(turn_id) = message.turn_id else {
            return;
        };
        let key = (message.version, message.id);

        let messages = &self.messages;
        let ids = self.versions.entry(turn_id).or_default();
        let position = ids.partition_point(|other| {
            messages
                .get(other)
                .is_some_and(|m| (m.version, m.id) < key)
        });
        ids.insert(position, id);
    }

    fn unindex(&mut self, message: &Message) {
        let Some(turn_id) = message.turn_id else {
            return;
        };
        if let Some(ids) = self.versions.get_mut(&turn_id) {
            ids.retain(|id| *id != message.id);
            if ids.is_empty() {
                self.versions.remove(&turn_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turn::projector::project_turns;

    fn user(id: i64) -> Message {
        Message::user(MessageId(id), format!("user {id}"))
    }

    fn model(id: i64, turn: i64, version: u32, active: bool) -> Message {
        Message::model(MessageId(id), MessageId(turn), version, active, format!("model {id}"))
    }

    fn sample_log() -> MessageLog {
        MessageLog::from_messages(vec![
            user(1),
            model(2, 1, 1, false),
            model(3, 1, 2, true),
            user(4),
            model(5, 4, 1, true),
            model(6, 77, 1, true),
        ])
    }

    #[test]
    fn index_matches_pure_projection() {
        let log = sample_log();
        assert_eq!(log.turns(), project_turns(&log.to_vec()));
    }

    #[test]
    fn index_stays_sorted_for_out_of_order_inserts() {
        let mut log = MessageLog::new();
        log.insert(user(1));
        log.insert(model(9, 1, 3, false));
        log.insert(model(3, 1, 1, false));
        log.insert(model(5, 1, 2, false));

        let versions: Vec<u32> = log.versions(MessageId(1)).iter().map(|m| m.version).collect();
        assert_eq!(versions, vec![1, 2, 3]);
        assert_eq!(log.turns(), project_turns(&log.to_vec()));
    }

    #[test]
    fn remove_turn_cascades_to_versions() {
        let mut log = sample_log();
        let removed = log.remove_turn(MessageId(1));

        let ids: Vec<MessageId> = removed.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![MessageId(1), MessageId(2), MessageId(3)]);
        assert!(log.turn(MessageId(1)).is_none());
        assert!(log.versions(MessageId(1)).is_empty());
        assert_eq!(log.turns().len(), 1);
    }

    #[test]
    fn remove_single_version_keeps_turn_consistent() {
        let mut log = sample_log();
        log.remove(MessageId(3));

        let turn = log.turn(MessageId(1)).unwrap();
        assert_eq!(turn.versions.len(), 1);
        assert_eq!(turn.active_index, 0);
        assert_eq!(turn.displayed_content(), Some("model 2"));
    }

    #[test]
    fn reinserting_removed_messages_restores_view() {
        let mut log = sample_log();
        let before = log.turns();
        let removed = log.remove_turn(MessageId(1));
        log.extend(removed);
        assert_eq!(log.turns(), before);
    }

    #[test]
    fn set_content_returns_previous() {
        let mut log = sample_log();
        let previous = log.set_content(MessageId(1), "edited".to_string());
        assert_eq!(previous.as_deref(), Some("user 1"));
        assert_eq!(log.get(MessageId(1)).unwrap().content, "edited");
        assert!(log.set_content(MessageId(404), "x".to_string()).is_none());
    }

    #[test]
    fn add_active_version_deactivates_prior_versions() {
        let mut log = sample_log();
        log.add_active_version(model(10, 1, 3, false));

        let versions = log.versions(MessageId(1));
        let flags: Vec<bool> = versions.iter().map(|m| m.is_active).collect();
        assert_eq!(flags, vec![false, false, true]);
        assert_eq!(log.turn(MessageId(1)).unwrap().active_index, 2);
    }

    #[test]
    fn set_active_rejects_foreign_message() {
        let mut log = sample_log();
        assert!(!log.set_active(MessageId(1), MessageId(5)));
        assert!(log.set_active(MessageId(1), MessageId(2)));
        assert_eq!(log.turn(MessageId(1)).unwrap().active_index, 0);
    }

    #[test]
    fn upsert_moves_message_between_turns() {
        let mut log = sample_log();
        log.insert(model(5, 1, 3, false));
        assert!(log.versions(MessageId(4)).is_empty());
        assert_eq!(log.versions(MessageId(1)).len(), 3);
    }

    #[test]
    fn latest_turn_and_turn_of() {
        let log = sample_log();
        assert_eq!(log.latest_turn_id(), Some(MessageId(4)));
        assert_eq!(log.turn_of(MessageId(3)), Some(MessageId(1)));
        assert_eq!(log.turn_of(MessageId(4)), Some(MessageId(4)));
        assert_eq!(log.turn_of(MessageId(404)), None);
    }
}
