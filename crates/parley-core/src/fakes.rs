//! In-memory port implementations shared by the core unit tests.
//!
//! `FakeSync` behaves like the conversation server: it owns a log, assigns
//! monotonic ids, cascades user-message deletes and keeps exactly one active
//! version per turn. Failures can be injected per operation. Every request
//! yields once before answering so that `tokio::join!` interleaves
//! concurrent operations at their request boundary.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use parley_types::budget::BoostMultiplier;
use parley_types::conversation::{
    CharacterId, GenerationSettings, Message, MessageId, SessionId, SessionSnapshot,
};
use parley_types::error::{BudgetError, RepositoryError, SyncError};
use parley_types::event::Operation;

use crate::budget::BudgetGate;
use crate::preference::PreferenceStore;
use crate::sync::ConversationSync;

/// A request received by `FakeSync`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncCall {
    Resume { force_new: bool },
    Append(String, BoostMultiplier),
    Update(MessageId, String),
    Delete(MessageId),
    Regenerate(MessageId, BoostMultiplier),
    SetActive(MessageId, MessageId),
}

#[derive(Debug, Default)]
struct Server {
    session_id: SessionId,
    note: Option<String>,
    messages: Vec<Message>,
    next_id: i64,
    /// Remaining injected failures per operation.
    failures: HashMap<Operation, u32>,
    fail_resume: bool,
    calls: Vec<SyncCall>,
}

impl Server {
    fn allocate_id(&mut self) -> MessageId {
        self.next_id += 1;
        MessageId(self.next_id)
    }

    fn take_failure(&mut self, operation: Operation) -> Result<(), SyncError> {
        match self.failures.get_mut(&operation) {
            Some(remaining) if *remaining > 0 => {
                *remaining = remaining.saturating_sub(1);
                Err(SyncError::Server {
                    status: 503,
                    message: format!("injected {operation} failure"),
                })
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeSync {
    server: Mutex<Server>,
}

impl FakeSync {
    pub fn with_messages(messages: Vec<Message>) -> Self {
        let next_id = messages.iter().map(|m| m.id.0).max().unwrap_or(0);
        Self {
            server: Mutex::new(Server {
                messages,
                next_id,
                ..Server::default()
            }),
        }
    }

    /// User "Hi" (1) answered by versions 2 (v1, inactive) and 3 (v2, active).
    pub fn with_scenario_one() -> Self {
        Self::with_messages(vec![
            Message::user(MessageId(1), "Hi"),
            Message::model(MessageId(2), MessageId(1), 1, false, "Hello!"),
            Message::model(MessageId(3), MessageId(1), 2, true, "Hey there!"),
        ])
    }

    pub fn set_note(&self, note: &str) {
        self.lock().note = Some(note.to_string());
    }

    /// Fail the next `count` requests of `operation`.
    pub fn fail_next(&self, operation: Operation, count: u32) {
        self.lock().failures.insert(operation, count);
    }

    pub fn fail_resume(&self) {
        self.lock().fail_resume = true;
    }

    pub fn calls(&self) -> Vec<SyncCall> {
        self.lock().calls.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    pub fn session_id(&self) -> SessionId {
        self.lock().session_id
    }

    /// The server-side active version of a turn.
    pub fn active_version(&self, turn_id: MessageId) -> Option<MessageId> {
        self.lock()
            .messages
            .iter()
            .find(|m| m.turn_id == Some(turn_id) && !m.is_user() && m.is_active)
            .map(|m| m.id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Server> {
        self.server.lock().unwrap()
    }
}

impl ConversationSync for FakeSync {
    async fn resume_or_create_session(
        &self,
        _character_id: &CharacterId,
        session_id: Option<&SessionId>,
        force_new: bool,
    ) -> Result<SessionSnapshot, SyncError> {
        tokio::task::yield_now().await;
        let mut server = self.lock();
        server.calls.push(SyncCall::Resume { force_new });
        if server.fail_resume {
            return Err(SyncError::Connection("connection refused".to_string()));
        }
        if force_new {
            server.session_id = SessionId::new();
            server.messages.clear();
        } else if let Some(id) = session_id {
            server.session_id = *id;
        }
        Ok(SessionSnapshot {
            session_id: server.session_id,
            note: server.note.clone(),
            messages: server.messages.clone(),
        })
    }

    async fn append_user_message(
        &self,
        _session_id: &SessionId,
        text: &str,
        settings: &GenerationSettings,
    ) -> Result<Vec<Message>, SyncError> {
        tokio::task::yield_now().await;
        let mut server = self.lock();
        server
            .calls
            .push(SyncCall::Append(text.to_string(), settings.boost));
        server.take_failure(Operation::Send)?;

        let user_id = server.allocate_id();
        let model_id = server.allocate_id();
        let created = vec![
            Message::user(user_id, text),
            Message::model(model_id, user_id, 1, true, format!("reply to {text}")),
        ];
        server.messages.extend(created.iter().cloned());
        Ok(created)
    }

    async fn update_message_content(
        &self,
        message_id: MessageId,
        content: &str,
    ) -> Result<(), SyncError> {
        tokio::task::yield_now().await;
        let mut server = self.lock();
        server
            .calls
            .push(SyncCall::Update(message_id, content.to_string()));
        server.take_failure(Operation::Edit)?;

        let message = server
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or(SyncError::NotFound)?;
        message.content = content.to_string();
        Ok(())
    }

    async fn delete_message(&self, message_id: MessageId) -> Result<(), SyncError> {
        tokio::task::yield_now().await;
        let mut server = self.lock();
        server.calls.push(SyncCall::Delete(message_id));
        server.take_failure(Operation::Delete)?;

        let target = server
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .cloned()
            .ok_or(SyncError::NotFound)?;
        if target.is_user() {
            server
                .messages
                .retain(|m| m.id != message_id && m.turn_id != Some(message_id));
        } else {
            server.messages.retain(|m| m.id != message_id);
        }
        Ok(())
    }

    async fn regenerate(
        &self,
        _session_id: &SessionId,
        turn_id: MessageId,
        settings: &GenerationSettings,
    ) -> Result<Message, SyncError> {
        tokio::task::yield_now().await;
        let mut server = self.lock();
        server
            .calls
            .push(SyncCall::Regenerate(turn_id, settings.boost));
        server.take_failure(Operation::Regenerate)?;

        if !server.messages.iter().any(|m| m.id == turn_id && m.is_user()) {
            return Err(SyncError::NotFound);
        }
        let version = server
            .messages
            .iter()
            .filter(|m| m.turn_id == Some(turn_id) && !m.is_user())
            .map(|m| m.version)
            .max()
            .unwrap_or(0)
            + 1;
        for message in server
            .messages
            .iter_mut()
            .filter(|m| m.turn_id == Some(turn_id))
        {
            message.is_active = false;
        }
        let id = server.allocate_id();
        let message = Message::model(id, turn_id, version, true, format!("take {version}"));
        server.messages.push(message.clone());
        Ok(message)
    }

    async fn set_active_version(
        &self,
        turn_id: MessageId,
        message_id: MessageId,
    ) -> Result<(), SyncError> {
        tokio::task::yield_now().await;
        let mut server = self.lock();
        server.calls.push(SyncCall::SetActive(turn_id, message_id));
        server.take_failure(Operation::SwitchVersion)?;

        for message in server
            .messages
            .iter_mut()
            .filter(|m| m.turn_id == Some(turn_id) && !m.is_user())
        {
            message.is_active = message.id == message_id;
        }
        Ok(())
    }
}

/// Budget gate with a settable balance.
#[derive(Debug, Clone, Default)]
pub struct FakeBudget {
    balance: Arc<Mutex<Option<u32>>>,
    reads: Arc<Mutex<u32>>,
}

impl FakeBudget {
    pub fn new(balance: u32) -> Self {
        Self {
            balance: Arc::new(Mutex::new(Some(balance))),
            reads: Arc::default(),
        }
    }

    pub fn set_balance(&self, balance: u32) {
        *self.balance.lock().unwrap() = Some(balance);
    }

    /// Make every subsequent read fail.
    pub fn go_offline(&self) {
        *self.balance.lock().unwrap() = None;
    }

    pub fn reads(&self) -> u32 {
        *self.reads.lock().unwrap()
    }
}

impl BudgetGate for FakeBudget {
    async fn balance(&self) -> Result<u32, BudgetError> {
        tokio::task::yield_now().await;
        *self.reads.lock().unwrap() += 1;
        let balance = *self.balance.lock().unwrap();
        balance.ok_or_else(|| BudgetError::Unavailable("budget service offline".to_string()))
    }
}

/// Preference store backed by a shared map.
#[derive(Debug, Clone, Default)]
pub struct FakePrefs {
    boosts: Arc<Mutex<HashMap<CharacterId, BoostMultiplier>>>,
    fail_saves: Arc<Mutex<bool>>,
}

impl FakePrefs {
    pub fn boost_for(&self, character_id: &CharacterId) -> Option<BoostMultiplier> {
        self.boosts.lock().unwrap().get(character_id).copied()
    }

    pub fn preset(&self, character_id: CharacterId, boost: BoostMultiplier) {
        self.boosts.lock().unwrap().insert(character_id, boost);
    }

    pub fn fail_saves(&self) {
        *self.fail_saves.lock().unwrap() = true;
    }
}

impl PreferenceStore for FakePrefs {
    async fn load_boost(
        &self,
        character_id: &CharacterId,
    ) -> Result<Option<BoostMultiplier>, RepositoryError> {
        Ok(self.boost_for(character_id))
    }

    async fn save_boost(
        &self,
        character_id: &CharacterId,
        boost: BoostMultiplier,
    ) -> Result<(), RepositoryError> {
        if *self.fail_saves.lock().unwrap() {
            return Err(RepositoryError::Query("disk full".to_string()));
        }
        self.boosts.lock().unwrap().insert(*character_id, boost);
        Ok(())
    }
}
