//! Conversation controller.
//!
//! Drives send, edit, delete, regenerate and version-switch operations
//! against the remote log while keeping the local `MessageLog` consistent.
//! Edits and deletes are applied optimistically and rolled back from their
//! `Undo` when the request fails. Sends and regenerations are applied only
//! after the server confirms them. Version switches are applied locally and
//! persisted in the background by the `VersionSyncQueue`.
//!
//! State is held in a `std::sync::Mutex` that is never held across an
//! `.await`, so every operation takes `&self` and operations may be driven
//! concurrently.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use parley_types::budget::{BoostMultiplier, CostTable};
use parley_types::config::ParleyConfig;
use parley_types::conversation::{
    CharacterId, Direction, GenerationSettings, Message, MessageId, SessionId, Turn,
};
use parley_types::event::{ConversationEvent, Operation};
use tracing::{debug, info, warn};

use super::error::{ConversationError, ErrorKind};
use super::state::{ConversationPhase, ConversationState};
use super::undo::Undo;
use super::version_sync::{VersionSyncQueue, VersionSyncStats};
use crate::budget::BudgetGate;
use crate::event::{EventBus, EventSubscription};
use crate::preference::PreferenceStore;
use crate::sync::ConversationSync;
use crate::turn::MessageLog;
use crate::turn::audit::audit_log;

/// Which session to open for a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRequest {
    pub character_id: CharacterId,
    /// Resume this session instead of the character's latest one.
    pub session_id: Option<SessionId>,
    /// Always start a fresh session.
    pub force_new: bool,
}

impl SessionRequest {
    /// Resume the character's latest session, creating one if none exists.
    pub fn latest(character_id: CharacterId) -> Self {
        Self {
            character_id,
            session_id: None,
            force_new: false,
        }
    }

    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn fresh(mut self) -> Self {
        self.force_new = true;
        self
    }
}

/// Orchestrates every mutating operation of one open conversation.
///
/// Generic over the three ports so that parley-core never depends on
/// parley-infra.
pub struct ConversationController<S, B, P>
where
    S: ConversationSync + 'static,
    B: BudgetGate,
    P: PreferenceStore,
{
    sync: Arc<S>,
    budget: B,
    prefs: P,
    costs: CostTable,
    state: Mutex<ConversationState>,
    events: EventBus,
    versions: VersionSyncQueue,
}

impl<S, B, P> ConversationController<S, B, P>
where
    S: ConversationSync + 'static,
    B: BudgetGate,
    P: PreferenceStore,
{
    /// Resume or create a session and load the balance and boost preference.
    ///
    /// Failing to establish the session is fatal. A budget or preference
    /// failure only logs a warning: the balance starts at 0 until the next
    /// `refresh_balance` and the boost starts at 1.0.
    pub async fn open(
        sync: Arc<S>,
        budget: B,
        prefs: P,
        config: &ParleyConfig,
        request: SessionRequest,
    ) -> Result<Self, ConversationError> {
        let snapshot = sync
            .resume_or_create_session(
                &request.character_id,
                request.session_id.as_ref(),
                request.force_new,
            )
            .await
            .map_err(ConversationError::SessionUnavailable)?;

        let session_id = snapshot.session_id;
        for anomaly in audit_log(&snapshot.messages) {
            warn!(session_id = %session_id, %anomaly, "message log anomaly");
        }

        let balance = match budget.balance().await {
            Ok(balance) => balance,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "failed to load balance");
                0
            }
        };
        let boost = match prefs.load_boost(&request.character_id).await {
            Ok(boost) => boost.unwrap_or_default(),
            Err(e) => {
                warn!(character_id = %request.character_id, error = %e, "failed to load boost preference");
                BoostMultiplier::default()
            }
        };

        let message_count = snapshot.messages.len();
        let log = MessageLog::from_messages(snapshot.messages);
        info!(
            session_id = %session_id,
            character_id = %request.character_id,
            message_count,
            balance,
            %boost,
            "conversation opened"
        );

        let versions = VersionSyncQueue::spawn(sync.clone(), config.version_sync.clone());
        let events = EventBus::new(config.events.capacity);

        Ok(Self {
            sync,
            budget,
            prefs,
            costs: config.costs.clone(),
            state: Mutex::new(ConversationState::new(
                session_id,
                request.character_id,
                snapshot.note,
                log,
                balance,
                boost,
            )),
            events,
            versions,
        })
    }

    // --- Mutating operations ---

    /// Send a user message and append what the server created.
    ///
    /// Rejected without a request when the text is blank, another send or
    /// regenerate is in flight, or the balance does not cover the cost of
    /// the selected boost. The input field is cleared on invocation and is
    /// not restored if the request fails.
    pub async fn send_message(&self, text: &str) -> Result<Vec<MessageId>, ConversationError> {
        let (session_id, character_id, settings, cost) = {
            let mut state = self.lock();
            if text.trim().is_empty() {
                return Err(self.surface(Operation::Send, ConversationError::EmptyInput));
            }
            if state.phase.is_busy() {
                let phase = state.phase.clone();
                return Err(self.surface(Operation::Send, ConversationError::Busy { phase }));
            }
            let cost = self.costs.total_cost(state.boost);
            if state.balance < cost {
                let error = ConversationError::InsufficientBalance {
                    balance: state.balance,
                    required: cost,
                };
                return Err(self.surface(Operation::Send, error));
            }
            state.begin(ConversationPhase::Sending)?;
            state.input.clear();
            (
                state.session_id,
                state.character_id,
                GenerationSettings { boost: state.boost },
                cost,
            )
        };

        debug!(session_id = %session_id, cost, boost = %settings.boost, "sending message");
        let result = self
            .sync
            .append_user_message(&session_id, text, &settings)
            .await;

        match result {
            Ok(messages) => {
                let message_ids: Vec<MessageId> = messages.iter().map(|m| m.id).collect();
                let balance = {
                    let mut state = self.lock();
                    state.log.extend(messages);
                    state.balance = state.balance.saturating_sub(cost);
                    state.boost = BoostMultiplier::Standard;
                    state.finish();
                    state.balance
                };
                info!(
                    session_id = %session_id,
                    messages = message_ids.len(),
                    balance,
                    "message sent"
                );
                self.events.publish(ConversationEvent::MessagesAppended {
                    message_ids: message_ids.clone(),
                });
                self.events
                    .publish(ConversationEvent::BalanceChanged { balance });

                if let Err(e) = self
                    .prefs
                    .save_boost(&character_id, BoostMultiplier::Standard)
                    .await
                {
                    warn!(character_id = %character_id, error = %e, "failed to persist boost reset");
                }
                Ok(message_ids)
            }
            Err(e) => {
                self.lock().fail(Operation::Send, e.to_string());
                let error = self.surface(Operation::Send, ConversationError::Request(e));
                if let Err(e) = self.refresh_balance().await {
                    warn!(session_id = %session_id, error = %e, "balance re-sync after failed send failed");
                }
                Err(error)
            }
        }
    }

    /// Replace a message's content.
    ///
    /// The new content is shown immediately and reverted byte-for-byte if
    /// the server rejects it. Editing never regenerates downstream
    /// responses.
    pub async fn edit_message(
        &self,
        message_id: MessageId,
        content: &str,
    ) -> Result<(), ConversationError> {
        if content.trim().is_empty() {
            return Err(self.surface(Operation::Edit, ConversationError::EmptyInput));
        }

        let undo = {
            let mut state = self.lock();
            if let Err(e) = state.check_mutable(message_id) {
                return Err(self.surface(Operation::Edit, e));
            }
            Undo::edit(&mut state.log, message_id, content.to_string())
                .ok_or(ConversationError::MessageNotFound(message_id))?
        };
        self.events
            .publish(ConversationEvent::MessageEdited { message_id });

        match self.sync.update_message_content(message_id, content).await {
            Ok(()) => {
                info!(message_id = %message_id, "message edited");
                Ok(())
            }
            Err(e) => {
                {
                    let mut state = self.lock();
                    undo.apply(&mut state.log);
                    state.note_failure(Operation::Edit, e.to_string());
                }
                self.events
                    .publish(ConversationEvent::MessageEdited { message_id });
                Err(self.surface(Operation::Edit, ConversationError::Request(e)))
            }
        }
    }

    /// Delete a message.
    ///
    /// Deleting a user message removes its whole turn; deleting a model
    /// message removes only that version. The removal is shown immediately
    /// and undone if the request fails.
    pub async fn delete_message(&self, message_id: MessageId) -> Result<(), ConversationError> {
        let undo = {
            let mut state = self.lock();
            if let Err(e) = state.check_mutable(message_id) {
                return Err(self.surface(Operation::Delete, e));
            }
            Undo::delete(&mut state.log, message_id)
                .ok_or(ConversationError::MessageNotFound(message_id))?
        };
        let message_ids = undo.message_ids();
        self.events.publish(ConversationEvent::MessagesRemoved {
            message_ids: message_ids.clone(),
        });

        match self.sync.delete_message(message_id).await {
            Ok(()) => {
                info!(message_id = %message_id, removed = message_ids.len(), "message deleted");
                Ok(())
            }
            Err(e) => {
                {
                    let mut state = self.lock();
                    undo.apply(&mut state.log);
                    state.note_failure(Operation::Delete, e.to_string());
                }
                self.events
                    .publish(ConversationEvent::MessagesRestored { message_ids });
                Err(self.surface(Operation::Delete, ConversationError::Request(e)))
            }
        }
    }

    /// Generate a new response version for a turn and make it active.
    ///
    /// Intended for the most recent turn; callers enforce that. Costs no
    /// points.
    pub async fn regenerate(&self, turn_id: MessageId) -> Result<Message, ConversationError> {
        let (session_id, settings) = {
            let mut state = self.lock();
            if state.log.turn(turn_id).is_none() {
                return Err(self.surface(
                    Operation::Regenerate,
                    ConversationError::TurnNotFound(turn_id),
                ));
            }
            if let Err(e) = state.begin(ConversationPhase::Regenerating { turn_id }) {
                return Err(self.surface(Operation::Regenerate, e));
            }
            (state.session_id, GenerationSettings { boost: state.boost })
        };

        debug!(session_id = %session_id, turn_id = %turn_id, "regenerating");
        let result = self.sync.regenerate(&session_id, turn_id, &settings).await;

        match result {
            Ok(mut message) => {
                message.turn_id.get_or_insert(turn_id);
                {
                    let mut state = self.lock();
                    state.log.add_active_version(message.clone());
                    state.finish();
                }
                self.versions.settle(turn_id, message.id);
                info!(
                    session_id = %session_id,
                    turn_id = %turn_id,
                    message_id = %message.id,
                    version = message.version,
                    "response regenerated"
                );
                self.events.publish(ConversationEvent::VersionAdded {
                    turn_id,
                    message_id: message.id,
                    version: message.version,
                });
                Ok(message)
            }
            Err(e) => {
                self.lock().fail(Operation::Regenerate, e.to_string());
                Err(self.surface(Operation::Regenerate, ConversationError::Request(e)))
            }
        }
    }

    /// Cycle the displayed version of a turn.
    ///
    /// The local view changes immediately and unconditionally. The new
    /// selection is persisted in the background; a failure there never
    /// reverts the view. Returns the new active index.
    pub fn switch_version(
        &self,
        turn_id: MessageId,
        direction: Direction,
    ) -> Result<usize, ConversationError> {
        let (active_index, message_id) = {
            let mut state = self.lock();
            let Some(turn) = state.log.turn(turn_id) else {
                return Err(self.surface(
                    Operation::SwitchVersion,
                    ConversationError::TurnNotFound(turn_id),
                ));
            };
            if turn.versions.is_empty() {
                return Err(self.surface(
                    Operation::SwitchVersion,
                    ConversationError::NoVersions(turn_id),
                ));
            }
            let active_index = direction.step(turn.active_index, turn.versions.len());
            let message_id = turn.versions[active_index].id;
            state.log.set_active(turn_id, message_id);
            (active_index, message_id)
        };

        debug!(turn_id = %turn_id, active_index, message_id = %message_id, "version switched");
        self.events.publish(ConversationEvent::VersionSwitched {
            turn_id,
            active_index,
            message_id,
        });
        self.versions.enqueue(turn_id, message_id);
        Ok(active_index)
    }

    // --- Budget and preferences ---

    /// Re-read the balance from the budget gate.
    pub async fn refresh_balance(&self) -> Result<u32, ConversationError> {
        let balance = self.budget.balance().await?;
        self.lock().balance = balance;
        self.events
            .publish(ConversationEvent::BalanceChanged { balance });
        Ok(balance)
    }

    /// Select the boost multiplier for the next send and persist the choice.
    pub async fn set_boost(&self, boost: BoostMultiplier) {
        let character_id = {
            let mut state = self.lock();
            state.boost = boost;
            state.character_id
        };
        if let Err(e) = self.prefs.save_boost(&character_id, boost).await {
            warn!(character_id = %character_id, error = %e, "failed to persist boost preference");
        }
    }

    /// Points the next send will cost with the current boost.
    pub fn send_cost(&self) -> u32 {
        self.costs.total_cost(self.lock().boost)
    }

    pub fn costs(&self) -> &CostTable {
        &self.costs
    }

    // --- Read access ---

    /// Every turn, in chronological order of user messages.
    pub fn turns(&self) -> Vec<Turn> {
        self.lock().log.turns()
    }

    pub fn turn(&self, turn_id: MessageId) -> Option<Turn> {
        self.lock().log.turn(turn_id)
    }

    /// The most recent turn, the only one callers should regenerate.
    pub fn latest_turn_id(&self) -> Option<MessageId> {
        self.lock().log.latest_turn_id()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock().log.to_vec()
    }

    pub fn balance(&self) -> u32 {
        self.lock().balance
    }

    pub fn boost(&self) -> BoostMultiplier {
        self.lock().boost
    }

    pub fn input(&self) -> String {
        self.lock().input.clone()
    }

    pub fn set_input(&self, text: impl Into<String>) {
        self.lock().input = text.into();
    }

    pub fn phase(&self) -> ConversationPhase {
        self.lock().phase.clone()
    }

    /// Auxiliary note returned with the session.
    pub fn note(&self) -> Option<String> {
        self.lock().note.clone()
    }

    pub fn session_id(&self) -> SessionId {
        self.lock().session_id
    }

    pub fn character_id(&self) -> CharacterId {
        self.lock().character_id
    }

    pub fn subscribe(&self) -> EventSubscription {
        self.events.subscribe()
    }

    /// Close the conversation, waiting for queued version selections.
    pub async fn close(self) -> VersionSyncStats {
        let session_id = self.session_id();
        let stats = self.versions.shutdown().await;
        info!(
            session_id = %session_id,
            persisted = stats.persisted,
            drifted = stats.drifted,
            "conversation closed"
        );
        stats
    }

    fn lock(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Log an error and publish it for the front end.
    fn surface(&self, operation: Operation, error: ConversationError) -> ConversationError {
        match error.kind() {
            ErrorKind::Validation => debug!(%operation, error = %error, "operation rejected"),
            ErrorKind::Transient | ErrorKind::Fatal => {
                warn!(%operation, error = %error, "operation failed")
            }
        }
        self.events.publish(ConversationEvent::OperationFailed {
            operation,
            error: error.to_string(),
        });
        error
    }
}
