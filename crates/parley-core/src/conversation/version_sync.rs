//! Best-effort persistence of active-version selections.
//!
//! Switching versions updates the local view immediately. The selection is
//! then handed to a background task that records it with the sync API.
//! Selections queued for the same turn coalesce (latest wins) and failed
//! requests are retried with exponential backoff. When every attempt fails
//! the selection is dropped and a persistence drift warning is logged; the
//! local view is never rolled back.
//!
//! A regenerate makes the server activate the new version on its own. The
//! controller reports that through [`VersionSyncQueue::settle`]: a selection
//! still queued for the turn is dropped, and if a request for the turn has
//! already gone out it may land after the regenerate, so the settled version
//! is sent again.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use parley_types::config::VersionSyncConfig;
use parley_types::conversation::MessageId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::sync::ConversationSync;

/// Counters reported when the queue shuts down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VersionSyncStats {
    /// Selections recorded by the server.
    pub persisted: u32,
    /// Selections replaced by a newer one for the same turn before they
    /// were recorded.
    pub superseded: u32,
    /// Selections dropped after exhausting every attempt.
    pub drifted: u32,
}

#[derive(Debug, Clone, Copy)]
struct Selection {
    turn_id: MessageId,
    message_id: MessageId,
}

#[derive(Debug, Clone, Copy)]
enum Command {
    /// The user picked a version locally.
    Select(Selection),
    /// The server activated this version itself.
    Settled(Selection),
}

/// Handle to the background version sync task.
#[derive(Debug)]
pub struct VersionSyncQueue {
    tx: mpsc::UnboundedSender<Command>,
    worker: JoinHandle<VersionSyncStats>,
}

impl VersionSyncQueue {
    /// Spawn the background task on the current tokio runtime.
    pub fn spawn<S>(sync: Arc<S>, policy: VersionSyncConfig) -> Self
    where
        S: ConversationSync + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run(sync, policy, rx));
        Self { tx, worker }
    }

    /// Queue a selection. Never blocks and never fails from the caller's
    /// point of view.
    pub fn enqueue(&self, turn_id: MessageId, message_id: MessageId) {
        self.send(Command::Select(Selection {
            turn_id,
            message_id,
        }));
    }

    /// Record that the server already has `message_id` active for the turn.
    pub fn settle(&self, turn_id: MessageId, message_id: MessageId) {
        self.send(Command::Settled(Selection {
            turn_id,
            message_id,
        }));
    }

    fn send(&self, command: Command) {
        if let Err(mpsc::error::SendError(command)) = self.tx.send(command) {
            let (Command::Select(selection) | Command::Settled(selection)) = command;
            warn!(
                turn_id = %selection.turn_id,
                message_id = %selection.message_id,
                "version sync worker stopped; selection not persisted"
            );
        }
    }

    /// Stop accepting selections and wait for queued ones to be processed.
    pub async fn shutdown(self) -> VersionSyncStats {
        drop(self.tx);
        match self.worker.await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "version sync worker did not finish cleanly");
                VersionSyncStats::default()
            }
        }
    }
}

/// Worker-side state between requests.
#[derive(Debug, Default)]
struct Backlog {
    /// turn id -> latest selected message id
    pending: BTreeMap<MessageId, MessageId>,
    /// Turns with a request sent since their last settle.
    sent: BTreeSet<MessageId>,
    stats: VersionSyncStats,
}

impl Backlog {
    fn drain(&mut self, rx: &mut mpsc::UnboundedReceiver<Command>) {
        while let Ok(command) = rx.try_recv() {
            self.apply(command);
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Select(selection) => {
                if let Some(previous) = self.pending.insert(selection.turn_id, selection.message_id)
                {
                    if previous != selection.message_id {
                        self.stats.superseded += 1;
                    }
                }
            }
            Command::Settled(selection) => {
                if self.pending.remove(&selection.turn_id).is_some() {
                    self.stats.superseded += 1;
                }
                if self.sent.remove(&selection.turn_id) {
                    debug!(
                        turn_id = %selection.turn_id,
                        message_id = %selection.message_id,
                        "restating regenerated version after earlier selection"
                    );
                    self.pending.insert(selection.turn_id, selection.message_id);
                }
            }
        }
    }
}

async fn run<S>(
    sync: Arc<S>,
    policy: VersionSyncConfig,
    mut rx: mpsc::UnboundedReceiver<Command>,
) -> VersionSyncStats
where
    S: ConversationSync,
{
    let mut backlog = Backlog::default();

    loop {
        if backlog.pending.is_empty() {
            match rx.recv().await {
                Some(command) => backlog.apply(command),
                None => break,
            }
        }
        backlog.drain(&mut rx);

        let Some((turn_id, message_id)) = backlog.pending.pop_first() else {
            continue;
        };
        persist(sync.as_ref(), &policy, turn_id, message_id, &mut rx, &mut backlog).await;
    }

    let stats = backlog.stats;
    debug!(
        persisted = stats.persisted,
        superseded = stats.superseded,
        drifted = stats.drifted,
        "version sync worker finished"
    );
    stats
}

async fn persist<S>(
    sync: &S,
    policy: &VersionSyncConfig,
    turn_id: MessageId,
    mut message_id: MessageId,
    rx: &mut mpsc::UnboundedReceiver<Command>,
    backlog: &mut Backlog,
) where
    S: ConversationSync,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        backlog.sent.insert(turn_id);
        match sync.set_active_version(turn_id, message_id).await {
            Ok(()) => {
                debug!(turn_id = %turn_id, message_id = %message_id, attempt, "active version persisted");
                backlog.stats.persisted += 1;
                return;
            }
            Err(e) if attempt >= max_attempts => {
                warn!(
                    turn_id = %turn_id,
                    message_id = %message_id,
                    attempts = attempt,
                    error = %e,
                    "persistence drift: active version not recorded by server"
                );
                backlog.stats.drifted += 1;
                return;
            }
            Err(e) => {
                let backoff = policy.backoff_ms(attempt);
                debug!(
                    turn_id = %turn_id,
                    attempt,
                    backoff_ms = backoff,
                    error = %e,
                    "active version persist failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
                attempt += 1;

                backlog.drain(rx);
                if let Some(newer) = backlog.pending.remove(&turn_id) {
                    if newer != message_id {
                        backlog.stats.superseded += 1;
                        message_id = newer;
                        attempt = 1;
                    }
                }
            }
        }
    }
}
