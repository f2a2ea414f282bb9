//! Conversation message, turn, and session types for Parley.
//!
//! The server owns a flat, append-only message log. The client derives
//! [`Turn`]s from it: one user message paired with every model response
//! version generated for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::budget::BoostMultiplier;

/// Server-assigned message identifier.
///
/// Identifiers are unique and monotonic, so ordering by id is the same as
/// ordering by position in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Unique identifier for a chat session, wrapping a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new SessionId using UUID v7 (time-sortable).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identifier of the character a conversation is held with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterId(pub Uuid);

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CharacterId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Author of a message in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Model,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Model => write!(f, "model"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "model" => Ok(MessageRole::Model),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A single record of the server-owned message log.
///
/// User messages carry no turn reference (or a reference to themselves).
/// Model messages reference the user message they answer and carry a
/// per-turn version ordinal starting at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Originating user message (model messages only).
    #[serde(default)]
    pub turn_id: Option<MessageId>,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub is_active: bool,
}

fn default_version() -> u32 {
    1
}

impl Message {
    /// Build a user message.
    pub fn user(id: MessageId, content: impl Into<String>) -> Self {
        Self {
            id,
            role: MessageRole::User,
            content: content.into(),
            created_at: Utc::now(),
            turn_id: None,
            version: 1,
            is_active: true,
        }
    }

    /// Build a model response version for the turn opened by `turn_id`.
    pub fn model(
        id: MessageId,
        turn_id: MessageId,
        version: u32,
        is_active: bool,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id,
            role: MessageRole::Model,
            content: content.into(),
            created_at: Utc::now(),
            turn_id: Some(turn_id),
            version,
            is_active,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }

    /// The turn this message belongs to.
    ///
    /// User messages open their own turn. Model messages without a turn
    /// reference belong to no turn and return `None`.
    pub fn turn_key(&self) -> Option<MessageId> {
        match self.role {
            MessageRole::User => Some(self.id),
            MessageRole::Model => self.turn_id,
        }
    }
}

/// A user message together with every model response version for it.
///
/// Derived from the log, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Id of the originating user message.
    pub turn_id: MessageId,
    pub user_message: Message,
    /// Model responses ordered by version ascending.
    pub versions: Vec<Message>,
    /// Position of the displayed version. Unused (0) when `versions` is empty.
    pub active_index: usize,
}

impl Turn {
    /// The currently displayed response version, if any.
    pub fn active_version(&self) -> Option<&Message> {
        self.versions.get(self.active_index)
    }

    /// Content of the active response, or `None` while the turn is unanswered.
    pub fn displayed_content(&self) -> Option<&str> {
        self.active_version().map(|m| m.content.as_str())
    }

    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    /// Every message id belonging to this turn, user message first.
    pub fn message_ids(&self) -> Vec<MessageId> {
        std::iter::once(self.turn_id)
            .chain(self.versions.iter().map(|m| m.id))
            .collect()
    }
}

/// State returned when a session is resumed or created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    /// Free-form note attached to the session by the server.
    #[serde(default)]
    pub note: Option<String>,
    /// Complete message log in log order.
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Settings forwarded to the generation service with each request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub boost: BoostMultiplier,
}

/// Direction for cycling through a turn's response versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Next,
    Prev,
}

impl Direction {
    /// Step `current` one position in this direction, wrapping around `len`.
    ///
    /// Returns 0 when `len` is 0.
    pub fn step(self, current: usize, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let current = current.min(len - 1);
        match self {
            Direction::Next => (current + 1) % len,
            Direction::Prev => (current + len - 1) % len,
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "next" | "n" | ">" => Ok(Direction::Next),
            "prev" | "previous" | "p" | "<" => Ok(Direction::Prev),
            other => Err(format!("invalid direction: '{other}'")),
        }
    }
}
