//! JSON bodies exchanged with the conversation server.

use parley_types::conversation::{CharacterId, GenerationSettings, Message, MessageId, SessionId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeSessionRequest {
    pub character_id: CharacterId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub force_new: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendMessageRequest {
    pub text: String,
    pub settings: GenerationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendMessageResponse {
    pub new_messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateContentRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegenerateRequest {
    pub settings: GenerationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegenerateResponse {
    pub new_message: Message,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetActiveVersionRequest {
    pub message_id: MessageId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub balance: u32,
}
