//! HttpConversationSync -- REST implementation of [`ConversationSync`].
//!
//! | Operation | Request |
//! |---|---|
//! | resume | `POST {base}/sessions/resume` |
//! | append | `POST {base}/sessions/{sid}/messages` |
//! | edit | `PATCH {base}/messages/{id}` |
//! | delete | `DELETE {base}/messages/{id}` |
//! | regenerate | `POST {base}/sessions/{sid}/turns/{turn_id}/regenerate` |
//! | set active | `PUT {base}/turns/{turn_id}/active` |

use parley_core::sync::ConversationSync;
use parley_types::config::ServerConfig;
use parley_types::conversation::{
    CharacterId, GenerationSettings, Message, MessageId, SessionId, SessionSnapshot,
};
use parley_types::error::SyncError;
use reqwest::Method;

use super::client::RestClient;
use super::wire::{
    AppendMessageRequest, AppendMessageResponse, RegenerateRequest, RegenerateResponse,
    ResumeSessionRequest, SetActiveVersionRequest, UpdateContentRequest,
};

/// Conversation server client.
#[derive(Clone)]
pub struct HttpConversationSync {
    client: RestClient,
}

impl HttpConversationSync {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, SyncError> {
        Ok(Self::new(RestClient::from_config(config)?))
    }
}

impl ConversationSync for HttpConversationSync {
    async fn resume_or_create_session(
        &self,
        character_id: &CharacterId,
        session_id: Option<&SessionId>,
        force_new: bool,
    ) -> Result<SessionSnapshot, SyncError> {
        let body = ResumeSessionRequest {
            character_id: *character_id,
            session_id: session_id.copied(),
            force_new,
        };
        tracing::debug!(character_id = %character_id, force_new, "resuming session");
        let request = self
            .client
            .request(Method::POST, "sessions/resume")
            .json(&body);
        self.client.send_json(request).await
    }

    async fn append_user_message(
        &self,
        session_id: &SessionId,
        text: &str,
        settings: &GenerationSettings,
    ) -> Result<Vec<Message>, SyncError> {
        let body = AppendMessageRequest {
            text: text.to_string(),
            settings: *settings,
        };
        let request = self
            .client
            .request(Method::POST, &format!("sessions/{session_id}/messages"))
            .json(&body);
        let response: AppendMessageResponse = self.client.send_json(request).await?;
        Ok(response.new_messages)
    }

    async fn update_message_content(
        &self,
        message_id: MessageId,
        content: &str,
    ) -> Result<(), SyncError> {
        let body = UpdateContentRequest {
            content: content.to_string(),
        };
        let request = self
            .client
            .request(Method::PATCH, &format!("messages/{message_id}"))
            .json(&body);
        self.client.send(request).await.map(drop)
    }

    async fn delete_message(&self, message_id: MessageId) -> Result<(), SyncError> {
        let request = self
            .client
            .request(Method::DELETE, &format!("messages/{message_id}"));
        self.client.send(request).await.map(drop)
    }

    async fn regenerate(
        &self,
        session_id: &SessionId,
        turn_id: MessageId,
        settings: &GenerationSettings,
    ) -> Result<Message, SyncError> {
        let body = RegenerateRequest {
            settings: *settings,
        };
        let request = self
            .client
            .request(
                Method::POST,
                &format!("sessions/{session_id}/turns/{turn_id}/regenerate"),
            )
            .json(&body);
        let response: RegenerateResponse = self.client.send_json(request).await?;
        Ok(response.new_message)
    }

    async fn set_active_version(
        &self,
        turn_id: MessageId,
        message_id: MessageId,
    ) -> Result<(), SyncError> {
        let body = SetActiveVersionRequest { message_id };
        let request = self
            .client
            .request(Method::PUT, &format!("turns/{turn_id}/active"))
            .json(&body);
        self.client.send(request).await.map(drop)
    }
}
