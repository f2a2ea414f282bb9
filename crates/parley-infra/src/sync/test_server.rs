//! In-process axum server standing in for the conversation and budget
//! services in HTTP shim tests.

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, Uri, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use parley_types::config::ServerConfig;
use parley_types::conversation::{Message, MessageId, SessionId, SessionSnapshot};
use secrecy::SecretString;
use serde_json::{Value, json};

use super::client::RestClient;
use super::wire::{AppendMessageResponse, RegenerateResponse};

#[derive(Clone, Default)]
struct Shared {
    token: Option<String>,
    requests: Arc<Mutex<Vec<(String, Value)>>>,
    balance_body: Arc<Mutex<String>>,
}

impl Shared {
    fn record(&self, headers: &HeaderMap, uri: &Uri, body: &Bytes) -> Result<(), Response> {
        if let Some(token) = &self.token {
            let expected = format!("Bearer {token}");
            let given = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
            if given != Some(expected.as_str()) {
                return Err((StatusCode::UNAUTHORIZED, "missing or invalid token").into_response());
            }
        }
        let value = serde_json::from_slice(body).unwrap_or(Value::Null);
        self.requests
            .lock()
            .unwrap()
            .push((uri.path().to_string(), value));
        Ok(())
    }
}

pub struct TestServer {
    pub base_url: String,
    shared: Shared,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::spawn(Shared::default()).await
    }

    pub async fn start_with_token(token: &str) -> Self {
        Self::spawn(Shared {
            token: Some(token.to_string()),
            ..Shared::default()
        })
        .await
    }

    async fn spawn(shared: Shared) -> Self {
        *shared.balance_body.lock().unwrap() = json!({ "balance": 42 }).to_string();
        let router = Router::new()
            .route("/api/sessions/resume", post(resume))
            .route("/api/sessions/{sid}/messages", post(append))
            .route("/api/messages/{id}", patch(mutate_message).delete(mutate_message))
            .route(
                "/api/sessions/{sid}/turns/{turn_id}/regenerate",
                post(regenerate),
            )
            .route("/api/turns/{turn_id}/active", put(set_active))
            .route("/api/balance", get(balance))
            .with_state(shared.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}/api"),
            shared,
        }
    }

    /// Replace the raw body served by `GET /balance`.
    pub fn set_balance_body(&self, body: &str) {
        *self.shared.balance_body.lock().unwrap() = body.to_string();
    }

    pub fn last_path(&self) -> String {
        self.shared
            .requests
            .lock()
            .unwrap()
            .last()
            .map(|(path, _)| path.clone())
            .unwrap_or_default()
    }

    pub fn last_body(&self) -> Value {
        self.shared
            .requests
            .lock()
            .unwrap()
            .last()
            .map(|(_, body)| body.clone())
            .unwrap_or(Value::Null)
    }
}

pub fn client_for(server: &TestServer, token: Option<SecretString>) -> RestClient {
    let config = ServerConfig {
        base_url: server.base_url.clone(),
        timeout_secs: 5,
        ..ServerConfig::default()
    };
    RestClient::new(&config, token).unwrap()
}

async fn resume(State(s): State<Shared>, headers: HeaderMap, uri: Uri, body: Bytes) -> Response {
    if let Err(rejection) = s.record(&headers, &uri, &body) {
        return rejection;
    }
    axum::Json(SessionSnapshot {
        session_id: SessionId::new(),
        note: Some("scene: tavern".to_string()),
        messages: vec![
            Message::user(MessageId(1), "Hi"),
            Message::model(MessageId(2), MessageId(1), 1, false, "Hello!"),
            Message::model(MessageId(3), MessageId(1), 2, true, "Hey there!"),
        ],
    })
    .into_response()
}

async fn append(
    State(s): State<Shared>,
    Path(_sid): Path<String>,
    headers: HeaderMap,
    uri: Uri,
    body: Bytes,
) -> Response {
    if let Err(rejection) = s.record(&headers, &uri, &body) {
        return rejection;
    }
    axum::Json(AppendMessageResponse {
        new_messages: vec![
            Message::user(MessageId(10), "Hello"),
            Message::model(MessageId(11), MessageId(10), 1, true, "Hi!"),
        ],
    })
    .into_response()
}

async fn mutate_message(
    State(s): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    uri: Uri,
    body: Bytes,
) -> Response {
    if let Err(rejection) = s.record(&headers, &uri, &body) {
        return rejection;
    }
    match id {
        404 => StatusCode::NOT_FOUND.into_response(),
        500 => (StatusCode::INTERNAL_SERVER_ERROR, "store unavailable").into_response(),
        _ => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn regenerate(
    State(s): State<Shared>,
    Path((_sid, turn_id)): Path<(String, i64)>,
    headers: HeaderMap,
    uri: Uri,
    body: Bytes,
) -> Response {
    if let Err(rejection) = s.record(&headers, &uri, &body) {
        return rejection;
    }
    if turn_id == 999 {
        return (StatusCode::OK, "<html>not json</html>").into_response();
    }
    axum::Json(RegenerateResponse {
        new_message: Message::model(MessageId(12), MessageId(turn_id), 3, true, "Another take"),
    })
    .into_response()
}

async fn set_active(
    State(s): State<Shared>,
    Path(_turn_id): Path<i64>,
    headers: HeaderMap,
    uri: Uri,
    body: Bytes,
) -> Response {
    if let Err(rejection) = s.record(&headers, &uri, &body) {
        return rejection;
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn balance(State(s): State<Shared>, headers: HeaderMap, uri: Uri) -> Response {
    if let Err(rejection) = s.record(&headers, &uri, &Bytes::new()) {
        return rejection;
    }
    let body = s.balance_body.lock().unwrap().clone();
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}
