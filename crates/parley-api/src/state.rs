//! Application state wiring the conversation ports together.
//!
//! The controller is generic over its sync, budget and preference ports;
//! AppState pins them to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use parley_core::conversation::{ConversationController, SessionRequest};
use parley_infra::config::{load_config, resolve_data_dir};
use parley_infra::sqlite::pool::DatabasePool;
use parley_infra::sqlite::preference::SqlitePreferenceStore;
use parley_infra::sync::{HttpBudgetGate, HttpConversationSync, RestClient};
use parley_types::config::ParleyConfig;

/// Concrete controller type pinned to infra implementations.
pub type ConcreteController =
    ConversationController<HttpConversationSync, HttpBudgetGate, SqlitePreferenceStore>;

/// Shared application state for CLI commands.
#[derive(Clone)]
pub struct AppState {
    pub config: ParleyConfig,
    pub data_dir: PathBuf,
    pub sync: Arc<HttpConversationSync>,
    pub budget: HttpBudgetGate,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: load config, connect to DB, build clients.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_config(&data_dir).await;
        let db_pool = DatabasePool::open(&data_dir).await?;

        let client = RestClient::from_config(&config.server)?;
        tracing::debug!(base_url = client.base_url(), "conversation server configured");

        Ok(Self {
            sync: Arc::new(HttpConversationSync::new(client.clone())),
            budget: HttpBudgetGate::new(client),
            config,
            data_dir,
            db_pool,
        })
    }

    /// Resume or create a session and wrap it in a controller.
    pub async fn open_conversation(
        &self,
        request: SessionRequest,
    ) -> anyhow::Result<ConcreteController> {
        let controller = ConversationController::open(
            Arc::clone(&self.sync),
            self.budget.clone(),
            SqlitePreferenceStore::new(self.db_pool.clone()),
            &self.config,
            request,
        )
        .await?;
        Ok(controller)
    }
}
