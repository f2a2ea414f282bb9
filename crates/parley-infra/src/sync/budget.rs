//! HttpBudgetGate -- REST implementation of [`BudgetGate`].
//!
//! Reads the balance with `GET {base}/balance`. Charges are applied by the
//! server when a send succeeds, so nothing is written here.

use parley_core::budget::BudgetGate;
use parley_types::config::ServerConfig;
use parley_types::error::{BudgetError, SyncError};
use reqwest::Method;

use super::client::RestClient;
use super::wire::BalanceResponse;

#[derive(Clone)]
pub struct HttpBudgetGate {
    client: RestClient,
}

impl HttpBudgetGate {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, SyncError> {
        Ok(Self::new(RestClient::from_config(config)?))
    }
}

impl BudgetGate for HttpBudgetGate {
    async fn balance(&self) -> Result<u32, BudgetError> {
        let request = self.client.request(Method::GET, "balance");
        let response: BalanceResponse = self
            .client
            .send_json(request)
            .await
            .map_err(|e| match e {
                SyncError::Decode(message) => BudgetError::Decode(message),
                other => BudgetError::Unavailable(other.to_string()),
            })?;
        tracing::debug!(balance = response.balance, "balance fetched");
        Ok(response.balance)
    }
}
