//! Global configuration types for Parley.
//!
//! `ParleyConfig` represents the top-level `config.toml` that controls the
//! remote server endpoint, send pricing, the version-sync retry policy and
//! the conversation event buffer.

use serde::{Deserialize, Serialize};

use crate::budget::CostTable;

/// Top-level configuration for Parley.
///
/// Loaded from `~/.parley/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Point pricing for sends.
    #[serde(default)]
    pub costs: CostTable,

    #[serde(default)]
    pub version_sync: VersionSyncConfig,

    #[serde(default)]
    pub events: EventsConfig,
}

/// Remote conversation server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the REST API (no trailing slash required).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Environment variable holding the bearer token, if any.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8787/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_token_env() -> String {
    "PARLEY_API_TOKEN".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            token_env: default_token_env(),
        }
    }
}

/// Retry policy for best-effort active-version persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSyncConfig {
    /// Attempts per selection, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    4
}

fn default_initial_backoff_ms() -> u64 {
    250
}

fn default_max_backoff_ms() -> u64 {
    4_000
}

impl Default for VersionSyncConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl VersionSyncConfig {
    /// Backoff to wait after the given failed attempt (1-based).
    ///
    /// Doubles from `initial_backoff_ms` and is capped at `max_backoff_ms`.
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        let shift = attempt.saturating_sub(1).min(20);
        self.initial_backoff_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_backoff_ms)
    }
}

/// Buffering of conversation events between the controller and front ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Events a slow subscriber may fall behind before it starts losing them.
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

fn default_event_capacity() -> usize {
    256
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::BoostMultiplier;

    #[test]
    fn test_config_default_values() {
        let config = ParleyConfig::default();
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.costs.total_cost(BoostMultiplier::Boost5), 5);
        assert_eq!(config.version_sync.max_attempts, 4);
    }

    #[test]
    fn test_config_deserialize_with_defaults() {
        let config: ParleyConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.base_url, "http://127.0.0.1:8787/api");
        assert_eq!(config.costs.base_cost, 1);
        assert_eq!(config.version_sync.initial_backoff_ms, 250);
        assert_eq!(config.events.capacity, 256);
    }

    #[test]
    fn test_config_deserialize_with_values() {
        let toml_str = r#"
[server]
base_url = "https://chat.example.com/api"
timeout_secs = 5

[costs]
base_cost = 3

[[costs.boost]]
multiplier = 1.5
extra_cost = 10

[version_sync]
max_attempts = 2

[events]
capacity = 32
"#;
        let config: ParleyConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.base_url, "https://chat.example.com/api");
        assert_eq!(config.server.timeout_secs, 5);
        assert_eq!(config.server.token_env, "PARLEY_API_TOKEN");
        assert_eq!(config.costs.total_cost(BoostMultiplier::Boost1_5), 13);
        assert_eq!(config.costs.total_cost(BoostMultiplier::Boost3), 3);
        assert_eq!(config.version_sync.max_attempts, 2);
        assert_eq!(config.version_sync.max_backoff_ms, 4_000);
        assert_eq!(config.events.capacity, 32);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = VersionSyncConfig {
            max_attempts: 10,
            initial_backoff_ms: 100,
            max_backoff_ms: 700,
        };
        assert_eq!(policy.backoff_ms(1), 100);
        assert_eq!(policy.backoff_ms(2), 200);
        assert_eq!(policy.backoff_ms(3), 400);
        assert_eq!(policy.backoff_ms(4), 700);
        assert_eq!(policy.backoff_ms(60), 700);
    }
}
