//! Configuration loader for Parley.
//!
//! Reads `config.toml` from the data directory (`~/.parley/` by default) and
//! deserializes it into [`ParleyConfig`]. Falls back to defaults when the
//! file is missing or malformed.

use std::path::{Path, PathBuf};

use parley_types::config::ParleyConfig;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "PARLEY_DATA_DIR";

/// Resolve the data directory: `PARLEY_DATA_DIR`, else `~/.parley`.
pub fn resolve_data_dir() -> PathBuf {
    data_dir_from(std::env::var_os(DATA_DIR_ENV).map(PathBuf::from), dirs::home_dir())
}

fn data_dir_from(explicit: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    explicit
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| home.unwrap_or_else(|| PathBuf::from(".")).join(".parley"))
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// - Missing file: returns [`ParleyConfig::default()`].
/// - Unreadable or unparsable file: logs a warning and returns the default.
pub async fn load_config(data_dir: &Path) -> ParleyConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return ParleyConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return ParleyConfig::default();
        }
    };

    match toml::from_str::<ParleyConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            ParleyConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::budget::BoostMultiplier;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).await;
        assert_eq!(config.server.base_url, "http://127.0.0.1:8787/api");
        assert_eq!(config.costs.total_cost(BoostMultiplier::Boost3), 3);
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
[server]
base_url = "https://parley.example.com/api"
token_env = "MY_TOKEN"

[version_sync]
max_attempts = 6
"#,
        )
        .await
        .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.server.base_url, "https://parley.example.com/api");
        assert_eq!(config.server.token_env, "MY_TOKEN");
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.version_sync.max_attempts, 6);
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.version_sync.max_attempts, 4);
    }

    #[test]
    fn data_dir_prefers_explicit_path() {
        let dir = data_dir_from(Some(PathBuf::from("/srv/parley")), Some(PathBuf::from("/home/a")));
        assert_eq!(dir, PathBuf::from("/srv/parley"));
    }

    #[test]
    fn data_dir_falls_back_to_home() {
        let dir = data_dir_from(Some(PathBuf::new()), Some(PathBuf::from("/home/a")));
        assert_eq!(dir, PathBuf::from("/home/a/.parley"));
        assert_eq!(data_dir_from(None, None), PathBuf::from("./.parley"));
    }
}
