//! Loading and saving the account configuration file.

use std::path::{Path, PathBuf};

use super::model::AccountConfig;
use super::validation::validate_account;
use crate::{Error, Result};

/// Environment variable overriding the default configuration path.
pub const CONFIG_ENV_VAR: &str = "POPLEDGER_CONFIG";

/// Returns the configuration path.
///
/// Uses `$POPLEDGER_CONFIG` when set, otherwise
/// `<config dir>/popledger/config.json`.
#[must_use]
pub fn default_config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("popledger")
        .join("config.json")
}

/// Reads and validates an account configuration.
///
/// # Errors
///
/// Returns `Error::Config` if the file is missing, malformed or fails
/// validation.
pub async fn load_config(path: &Path) -> Result<AccountConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::Config(format!("Cannot read {}: {e}", path.display())))?;

    let config: AccountConfig = serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid {}: {e}", path.display())))?;

    if let Err(errors) = validate_account(&config) {
        let reasons: Vec<String> = errors
            .iter()
            .map(|e| format!("{}: {e}", e.field()))
            .collect();
        return Err(Error::Config(reasons.join("; ")));
    }

    tracing::debug!(path = %path.display(), config = ?config, "Loaded account configuration");
    Ok(config)
}

/// Writes an account configuration as pretty JSON, creating parent
/// directories as needed.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub async fn save_config(path: &Path, config: &AccountConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_string_pretty(config)?;
    tokio::fs::write(path, content).await?;
    Ok(())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("popledger-config-{}-{name}", std::process::id()))
            .join("config.json")
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let path = scratch("roundtrip");
        let config = AccountConfig::new("pop.example.com", "alice", "secret");

        save_config(&path, &config).await.unwrap();
        let loaded = load_config(&path).await.unwrap();
        assert_eq!(loaded, config);

        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }

    #[tokio::test]
    async fn test_missing_file_is_config_error() {
        let result = load_config(Path::new("/nonexistent/popledger/config.json")).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_invalid_config_lists_fields() {
        let path = scratch("invalid");
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, r#"{"host": "", "username": "alice", "password": ""}"#)
            .await
            .unwrap();

        let Err(Error::Config(message)) = load_config(&path).await else {
            panic!("expected config error");
        };
        assert!(message.contains("host"));
        assert!(message.contains("password"));

        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }
}
