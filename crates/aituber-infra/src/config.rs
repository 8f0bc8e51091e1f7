//! Configuration loader for AITuber.
//!
//! Reads `config.toml` (from `AITUBER_CONFIG_PATH` or the data directory)
//! into [`AppConfig`]. The lenient loader falls back to defaults when the
//! file is missing or malformed; the strict loader reports why.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use aituber_types::config::{AppConfig, LlmConfig};
use aituber_types::error::ConfigError;

/// Resolve the config file path.
///
/// Priority:
/// 1. `AITUBER_CONFIG_PATH` environment variable
/// 2. `{data_dir}/config.toml`
pub fn resolve_config_path(data_dir: &Path) -> PathBuf {
    match std::env::var("AITUBER_CONFIG_PATH") {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => data_dir.join("config.toml"),
    }
}

/// Load configuration from `path`.
///
/// - If the file does not exist, returns [`AppConfig::default()`].
/// - If the file exists but fails to read or parse, logs a warning and returns the default.
pub async fn load_config(path: &Path) -> AppConfig {
    match load_config_strict(path).await {
        Ok(config) => config,
        Err(ConfigError::NotFound { .. }) => {
            tracing::debug!("No config found at {}, using defaults", path.display());
            AppConfig::default()
        }
        Err(err) => {
            tracing::warn!("{err}, using defaults");
            AppConfig::default()
        }
    }
}

/// Load configuration from `path`, reporting read and parse failures.
pub async fn load_config_strict(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path).await.map_err(|err| {
        let path = path.display().to_string();
        if err.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound { path }
        } else {
            ConfigError::Read {
                path,
                message: err.to_string(),
            }
        }
    })?;

    toml::from_str::<AppConfig>(&content).map_err(|err| ConfigError::Parse {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

/// Read the API key from the environment variable named by `llm.api_key_env`.
///
/// Empty values count as unset.
pub fn resolve_api_key(llm: &LlmConfig) -> Option<SecretString> {
    match std::env::var(&llm.api_key_env) {
        Ok(value) if !value.trim().is_empty() => Some(SecretString::from(value)),
        _ => None,
    }
}
