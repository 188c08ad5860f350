//! Runtime configuration.
//!
//! The configuration is a TOML file with one table per concern. Every table
//! and every field is optional; missing entries take their defaults.
//!
//! ```toml
//! [events]
//! warn_on_unhandled = true
//! log_listener_failures = true
//!
//! [cause_stack]
//! max_frame_depth = 256
//!
//! [logging]
//! level = "info"
//! json_format = false
//! ```

use anyhow::Result;
use lodestone_event::EventManagerSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Event dispatch settings
    pub events: EventManagerSettings,
    /// Cause stack limits
    pub cause_stack: CauseStackSettings,
    /// Logging configuration settings
    pub logging: LoggingSettings,
}

/// Limits applied to every cause stack created by the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CauseStackSettings {
    /// Maximum number of nested frames, `0` for no limit
    pub max_frame_depth: usize,
}

impl Default for CauseStackSettings {
    fn default() -> Self {
        Self {
            max_frame_depth: 256,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Loads the configuration at `path`.
///
/// When the file does not exist, the default configuration is written there
/// and returned.
pub async fn load_config(path: &Path) -> Result<GameConfig> {
    if path.exists() {
        let config_str = tokio::fs::read_to_string(path).await?;
        match toml::de::from_str::<GameConfig>(&config_str) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("Failed to parse config file {}: {}", path.display(), e);
                Err(e.into())
            }
        }
    } else {
        warn!("Configuration file not found: {}, using defaults", path.display());

        let default_config = GameConfig::default();
        let config_str = toml::to_string_pretty(&default_config)?;
        tokio::fs::write(path, config_str).await?;
        info!("Created default configuration file: {}", path.display());

        Ok(default_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_load_config_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lodestone.toml");

        let config = load_config(&path).await.unwrap();
        assert_eq!(config, GameConfig::default());
        assert_eq!(config.cause_stack.max_frame_depth, 256);

        // The default file was written and parses back to the same config
        assert!(path.exists());
        let reloaded = load_config(&path).await.unwrap();
        assert_eq!(reloaded, config);
    }

    #[tokio::test]
    async fn test_load_config_existing() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let config_content = r#"
[events]
warn_on_unhandled = false
log_listener_failures = true

[cause_stack]
max_frame_depth = 8

[logging]
level = "debug"
json_format = true
        "#;
        temp_file.write_all(config_content.as_bytes()).unwrap();

        let config = load_config(temp_file.path()).await.unwrap();
        assert!(!config.events.warn_on_unhandled);
        assert_eq!(config.cause_stack.max_frame_depth, 8);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
    }

    #[tokio::test]
    async fn test_partial_config_uses_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[logging]\nlevel = \"warn\"\n").unwrap();

        let config = load_config(temp_file.path()).await.unwrap();
        assert_eq!(config.logging.level, "warn");
        assert!(!config.logging.json_format);
        assert_eq!(config.events, EventManagerSettings::default());
        assert_eq!(config.cause_stack, CauseStackSettings::default());
    }

    #[tokio::test]
    async fn test_malformed_config_is_an_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[cause_stack]\nmax_frame_depth = \"deep\"\n").unwrap();

        assert!(load_config(temp_file.path()).await.is_err());
    }
}
