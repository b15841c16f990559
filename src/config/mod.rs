use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_server_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_notifications() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the capability server
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Desktop notifications for one-shot CLI commands
    #[serde(default = "default_notifications")]
    pub notifications: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            notifications: default_notifications(),
        }
    }
}

impl AppConfig {
    /// Get the config file path
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("capboard");

        if let Err(e) = std::fs::create_dir_all(&config_dir) {
            tracing::warn!("Could not create config directory: {}", e);
        }

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        let path = match Self::config_path() {
            Ok(p) => p,
            Err(_) => return Ok(AppConfig::default()),
        };

        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!("Failed to parse config: {}", e),
                },
                Err(e) => tracing::warn!("Failed to read config: {}", e),
            }
        }

        let config = AppConfig::default();
        let _ = config.save();
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig {
            server_url: "http://capabilities.internal:9000".to_string(),
            notifications: false,
        };

        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&serialized).unwrap();

        assert_eq!(config.server_url, deserialized.server_url);
        assert_eq!(config.notifications, deserialized.notifications);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.server_url, "http://127.0.0.1:8000");
        assert!(config.notifications);
    }
}
