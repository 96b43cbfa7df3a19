//! Configuration management for gemchat.
//!
//! Configuration is loaded from `~/.config/gemchat/config.toml`. The Gemini
//! API key is never stored in the file; it comes from the `GEMINI_API_KEY`
//! environment variable and its absence is a fatal startup error.

use crate::error::GemchatError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,
}

/// Settings for the Gemini completion API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name (default: gemini-1.5-flash).
    #[serde(default = "default_model")]
    pub name: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Upper bound on tool-call cycles within one user turn.
    #[serde(default = "default_max_tool_cycles")]
    pub max_tool_cycles: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            temperature: default_temperature(),
            max_tool_cycles: default_max_tool_cycles(),
        }
    }
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tool_cycles() -> u32 {
    4
}

impl Config {
    /// Get the config directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("gemchat"))
            .context("Could not determine config directory")
    }

    /// Get the config file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the socket path for tool server communication.
    pub fn socket_path() -> Result<PathBuf> {
        Self::runtime_path("gemchat.sock")
    }

    /// Get the PID file path for the tool server.
    pub fn pid_path() -> Result<PathBuf> {
        Self::runtime_path("gemchat.pid")
    }

    /// Get the startup status file path, used while the server boots.
    pub fn startup_status_path() -> Result<PathBuf> {
        Self::runtime_path("gemchat.startup")
    }

    // Prefer XDG_RUNTIME_DIR, fall back to ~/.local/run
    fn runtime_path(file_name: &str) -> Result<PathBuf> {
        if let Some(runtime_dir) = std::env::var_os("XDG_RUNTIME_DIR") {
            Ok(PathBuf::from(runtime_dir).join(file_name))
        } else {
            dirs::home_dir()
                .map(|p| p.join(".local/run").join(file_name))
                .context("Could not determine home directory")
        }
    }

    /// Load configuration from file, using defaults if not found.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Read the Gemini API key from the environment. Checked before the chat
    /// loop starts so a missing credential never reaches a network call.
    pub fn api_key() -> Result<String, GemchatError> {
        match std::env::var(API_KEY_VAR) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(GemchatError::Configuration(format!(
                "{} not set. Export your Gemini API key before starting a chat.",
                API_KEY_VAR
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.name, "gemini-1.5-flash");
        assert_eq!(config.model.max_tool_cycles, 4);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("gemini-1.5-flash"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
[model]
name = "gemini-1.5-pro"
temperature = 0.7
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.model.name, "gemini-1.5-pro");
        assert_eq!(config.model.temperature, 0.7);
        // Unspecified fields fall back to defaults
        assert_eq!(config.model.max_tool_cycles, 4);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.model.name, "gemini-1.5-flash");
    }

    // Single test for all key states so the shared env var is not mutated
    // from concurrent tests.
    #[test]
    fn test_api_key_from_environment() {
        std::env::remove_var(API_KEY_VAR);
        let err = Config::api_key().unwrap_err();
        assert!(matches!(err, GemchatError::Configuration(_)));
        assert!(err.is_fatal());

        std::env::set_var(API_KEY_VAR, "   ");
        assert!(Config::api_key().is_err());

        std::env::set_var(API_KEY_VAR, "test-key");
        assert_eq!(Config::api_key().unwrap(), "test-key");
        std::env::remove_var(API_KEY_VAR);
    }
}
