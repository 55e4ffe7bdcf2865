//! Configuration loading and management for pinscout.
//!
//! Loads settings from `pinscout.toml` with environment variable overrides for sensitive data.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file name looked up in the current directory and `~/.config/pinscout/`
const CONFIG_FILE: &str = "pinscout.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("missing required API key for provider: {0}")]
    MissingApiKey(String),
    #[error("unsupported LLM provider: {0}")]
    UnsupportedProvider(String),
    #[error("invalid config value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// LLM provider. Only "gemini" offers search grounding.
    pub provider: String,
    /// Model identifier (e.g., "gemini-2.5-flash")
    pub model: String,
    /// System persona for the agent
    pub persona: String,
}

/// API access configuration (key loaded from environment)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub gemini_key: Option<String>,
    /// Base URL of the Generative Language API
    pub endpoint: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// Search behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Businesses requested per call. A call returning exactly this many
    /// is taken as a hint that more results exist.
    pub page_size: usize,
    /// Country appended to the location in the prompt
    pub country: String,
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

impl Config {
    /// Load configuration from the default location (pinscout.toml in cwd or home).
    ///
    /// Falls back to built-in defaults when no config file exists.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::find_config_file() {
            Some(path) => Self::load_from(&path),
            None => {
                let mut config = Config::default();
                config.apply_env();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env();
        config.validate()?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Override API keys from environment variables
    fn apply_env(&mut self) {
        if let Some(key) = env_key() {
            self.api.gemini_key = Some(key);
        }
    }

    /// Reject values the search loop cannot work with
    fn validate(&self) -> Result<(), ConfigError> {
        if self.search.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "search.page_size",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        // Check current directory first
        let local_config = PathBuf::from(CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }

        // Check home directory
        let home_config = dirs::home_dir()?
            .join(".config")
            .join("pinscout")
            .join(CONFIG_FILE);
        home_config.exists().then_some(home_config)
    }

    /// Get the API key for the configured provider
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        match self.agent.provider.as_str() {
            "gemini" => self
                .api
                .gemini_key
                .as_deref()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingApiKey("gemini".to_string())),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// `GEMINI_API_KEY` wins over the generic `API_KEY`
fn env_key() -> Option<String> {
    ["GEMINI_API_KEY", "API_KEY"]
        .into_iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            persona: "You are a meticulous local business directory assistant. \
                      Only list businesses you can verify through search."
                .to_string(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            gemini_key: None,
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            timeout_secs: 120,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: 30,
            country: "India".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.agent.provider, "gemini");
        assert_eq!(config.search.page_size, 30);
        assert_eq!(config.search.country, "India");
        assert_eq!(config.api.timeout_secs, 120);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[agent]
model = "gemini-2.5-pro"

[search]
page_size = 20
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.agent.model, "gemini-2.5-pro");
        assert_eq!(config.agent.provider, "gemini");
        assert_eq!(config.search.page_size, 20);
        assert_eq!(config.search.country, "India");
        assert_eq!(
            config.api.endpoint,
            "https://generativelanguage.googleapis.com"
        );
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[search\npage_size = ").unwrap();
        assert!(matches!(
            Config::load_from(file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[search]\npage_size = 0").unwrap();
        assert!(matches!(
            Config::load_from(file.path()),
            Err(ConfigError::InvalidValue { key: "search.page_size", .. })
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::load_from(&dir.path().join("absent.toml")),
            Err(ConfigError::ReadError(_))
        ));
    }

    #[test]
    fn api_key_requires_supported_provider_and_key() {
        let mut config = Config::default();
        config.api.gemini_key = None;
        assert!(matches!(
            config.api_key(),
            Err(ConfigError::MissingApiKey(_))
        ));

        config.api.gemini_key = Some("   ".to_string());
        assert!(matches!(
            config.api_key(),
            Err(ConfigError::MissingApiKey(_))
        ));

        config.api.gemini_key = Some("secret".to_string());
        assert_eq!(config.api_key().unwrap(), "secret");

        config.agent.provider = "openai".to_string();
        assert!(matches!(
            config.api_key(),
            Err(ConfigError::UnsupportedProvider(p)) if p == "openai"
        ));
    }
}
