//! Configuration loading, validation, and management for Switchboard.
//!
//! Loads configuration from `~/.switchboard/config.toml` (or an explicit
//! path) with environment variable overrides. Validates all settings at
//! startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use switchboard_core::ProfileDefaults;

/// Built-in persona ids that cannot be deleted unless the config says otherwise.
pub const DEFAULT_PROTECTED_AGENTS: [&str; 4] = [
    "friendly-agent",
    "professional-agent",
    "support-agent",
    "default-agent",
];

pub const DEFAULT_APOLOGY: &str =
    "Sorry, I encountered an error processing your message. Please try again.";

/// The root configuration structure.
///
/// Maps directly to `~/.switchboard/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default)]
    pub provider: ProviderConfig,

    /// Model parameters for agents created without explicit values
    #[serde(default)]
    pub agent_defaults: AgentDefaultsConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub router: RouterConfig,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("agent_defaults", &self.agent_defaults)
            .field("store", &self.store)
            .field("history", &self.history)
            .field("router", &self.router)
            .field("timeouts", &self.timeouts)
            .field("tools", &self.tools)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Label used in logs (e.g., "openai")
    #[serde(default = "default_provider_name")]
    pub name: String,

    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_provider_name() -> String {
    "openai".into()
}
fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            api_url: default_api_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefaultsConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    800
}

impl Default for AgentDefaultsConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl AgentDefaultsConfig {
    pub fn to_profile_defaults(&self) -> ProfileDefaults {
        ProfileDefaults {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// SQLite file; defaults to `~/.switchboard/switchboard.db`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn db_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("switchboard.db"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Turns replayed into each prompt
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,

    /// Age after which `cleanup` removes turns
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_recent_limit() -> usize {
    10
}
fn default_retention_days() -> u32 {
    30
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            recent_limit: default_recent_limit(),
            retention_days: default_retention_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// The router's own address on the transport. Messages sent to any
    /// other address are ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Create missing built-in personas on startup
    #[serde(default)]
    pub bootstrap_builtins: bool,

    #[serde(default = "default_protected_agents")]
    pub protected_agents: Vec<String>,

    /// Agent that answers senders nobody claims
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_agent: Option<String>,

    /// Handle one message at a time per sender
    #[serde(default)]
    pub serialize_per_sender: bool,

    /// Reply sent when an agent fails
    #[serde(default = "default_apology")]
    pub apology_message: String,
}

fn default_protected_agents() -> Vec<String> {
    DEFAULT_PROTECTED_AGENTS.iter().map(|s| s.to_string()).collect()
}
fn default_apology() -> String {
    DEFAULT_APOLOGY.into()
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            address: None,
            bootstrap_builtins: false,
            protected_agents: default_protected_agents(),
            fallback_agent: None,
            serialize_per_sender: false,
            apology_message: default_apology(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// HTTP timeout for model requests
    #[serde(default = "default_request_secs")]
    pub request_secs: u64,

    /// Per-call bound on provider and history calls inside an agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_secs: Option<u64>,
}

fn default_request_secs() -> u64 {
    120
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: default_request_secs(),
            call_secs: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// JSON file backing the `query_knowledge_base` tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_base_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.switchboard/config.toml).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(None)
    }

    /// Load from `path`, or the default path when `None`, then apply
    /// environment overrides:
    /// - `SWITCHBOARD_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `SWITCHBOARD_MODEL`
    /// - `SWITCHBOARD_API_URL`
    /// - `SWITCHBOARD_DB`
    pub fn load_with(path: Option<&Path>) -> Result<Self, ConfigError> {
        let default_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(path.unwrap_or(&default_path))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("SWITCHBOARD_API_KEY").or_else(|| non_empty("OPENAI_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(model) = non_empty("SWITCHBOARD_MODEL") {
            self.agent_defaults.model = model;
        }
        if let Some(url) = non_empty("SWITCHBOARD_API_URL") {
            self.provider.api_url = url;
        }
        if let Some(db) = non_empty("SWITCHBOARD_DB") {
            self.store.path = Some(PathBuf::from(db));
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".switchboard")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let defaults = &self.agent_defaults;
        if !(0.0..=1.0).contains(&defaults.temperature) {
            return Err(ConfigError::ValidationError(
                "agent_defaults.temperature must be between 0.0 and 1.0".into(),
            ));
        }
        if defaults.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "agent_defaults.max_tokens must be > 0".into(),
            ));
        }
        if defaults.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "agent_defaults.model must not be empty".into(),
            ));
        }
        if self.provider.api_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "provider.api_url must not be empty".into(),
            ));
        }
        if self.history.recent_limit == 0 {
            return Err(ConfigError::ValidationError(
                "history.recent_limit must be > 0".into(),
            ));
        }
        if self.timeouts.request_secs == 0 || self.timeouts.call_secs == Some(0) {
            return Err(ConfigError::ValidationError(
                "timeouts must be > 0 seconds".into(),
            ));
        }
        if self.router.apology_message.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "router.apology_message must not be empty".into(),
            ));
        }
        if let Some(fallback) = &self.router.fallback_agent {
            if fallback.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "router.fallback_agent must not be blank when set".into(),
                ));
            }
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: ProviderConfig::default(),
            agent_defaults: AgentDefaultsConfig::default(),
            store: StoreConfig::default(),
            history: HistoryConfig::default(),
            router: RouterConfig::default(),
            timeouts: TimeoutConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.agent_defaults.model, "gpt-4o-mini");
        assert_eq!(config.history.recent_limit, 10);
        assert_eq!(config.history.retention_days, 30);
        assert_eq!(config.timeouts.request_secs, 120);
        assert!(!config.router.bootstrap_builtins);
        assert!(config.router.fallback_agent.is_none());
        assert_eq!(config.router.protected_agents.len(), 4);
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
    }

    #[test]
    fn config_roundtrip_toml() {
        let toml_str = AppConfig::default_toml();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider.api_url, "https://api.openai.com/v1");
        assert_eq!(parsed.router.apology_message, DEFAULT_APOLOGY);
        assert!(toml_str.contains("[router]"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let toml_str = r#"
[agent_defaults]
model = "gpt-4o"

[store]
backend = "memory"

[router]
fallback_agent = "default-agent"
serialize_per_sender = true

[timeouts]
call_secs = 30
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.agent_defaults.model, "gpt-4o");
        assert_eq!(config.agent_defaults.max_tokens, 800);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.router.fallback_agent.as_deref(), Some("default-agent"));
        assert!(config.router.serialize_per_sender);
        assert_eq!(config.timeouts.call_secs, Some(30));
        assert_eq!(config.timeouts.request_secs, 120);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.agent_defaults.temperature = 1.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.history.recent_limit = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.timeouts.call_secs = Some(0);
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.router.apology_message = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.provider.name, "openai");
    }

    #[test]
    fn load_from_file_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[agent_defaults]\nmax_tokens = 0\n").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[router\nbootstrap_builtins = yes").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_take_priority() {
        let env: HashMap<&str, &str> = [
            ("SWITCHBOARD_API_KEY", "sb-key"),
            ("OPENAI_API_KEY", "oa-key"),
            ("SWITCHBOARD_MODEL", "gpt-4.1"),
            ("SWITCHBOARD_DB", "/var/lib/switchboard.db"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_key.as_deref(), Some("sb-key"));
        assert_eq!(config.agent_defaults.model, "gpt-4.1");
        assert_eq!(config.store.db_path(), PathBuf::from("/var/lib/switchboard.db"));

        let mut config = AppConfig::default();
        config.apply_overrides(|k| (k == "OPENAI_API_KEY").then(|| "oa-key".to_string()));
        assert_eq!(config.api_key.as_deref(), Some("oa-key"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("[REDACTED]"));
    }

    #[test]
    fn profile_defaults_follow_config() {
        let mut config = AppConfig::default();
        config.agent_defaults.temperature = 0.3;
        let defaults = config.agent_defaults.to_profile_defaults();
        assert_eq!(defaults.temperature, 0.3);
        assert_eq!(defaults.max_tokens, 800);
    }
}
