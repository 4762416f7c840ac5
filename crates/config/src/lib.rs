//! Configuration loading, validation, and management for toolpilot.
//!
//! Loads configuration from `~/.toolpilot/config.toml` with environment
//! variable overrides. Validates all settings at startup; there is no
//! hot reload.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File name of the conversation store inside its directory.
pub const STORE_FILE_NAME: &str = "conversations.sqlite";

/// The root configuration structure.
///
/// Maps directly to `~/.toolpilot/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model endpoint settings
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Web search backend settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Conversation store and recall settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Orchestrator settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Verbose diagnostics
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_embed_model")]
    pub embed_model: String,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_ollama_url() -> String {
    "http://127.0.0.1:11434".into()
}
fn default_model() -> String {
    "llama3.1".into()
}
fn default_embed_model() -> String {
    "nomic-embed-text".into()
}
fn default_request_timeout() -> u64 {
    120
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            model: default_model(),
            embed_model: default_embed_model(),
            temperature: 0.0,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Which web search backend answers the `search` tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProviderKind {
    #[default]
    Searxng,
    Tavily,
}

impl SearchProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Searxng => "searxng",
            Self::Tavily => "tavily",
        }
    }
}

impl FromStr for SearchProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "searxng" => Ok(Self::Searxng),
            "tavily" => Ok(Self::Tavily),
            other => Err(format!("unknown search provider '{other}' (expected searxng or tavily)")),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub provider: SearchProviderKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub searxng_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tavily_api_key: Option<String>,

    #[serde(default = "default_results_limit")]
    pub results_limit: usize,
}

fn default_results_limit() -> usize {
    5
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("provider", &self.provider)
            .field("searxng_url", &self.searxng_url)
            .field("tavily_api_key", &redact(&self.tavily_api_key))
            .field("results_limit", &self.results_limit)
            .finish()
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: SearchProviderKind::default(),
            searxng_url: None,
            tavily_api_key: None,
            results_limit: default_results_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Recall and persist past exchanges
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// SQLite file; defaults to `~/.toolpilot/conversations.sqlite`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,

    /// How many past exchanges to recall per turn
    #[serde(default = "default_n_contexts")]
    pub n_contexts: usize,

    /// Minimum cosine similarity for a recalled exchange
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
}

fn default_true() -> bool {
    true
}
fn default_n_contexts() -> usize {
    3
}
fn default_similarity_threshold() -> f32 {
    0.7
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            store_path: None,
            n_contexts: default_n_contexts(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model calls that may request tools within one turn
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// How many recent session turns are sent with each request
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,

    /// Replaces the built-in instructions when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_max_iterations() -> usize {
    5
}
fn default_history_window() -> usize {
    10
}
fn default_tool_timeout() -> u64 {
    60
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            history_window: default_history_window(),
            tool_timeout_secs: default_tool_timeout(),
            system_prompt: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.toolpilot/config.toml),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_path())
    }

    /// Load configuration from `path`, then apply environment overrides:
    /// - `OLLAMA_URL`, `OLLAMA_MODEL`, `EMBED_MODEL`
    /// - `SEARCH_PROVIDER`, `SEARXNG_URL`, `TAVILY_API_KEY`, `SEARCH_RESULTS_LIMIT`
    /// - `DB_DIR`, `N_CONTEXTS`, `SIMILARITY_THRESHOLD`
    /// - `DEBUG_MODE`
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, without environment overrides.
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

    /// Apply overrides from an environment lookup. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("OLLAMA_URL") {
            self.ollama.url = url;
        }
        if let Some(model) = get("OLLAMA_MODEL") {
            self.ollama.model = model;
        }
        if let Some(model) = get("EMBED_MODEL") {
            self.ollama.embed_model = model;
        }

        if let Some(provider) = get("SEARCH_PROVIDER") {
            self.search.provider = provider.parse().map_err(|reason| ConfigError::InvalidEnv {
                var: "SEARCH_PROVIDER".into(),
                reason,
            })?;
        }
        if let Some(url) = get("SEARXNG_URL") {
            self.search.searxng_url = Some(url);
        }
        if let Some(key) = get("TAVILY_API_KEY") {
            self.search.tavily_api_key = Some(key);
        }
        if let Some(limit) = get("SEARCH_RESULTS_LIMIT") {
            self.search.results_limit = parse_env("SEARCH_RESULTS_LIMIT", &limit)?;
        }

        if let Some(dir) = get("DB_DIR") {
            self.memory.store_path = Some(PathBuf::from(dir).join(STORE_FILE_NAME));
        }
        if let Some(n) = get("N_CONTEXTS") {
            self.memory.n_contexts = parse_env("N_CONTEXTS", &n)?;
        }
        if let Some(t) = get("SIMILARITY_THRESHOLD") {
            self.memory.similarity_threshold = parse_env("SIMILARITY_THRESHOLD", &t)?;
        }

        if let Some(debug) = get("DEBUG_MODE") {
            self.debug = matches!(debug.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes");
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".toolpilot")
    }

    /// Get the default configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// The SQLite file the conversation store lives in.
    pub fn store_path(&self) -> PathBuf {
        self.memory
            .store_path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join(STORE_FILE_NAME))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.ollama.temperature) {
            return Err(ConfigError::ValidationError(
                "ollama.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.ollama.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "ollama.request_timeout_secs must be > 0".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.memory.similarity_threshold) {
            return Err(ConfigError::ValidationError(
                "memory.similarity_threshold must be between 0.0 and 1.0".into(),
            ));
        }

        if self.search.results_limit == 0 {
            return Err(ConfigError::ValidationError(
                "search.results_limit must be >= 1".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be >= 1".into(),
            ));
        }

        if self.agent.tool_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "agent.tool_timeout_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Whether the selected search backend has what it needs to run.
    pub fn search_configured(&self) -> bool {
        match self.search.provider {
            SearchProviderKind::Searxng => self.search.searxng_url.is_some(),
            SearchProviderKind::Tavily => self.search.tavily_api_key.is_some(),
        }
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    /// Render this configuration as TOML with secrets masked (for `config show`).
    pub fn to_redacted_toml(&self) -> String {
        let mut shown = self.clone();
        if shown.search.tavily_api_key.is_some() {
            shown.search.tavily_api_key = Some("[REDACTED]".into());
        }
        toml::to_string_pretty(&shown).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ollama: OllamaConfig::default(),
            search: SearchConfig::default(),
            memory: MemoryConfig::default(),
            agent: AgentConfig::default(),
            debug: false,
        }
    }
}

fn parse_env<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
        var: var.into(),
        reason: e.to_string(),
    })
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

    #[error("Invalid value for environment variable {var}: {reason}")]
    InvalidEnv { var: String, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
