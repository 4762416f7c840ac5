//! Subcommand implementations and the wiring they share.

pub mod chat;
pub mod config_cmd;
pub mod doctor;
pub mod memory;
pub mod tools;

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use toolpilot_config::AppConfig;
use toolpilot_core::tool::ToolRegistry;
use toolpilot_memory::SqliteStore;
use toolpilot_providers::OllamaProvider;
use toolpilot_tools::Workspace;

/// Load the config file at `path` with environment overrides applied.
pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    AppConfig::load_with_env(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

pub fn build_provider(config: &AppConfig) -> anyhow::Result<Arc<OllamaProvider>> {
    let provider = OllamaProvider::new(
        &config.ollama.url,
        Duration::from_secs(config.ollama.request_timeout_secs),
    )
    .context("Failed to create Ollama client")?;
    Ok(Arc::new(provider))
}

/// Build the tool registry. File tools operate relative to the current directory.
pub fn build_registry(config: &AppConfig) -> anyhow::Result<Arc<ToolRegistry>> {
    let search = toolpilot_tools::search::from_config(&config.search)
        .context("Failed to set up the search backend")?;
    let workspace = Workspace::current_dir()?;
    let registry =
        toolpilot_tools::default_registry(workspace, search, config.search.results_limit)?;
    Ok(Arc::new(registry))
}

pub async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<SqliteStore>> {
    let path = config.store_path();
    let store = SqliteStore::open(&path)
        .await
        .with_context(|| format!("Failed to open conversation store at {}", path.display()))?;
    Ok(Arc::new(store))
}
