//! `toolpilot config` — Configuration management commands.

use anyhow::Context;
use std::path::Path;
use toolpilot_config::AppConfig;

/// Print the effective configuration, after environment overrides.
pub fn show(config: &AppConfig, path: &Path) {
    let source = if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not found, using defaults)", path.display())
    };
    println!("# Config file: {source}");
    println!("# Store:       {}", config.store_path().display());
    println!();
    println!("{}", config.to_redacted_toml());
}

/// Write a starter config file.
pub fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, AppConfig::default_toml())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✅ Wrote starter config to {}", path.display());
    println!("   Set search.searxng_url (or SEARXNG_URL) to enable web search.");
    Ok(())
}
