//! `toolpilot doctor` — Diagnose system health.

use std::path::Path;
use toolpilot_config::AppConfig;
use toolpilot_core::memory::ContextStore;
use toolpilot_core::provider::Provider;

pub async fn run(config: &AppConfig, config_path: &Path) -> anyhow::Result<()> {
    println!("🩺 toolpilot Doctor — System Diagnostics");
    println!("========================================\n");

    let mut issues = 0;

    // Config
    if config_path.exists() {
        println!("  ✅ Config file valid ({})", config_path.display());
    } else {
        println!("  ⚠️  No config file, using defaults — run `toolpilot config init`");
    }

    // Ollama
    let provider = super::build_provider(config)?;
    match provider.health_check().await {
        Ok(true) => {
            println!("  ✅ Ollama reachable at {}", config.ollama.url);
            match provider.list_models().await {
                Ok(models) => {
                    for (label, wanted) in [
                        ("Chat model", &config.ollama.model),
                        ("Embedding model", &config.ollama.embed_model),
                    ] {
                        if model_available(&models, wanted) {
                            println!("  ✅ {label} '{wanted}' available");
                        } else {
                            println!("  ❌ {label} '{wanted}' not pulled — run `ollama pull {wanted}`");
                            issues += 1;
                        }
                    }
                }
                Err(e) => {
                    println!("  ⚠️  Could not list models: {e}");
                    issues += 1;
                }
            }
        }
        Ok(false) => {
            println!("  ❌ Ollama at {} answered with an error", config.ollama.url);
            issues += 1;
        }
        Err(e) => {
            println!("  ❌ Ollama unreachable at {}: {e}", config.ollama.url);
            issues += 1;
        }
    }

    // Search
    if config.search_configured() {
        println!("  ✅ Search backend: {}", config.search.provider.as_str());
    } else {
        println!(
            "  ⚠️  Search backend '{}' is not configured — set {}",
            config.search.provider.as_str(),
            match config.search.provider {
                toolpilot_config::SearchProviderKind::Searxng => "SEARXNG_URL",
                toolpilot_config::SearchProviderKind::Tavily => "TAVILY_API_KEY",
            }
        );
        issues += 1;
    }

    // Store
    if config.memory.enabled {
        match super::open_store(config).await {
            Ok(store) => match store.count().await {
                Ok(count) => println!(
                    "  ✅ Conversation store OK ({count} records at {})",
                    config.store_path().display()
                ),
                Err(e) => {
                    println!("  ❌ Conversation store unreadable: {e}");
                    issues += 1;
                }
            },
            Err(e) => {
                println!("  ❌ {e:#}");
                issues += 1;
            }
        }
    } else {
        println!("  ⚠️  Memory disabled — past conversations will not be recalled");
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

/// Ollama reports models with a tag (`llama3.1:latest`); a bare name
/// matches its `latest` tag.
fn model_available(models: &[String], wanted: &str) -> bool {
    models.iter().any(|m| {
        m == wanted || (!wanted.contains(':') && m.strip_suffix(":latest") == Some(wanted))
    })
}
