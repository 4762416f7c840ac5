//! `toolpilot memory` — Conversation store commands.

use std::time::Duration;
use toolpilot_agent::{ContextRetriever, RetrieverConfig};
use toolpilot_config::AppConfig;
use toolpilot_core::memory::ContextStore;

pub async fn stats(config: &AppConfig) -> anyhow::Result<()> {
    let path = config.store_path();

    println!("🧠 Memory Statistics");
    println!("====================");
    println!("  Enabled:    {}", config.memory.enabled);
    println!("  Contexts:   {} per turn", config.memory.n_contexts);
    println!("  Threshold:  {:.2}", config.memory.similarity_threshold);
    println!("  Embeddings: {}", config.ollama.embed_model);

    if path.exists() {
        let size_kb = std::fs::metadata(&path)?.len() as f64 / 1024.0;
        println!("  DB file:    {} ({size_kb:.1} KB)", path.display());
        let store = super::open_store(config).await?;
        println!("  Records:    {}", store.count().await?);
    } else {
        println!("  DB file:    {} (not created yet)", path.display());
    }

    Ok(())
}

pub async fn search(config: &AppConfig, query: &str, limit: usize) -> anyhow::Result<()> {
    let store = super::open_store(config).await?;
    let provider = super::build_provider(config)?;
    let retriever = ContextRetriever::new(
        provider,
        store,
        RetrieverConfig {
            result_limit: limit,
            similarity_threshold: 0.0,
            embed_model: config.ollama.embed_model.clone(),
            timeout: Duration::from_secs(config.ollama.request_timeout_secs),
        },
    );

    println!("🔍 Searching past conversations for: \"{query}\"");
    println!();

    let records = retriever.retrieve(query).await?;
    if records.is_empty() {
        println!("   No past conversations found.");
        return Ok(());
    }

    let threshold = config.memory.similarity_threshold;
    for (i, record) in records.iter().enumerate() {
        let similarity = record.similarity.unwrap_or_default();
        let marker = if similarity >= threshold { "✓" } else { " " };
        println!(
            "  {:>2}. [similarity: {similarity:.2}] {marker} {}",
            i + 1,
            record.created_at.format("%Y-%m-%d %H:%M")
        );
        println!("      You:       {}", preview(&record.prompt, 80));
        println!("      Assistant: {}", preview(&record.response, 80));
    }
    println!();
    println!("   ✓ = would be recalled during chat (threshold {threshold:.2})");

    Ok(())
}

pub async fn clear(config: &AppConfig, confirm: bool) -> anyhow::Result<()> {
    let path = config.store_path();
    if !path.exists() {
        println!("   Nothing to clear: {} does not exist.", path.display());
        return Ok(());
    }

    let store = super::open_store(config).await?;
    let count = store.count().await?;

    if !confirm {
        println!("   ⚠️  This will delete {count} stored conversation(s).");
        println!("   Re-run with --confirm to proceed.");
        return Ok(());
    }

    store.clear().await?;
    println!("   🗑️  Deleted {count} stored conversation(s).");
    Ok(())
}

/// First `max` characters on one line.
fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max).collect();
        format!("{cut}…")
    }
}
