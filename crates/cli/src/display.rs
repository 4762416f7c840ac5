//! Terminal rendering of turn progress and search results.

use toolpilot_agent::TurnEvent;
use toolpilot_core::search::SearchHit;

const TITLE_WIDTH: usize = 30;
const DOMAIN_WIDTH: usize = 30;
const SNIPPET_WIDTH: usize = 60;

/// Render one turn event, or `None` for events that print nothing.
pub fn render_event(event: &TurnEvent) -> Option<String> {
    match event {
        TurnEvent::ContextRecalled { count } => {
            Some(format!("  📚 Recalled {count} related past conversation(s)"))
        }
        TurnEvent::Thinking { .. } => None,
        TurnEvent::ToolCall { name, .. } => Some(format!("  🔧 Using tool: {name}")),
        TurnEvent::ToolResult { result } => {
            let mut out = String::new();
            let provider = result
                .data
                .as_ref()
                .and_then(|d| d.get("provider"))
                .and_then(|p| p.as_str());
            if let Some(provider) = provider {
                out.push_str(&format!("     Search provider: {provider}\n"));
            }

            if result.success {
                out.push_str("  ✅ Tool executed successfully.");
                if let Some(hits) = search_hits(result.data.as_ref()) {
                    out.push('\n');
                    if hits.is_empty() {
                        out.push_str("     No search results found.");
                    } else {
                        out.push_str(&format_search_results(&hits));
                    }
                }
            } else {
                out.push_str(&format!("  ❌ Error executing tool: {}", result.output));
            }
            Some(out)
        }
        TurnEvent::ParseFailure { failure } => Some(format!(
            "  ⚠️  Skipped malformed tool call #{}: {}",
            failure.index + 1,
            failure.reason
        )),
        TurnEvent::Truncated { iterations } => Some(format!(
            "  ⚠️  Stopped after {iterations} model calls without a final answer"
        )),
    }
}

fn search_hits(data: Option<&serde_json::Value>) -> Option<Vec<SearchHit>> {
    let results = data?.get("results")?;
    serde_json::from_value(results.clone()).ok()
}

/// Results as a Title / Domain / Snippet table followed by the full URLs,
/// which the table would otherwise cut off.
pub fn format_search_results(hits: &[SearchHit]) -> String {
    let mut out = String::from("  Search Results\n");
    let rule = format!(
        "  +-{}-+-{}-+-{}-+\n",
        "-".repeat(TITLE_WIDTH),
        "-".repeat(DOMAIN_WIDTH),
        "-".repeat(SNIPPET_WIDTH)
    );

    out.push_str(&rule);
    out.push_str(&row("Title", "Domain", "Snippet"));
    out.push_str(&rule);
    for hit in hits {
        let title = wrap(&hit.title, TITLE_WIDTH);
        let domain = wrap(domain_of(&hit.url), DOMAIN_WIDTH);
        let snippet = wrap(&hit.snippet, SNIPPET_WIDTH);
        let height = title.len().max(domain.len()).max(snippet.len());
        for i in 0..height {
            out.push_str(&row(
                title.get(i).map_or("", String::as_str),
                domain.get(i).map_or("", String::as_str),
                snippet.get(i).map_or("", String::as_str),
            ));
        }
        out.push_str(&rule);
    }

    out.push_str("\n  Full URLs:\n");
    for (i, hit) in hits.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, hit.url));
    }
    out
}

fn row(title: &str, domain: &str, snippet: &str) -> String {
    format!(
        "  | {title:<TITLE_WIDTH$} | {domain:<DOMAIN_WIDTH$} | {snippet:<SNIPPET_WIDTH$} |\n"
    )
}

/// Host part of a URL, without scheme or path.
pub fn domain_of(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.split(['/', '?', '#']).next().unwrap_or(rest)
}

/// Greedy word wrap; words longer than `width` are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..width).collect());
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
