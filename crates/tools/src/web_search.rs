//! The `search` tool forwards the query to the configured search backend.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use toolpilot_core::error::ToolError;
use toolpilot_core::search::SearchProvider;
use toolpilot_core::tool::{ArgumentSchema, ParamKind, Tool, ToolOutput};

pub struct SearchTool {
    provider: Arc<dyn SearchProvider>,
    results_limit: usize,
    description: String,
}

impl SearchTool {
    pub fn new(provider: Arc<dyn SearchProvider>, results_limit: usize) -> Self {
        let description = format!(
            "Perform a web search using the {} search provider.",
            provider.name()
        );
        Self {
            provider,
            results_limit,
            description,
        }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> ArgumentSchema {
        ArgumentSchema::new().required("query", ParamKind::String, "The search query")
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
        let query = arguments
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        let hits = self
            .provider
            .search(query, self.results_limit)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "search".into(),
                reason: e.to_string(),
            })?;

        let output = if hits.is_empty() {
            format!("No results found for '{query}'.")
        } else {
            hits.iter()
                .enumerate()
                .map(|(i, h)| format!("{}. {} ({})\n   {}", i + 1, h.title, h.url, h.snippet))
                .collect::<Vec<_>>()
                .join("\n")
        };

        Ok(ToolOutput::text(output).with_data(serde_json::json!({
            "provider": self.provider.name(),
            "results": hits,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolpilot_core::error::SearchError;
    use toolpilot_core::search::SearchHit;

    struct FixedSearch(Vec<SearchHit>);

    #[async_trait]
    impl SearchProvider for FixedSearch {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn search(&self, _query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
            Ok(self.0.iter().take(limit).cloned().collect())
        }
    }

    fn hit(n: usize) -> SearchHit {
        SearchHit {
            title: format!("Result {n}"),
            url: format!("https://example.com/{n}"),
            snippet: format!("Snippet {n}"),
        }
    }

    #[test]
    fn description_names_provider() {
        let tool = SearchTool::new(Arc::new(FixedSearch(vec![])), 5);
        assert!(tool.description().contains("fixed"));
    }

    #[tokio::test]
    async fn returns_formatted_hits_and_data() {
        let tool = SearchTool::new(Arc::new(FixedSearch((1..=4).map(hit).collect())), 2);
        let out = tool
            .execute(json!({"query": "ollama"}).as_object().unwrap())
            .await
            .unwrap();

        assert!(out.output.starts_with("1. Result 1 (https://example.com/1)"));
        assert!(!out.output.contains("Result 3"));
        let data = out.data.unwrap();
        assert_eq!(data["provider"], "fixed");
        assert_eq!(data["results"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_results_are_not_an_error() {
        let tool = SearchTool::new(Arc::new(FixedSearch(vec![])), 5);
        let out = tool
            .execute(json!({"query": "nothing"}).as_object().unwrap())
            .await
            .unwrap();
        assert!(out.output.contains("No results found"));
    }

    #[tokio::test]
    async fn backend_failure_becomes_execution_error() {
        let tool = SearchTool::new(
            Arc::new(crate::search::UnconfiguredSearch::new("searxng", "SEARXNG_URL is not set")),
            5,
        );
        let err = tool
            .execute(json!({"query": "x"}).as_object().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { reason, .. } if reason.contains("SEARXNG_URL")));
    }
}
