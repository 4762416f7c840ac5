//! Tavily backend (hosted search API).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use toolpilot_core::error::SearchError;
use toolpilot_core::search::{SearchHit, SearchProvider};
use tracing::debug;

use super::url_host;

pub const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";
const TIMEOUT: Duration = Duration::from_secs(30);

pub struct TavilySearch {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl TavilySearch {
    pub fn new(api_key: impl Into<String>) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(TIMEOUT)
            .build()
            .map_err(|e| SearchError::Request(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            api_key: api_key.into(),
            endpoint: TAVILY_ENDPOINT.into(),
            client,
        })
    }

    /// Point at a different endpoint (self-hosted proxy).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn into_hits(response: TavilyResponse, limit: usize) -> Vec<SearchHit> {
        response
            .results
            .into_iter()
            .take(limit)
            .map(|r| {
                let title = r
                    .title
                    .filter(|t| !t.trim().is_empty())
                    .or_else(|| url_host(&r.url))
                    .unwrap_or_else(|| "No title".into());
                SearchHit {
                    title,
                    url: r.url,
                    snippet: r.content.unwrap_or_else(|| "No content".into()),
                }
            })
            .collect()
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        debug!(query, limit, "Tavily search");

        let body = TavilyRequest {
            api_key: &self.api_key,
            query,
            search_depth: "advanced",
            max_results: limit,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::Request(format!("Error performing Tavily search: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status_code: status.as_u16(),
                message,
            });
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        Ok(Self::into_hits(parsed, limit))
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: Option<String>,
}
