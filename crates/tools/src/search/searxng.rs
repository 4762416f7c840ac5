//! SearXNG backend, talking to a self-hosted metasearch instance's JSON API.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use toolpilot_core::error::SearchError;
use toolpilot_core::search::{SearchHit, SearchProvider};
use tracing::debug;

const USER_AGENT: &str = "OllamaAssistant/1.0";
const TIMEOUT: Duration = Duration::from_secs(30);
const NO_SNIPPET: &str = "No snippet available";

pub struct SearxngSearch {
    url: String,
    client: reqwest::Client,
}

impl SearxngSearch {
    /// `url` is the instance's search endpoint, e.g. `http://localhost:8080/search`.
    pub fn new(url: impl Into<String>) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SearchError::Request(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    fn into_hits(response: SearxngResponse, limit: usize) -> Vec<SearchHit> {
        response
            .results
            .into_iter()
            .take(limit)
            .map(|r| SearchHit {
                title: r.title,
                url: r.url,
                snippet: r
                    .content
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| NO_SNIPPET.into()),
            })
            .collect()
    }
}

#[async_trait]
impl SearchProvider for SearxngSearch {
    fn name(&self) -> &str {
        "searxng"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        debug!(url = %self.url, query, "SearXNG search");

        let response = self
            .client
            .get(&self.url)
            .query(&[("q", query), ("format", "json")])
            .send()
            .await
            .map_err(|e| SearchError::Request(format!("Error performing SearXNG search: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status_code: status.as_u16(),
                message,
            });
        }

        let body: SearxngResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        Ok(Self::into_hits(body, limit))
    }
}

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngResult>,
}

#[derive(Debug, Deserialize)]
struct SearxngResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: Option<String>,
}
