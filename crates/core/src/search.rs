//! Search provider trait: "query → ranked results".
//!
//! Two interchangeable backends (SearXNG, Tavily) implement this in
//! `toolpilot-tools`; which one is used is decided once at start-up.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Backend name shown to the user (e.g., "searxng").
    fn name(&self) -> &str;

    /// Run `query` and return at most `limit` hits, best first.
    async fn search(&self, query: &str, limit: usize) -> std::result::Result<Vec<SearchHit>, SearchError>;
}
