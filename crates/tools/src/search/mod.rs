//! Web search backends.
//!
//! Both backends implement [`SearchProvider`]; [`from_config`] picks one at
//! start-up so nothing downstream knows which is in use.

pub mod searxng;
pub mod tavily;

use async_trait::async_trait;
use std::sync::Arc;
use toolpilot_config::{SearchConfig, SearchProviderKind};
use toolpilot_core::error::SearchError;
use toolpilot_core::search::{SearchHit, SearchProvider};
use tracing::warn;

pub use searxng::SearxngSearch;
pub use tavily::TavilySearch;

/// Stands in for a backend whose URL or key is missing. Every call fails
/// with an explanation of what to set.
pub struct UnconfiguredSearch {
    name: &'static str,
    reason: String,
}

impl UnconfiguredSearch {
    pub fn new(name: &'static str, reason: impl Into<String>) -> Self {
        Self {
            name,
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl SearchProvider for UnconfiguredSearch {
    fn name(&self) -> &str {
        self.name
    }

    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        Err(SearchError::NotConfigured(self.reason.clone()))
    }
}

/// Build the configured search backend.
pub fn from_config(config: &SearchConfig) -> Result<Arc<dyn SearchProvider>, SearchError> {
    let provider: Arc<dyn SearchProvider> = match config.provider {
        SearchProviderKind::Searxng => match &config.searxng_url {
            Some(url) => Arc::new(SearxngSearch::new(url)?),
            None => {
                warn!("SEARXNG_URL is not set; the search tool will be unavailable");
                Arc::new(UnconfiguredSearch::new(
                    "searxng",
                    "SearXNG URL is not set (SEARXNG_URL or search.searxng_url)",
                ))
            }
        },
        SearchProviderKind::Tavily => match &config.tavily_api_key {
            Some(key) => Arc::new(TavilySearch::new(key.clone())?),
            None => {
                warn!("TAVILY_API_KEY is not set; the search tool will be unavailable");
                Arc::new(UnconfiguredSearch::new(
                    "tavily",
                    "Tavily API key is not set (TAVILY_API_KEY or search.tavily_api_key)",
                ))
            }
        },
    };
    Ok(provider)
}

/// Host part of a URL, used as a fallback title.
pub(crate) fn url_host(url: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
}
