//! DuckDuckGo HTML search provider.
//!
//! Uses the JavaScript-free results page and pulls the result anchors out
//! with `scraper`. Result links come back wrapped in `/l/?uddg=` redirects;
//! unwrapping happens in [`crate::homepage`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use tracing::{debug, instrument};

use leadenrich_shared::{LeadEnrichError, ResolutionError, RetryPolicy};

use crate::{SearchProvider, USER_AGENT};

/// Public endpoint root.
const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com";

/// Failure of a single HTTP attempt, split by whether retrying can help.
#[derive(Debug)]
enum AttemptError {
    Transient(String),
    Permanent(String),
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transient(m) | Self::Permanent(m) => f.write_str(m),
        }
    }
}

/// Search provider backed by `html.duckduckgo.com`.
pub struct DuckDuckGoSearch {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl DuckDuckGoSearch {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> leadenrich_shared::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(3))
            .timeout(timeout)
            .build()
            .map_err(|e| LeadEnrichError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            retry,
        })
    }

    /// Point the provider at a different host (mirrors, mock servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    async fn attempt(&self, text: &str) -> Result<String, AttemptError> {
        let response = self
            .client
            .get(format!("{}/html/", self.base_url))
            .query(&[("q", text)])
            .send()
            .await
            .map_err(|e| AttemptError::Transient(format!("search request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(AttemptError::Transient(format!("search returned HTTP {status}")));
        }
        if !status.is_success() {
            return Err(AttemptError::Permanent(format!("search returned HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| AttemptError::Transient(format!("search body read failed: {e}")))
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    #[instrument(skip(self), fields(provider = "duckduckgo"))]
    async fn query(&self, text: &str) -> Result<Vec<String>, ResolutionError> {
        let body = self
            .retry
            .run(
                "duckduckgo search",
                |e| matches!(e, AttemptError::Transient(_)),
                || self.attempt(text),
            )
            .await
            .map_err(|e| ResolutionError::LookupFailure(e.to_string()))?;

        let links = extract_result_links(&body);
        debug!(count = links.len(), "search results parsed");
        Ok(links)
    }

    fn name(&self) -> &str {
        "duckduckgo"
    }
}

/// Pull result hrefs out of a results page, in rank order.
fn extract_result_links(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let primary = Selector::parse("a.result__a[href]").expect("valid selector");
    let secondary = Selector::parse("a.result__url[href]").expect("valid selector");

    let mut links: Vec<String> = doc
        .select(&primary)
        .filter_map(|el| el.value().attr("href"))
        .map(str::to_string)
        .collect();

    if links.is_empty() {
        links = doc
            .select(&secondary)
            .filter_map(|el| el.value().attr("href"))
            .map(str::to_string)
            .collect();
    }

    links
}
