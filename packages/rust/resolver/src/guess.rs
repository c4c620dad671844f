//! Domain-guess fallback: probe the obvious domains for a company name.
//!
//! For "Acme Corp" this tries `acmecorp.com`, `acmecorp.co`, `acmecorp.io` and
//! `www.acmecorp.com` with a short HEAD request and reports the ones that
//! answer 2xx. Receives the bare company name, not a search query.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use leadenrich_shared::{LeadEnrichError, ResolutionError};

use crate::homepage::company_slug;
use crate::{SearchProvider, USER_AGENT};

/// Per-probe timeout; guesses are cheap and should fail fast.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// URL patterns tried in order. `{slug}` is replaced by the company slug.
const DEFAULT_PATTERNS: &[&str] = &[
    "https://{slug}.com",
    "https://{slug}.co",
    "https://{slug}.io",
    "https://www.{slug}.com",
];

/// Fallback provider that probes `{slug}.{tld}` style domains.
pub struct DomainGuessSearch {
    client: Client,
    patterns: Vec<String>,
}

impl DomainGuessSearch {
    pub fn new() -> leadenrich_shared::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(3))
            .timeout(PROBE_TIMEOUT)
            .build()
            .map_err(|e| LeadEnrichError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            patterns: DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect(),
        })
    }

    /// Replace the probe patterns (each must contain `{slug}`).
    pub fn with_patterns(mut self, patterns: Vec<String>) -> Self {
        self.patterns = patterns;
        self
    }

    /// Candidate URLs for a name, in probe order.
    pub fn candidate_urls(&self, name: &str) -> Vec<String> {
        let slug = company_slug(name);
        if slug.is_empty() {
            return Vec::new();
        }
        self.patterns
            .iter()
            .map(|p| p.replace("{slug}", &slug))
            .collect()
    }

    async fn is_reachable(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(%url, error = %e, "domain probe failed");
                false
            }
        }
    }
}

#[async_trait]
impl SearchProvider for DomainGuessSearch {
    #[instrument(skip(self), fields(provider = "domain-guess"))]
    async fn query(&self, text: &str) -> Result<Vec<String>, ResolutionError> {
        let mut reachable = Vec::new();
        for url in self.candidate_urls(text) {
            if self.is_reachable(&url).await {
                reachable.push(url);
                // First live guess wins.
                break;
            }
        }
        Ok(reachable)
    }

    fn name(&self) -> &str {
        "domain-guess"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_candidates() {
        let guess = DomainGuessSearch::new().unwrap();
        assert_eq!(
            guess.candidate_urls("Acme Corp."),
            vec![
                "https://acmecorp.com",
                "https://acmecorp.co",
                "https://acmecorp.io",
                "https://www.acmecorp.com",
            ]
        );
    }

    #[test]
    fn punctuation_only_name_has_no_candidates() {
        let guess = DomainGuessSearch::new().unwrap();
        assert!(guess.candidate_urls("!!!").is_empty());
    }

    #[tokio::test]
    async fn returns_first_reachable_guess() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("HEAD"))
            .and(wiremock::matchers::path("/acme-missing"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("HEAD"))
            .and(wiremock::matchers::path("/acme"))
            .respond_with(wiremock::ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let guess = DomainGuessSearch::new().unwrap().with_patterns(vec![
            format!("{}/{{slug}}-missing", server.uri()),
            format!("{}/{{slug}}", server.uri()),
        ]);

        let found = guess.query("Acme").await.unwrap();
        assert_eq!(found, vec![format!("{}/acme", server.uri())]);
    }

    #[tokio::test]
    async fn nothing_reachable_is_empty_not_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("HEAD"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let guess = DomainGuessSearch::new()
            .unwrap()
            .with_patterns(vec![format!("{}/{{slug}}", server.uri())]);

        assert!(guess.query("Nobody").await.unwrap().is_empty());
    }
}
