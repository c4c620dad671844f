//! Website resolution: company name → best-guess homepage URL.
//!
//! The [`Resolver`] issues one lookup through a [`SearchProvider`], picks the
//! first plausible homepage from the candidates, and, when that yields nothing,
//! consults a single fallback provider (normally [`DomainGuessSearch`]).
//! Failures never escape: they become [`ResolutionStatus::NotFound`] or
//! [`ResolutionStatus::Error`] on the returned [`ResolvedSite`].

mod duckduckgo;
mod guess;
pub mod homepage;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use leadenrich_shared::{CompanyRecord, ResolutionError, ResolvedSite};

pub use duckduckgo::DuckDuckGoSearch;
pub use guess::DomainGuessSearch;

/// User-Agent string for lookup requests.
pub(crate) const USER_AGENT: &str = concat!(
    "LeadEnrich/",
    env!("CARGO_PKG_VERSION"),
    " (+company enrichment bot)"
);

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A lookup capability: text in, candidate URLs out (best first).
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one logical query. An empty list means "no results", not an error.
    async fn query(&self, text: &str) -> Result<Vec<String>, ResolutionError>;

    /// Human-readable provider name for tracing.
    fn name(&self) -> &str;
}

/// Provider that never finds anything (search disabled).
pub struct NoSearch;

#[async_trait]
impl SearchProvider for NoSearch {
    async fn query(&self, _text: &str) -> Result<Vec<String>, ResolutionError> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Query text sent to the primary provider.
pub fn search_query(company_name: &str) -> String {
    format!("{company_name} official website")
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Maps company names to homepages. Single attempt per provider; no loops.
#[derive(Clone)]
pub struct Resolver {
    primary: Arc<dyn SearchProvider>,
    fallback: Option<Arc<dyn SearchProvider>>,
}

impl Resolver {
    pub fn new(primary: Arc<dyn SearchProvider>) -> Self {
        Self {
            primary,
            fallback: None,
        }
    }

    /// Add the one fallback strategy consulted when the primary finds nothing.
    pub fn with_fallback(mut self, fallback: Arc<dyn SearchProvider>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Resolve a company to its homepage.
    #[instrument(skip_all, fields(company = %company.name()))]
    pub async fn resolve(&self, company: &CompanyRecord) -> ResolvedSite {
        let query = search_query(company.name());
        let primary = lookup(self.primary.as_ref(), &query, company.name()).await;

        let outcome = match (primary, &self.fallback) {
            (Ok(url), _) => Ok(url),
            (Err(primary_err), Some(fallback)) => {
                match lookup(fallback.as_ref(), company.name(), company.name()).await {
                    Ok(url) => Ok(url),
                    // A lookup failure anywhere outranks a clean "nothing found".
                    Err(ResolutionError::NotFound) => Err(primary_err),
                    Err(e) => Err(e),
                }
            }
            (Err(e), None) => Err(e),
        };

        match outcome {
            Ok(url) => {
                info!(%url, "website resolved");
                ResolvedSite::found(company.clone(), url)
            }
            Err(ResolutionError::NotFound) => {
                info!("no website candidate found");
                ResolvedSite::not_found(company.clone())
            }
            Err(e) => {
                warn!(error = %e, "website lookup failed");
                ResolvedSite::error(company.clone())
            }
        }
    }
}

/// One provider call plus candidate selection.
async fn lookup(
    provider: &dyn SearchProvider,
    text: &str,
    company_name: &str,
) -> Result<String, ResolutionError> {
    let candidates = provider.query(text).await?;
    tracing::debug!(
        provider = provider.name(),
        candidates = candidates.len(),
        "lookup returned"
    );
    homepage::select_homepage(&candidates, company_name).ok_or(ResolutionError::NotFound)
}
