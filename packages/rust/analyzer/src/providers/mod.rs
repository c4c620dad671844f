//! Generative-text backends.

mod gemini;
mod openai;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use leadenrich_shared::{AnalysisError, AnalyzerBackend, ApiKey, LeadEnrichError, Result};

pub use gemini::Gemini;
pub use openai::OpenAiCompatible;

/// User-Agent string for model API requests.
pub(crate) const USER_AGENT: &str = concat!("LeadEnrich/", env!("CARGO_PKG_VERSION"));

/// Sampling settings shared by every backend.
pub(crate) const TEMPERATURE: f32 = 0.3;
pub(crate) const MAX_OUTPUT_TOKENS: u32 = 300;

/// A prompt-in, text-out capability.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Return the raw completion text for `prompt`.
    async fn complete(&self, prompt: &str) -> std::result::Result<String, AnalysisError>;

    /// Provider name for logs.
    fn name(&self) -> &str;
}

/// Build the provider for `backend`. `AnalyzerBackend::None` yields `Ok(None)`.
///
/// The key has already been read from the environment by the caller; a
/// missing key for a real backend is a configuration error.
pub fn build_provider(
    backend: AnalyzerBackend,
    model: &str,
    base_url: &str,
    api_key: Option<ApiKey>,
    timeout: Duration,
) -> Result<Option<Arc<dyn CompletionProvider>>> {
    if backend == AnalyzerBackend::None {
        return Ok(None);
    }

    let api_key = api_key.ok_or_else(|| {
        LeadEnrichError::config(format!(
            "API key not found for analyzer backend '{}'",
            backend.as_str()
        ))
    })?;

    let provider: Arc<dyn CompletionProvider> = match backend {
        AnalyzerBackend::OpenAi | AnalyzerBackend::OpenRouter => Arc::new(
            OpenAiCompatible::new(backend.as_str(), base_url, model, api_key, timeout)?,
        ),
        AnalyzerBackend::Gemini => Arc::new(Gemini::new(base_url, model, api_key, timeout)?),
        AnalyzerBackend::None => return Ok(None),
    };
    Ok(Some(provider))
}

/// Shorten an error body for log and error messages.
pub(crate) fn snippet(body: &str) -> String {
    const MAX: usize = 200;
    let mut s: String = body.chars().take(MAX).collect();
    if body.chars().count() > MAX {
        s.push('…');
    }
    s
}
