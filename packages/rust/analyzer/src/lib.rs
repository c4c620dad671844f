//! Structured analysis: company name + page text → five sales-facing fields.
//!
//! The primary path prompts a generative model and parses its JSON reply
//! (see [`parse`]). Whenever that path cannot produce a complete field set
//! (no content, no provider, provider error or timeout, unparsable reply)
//! the deterministic [`fallback_analysis`] fills in instead. [`Analyzer::analyze`]
//! therefore never fails.

mod fallback;
pub mod parse;
pub mod prompt;
pub mod providers;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use leadenrich_shared::{
    Analysis, AnalysisError, AnalysisFields, AnalysisSource, EnrichConfig, Result,
};

pub use fallback::fallback_analysis;
pub use parse::{ParseOutcome, parse_analysis};
pub use prompt::{NO_CONTENT_PLACEHOLDER, build_prompt};
pub use providers::{CompletionProvider, Gemini, OpenAiCompatible, build_provider};

/// Default cap on page text embedded in the prompt.
pub const DEFAULT_PROMPT_CONTENT_CHARS: usize = 1500;

/// Runs the model path with heuristic substitution.
#[derive(Clone)]
pub struct Analyzer {
    provider: Option<Arc<dyn CompletionProvider>>,
    llm_timeout: Duration,
    prompt_content_chars: usize,
}

impl Analyzer {
    pub fn new(
        provider: Option<Arc<dyn CompletionProvider>>,
        llm_timeout: Duration,
        prompt_content_chars: usize,
    ) -> Self {
        Self {
            provider,
            llm_timeout,
            prompt_content_chars,
        }
    }

    /// Heuristic-only analyzer.
    pub fn fallback_only() -> Self {
        Self::new(None, Duration::ZERO, DEFAULT_PROMPT_CONTENT_CHARS)
    }

    /// Build from run configuration, constructing the configured backend.
    pub fn from_config(config: &EnrichConfig) -> Result<Self> {
        let provider = build_provider(
            config.analyzer_backend,
            &config.model,
            &config.base_url,
            config.api_key.clone(),
            config.llm_timeout,
        )?;
        Ok(Self::new(
            provider,
            config.llm_timeout,
            config.prompt_content_chars,
        ))
    }

    /// Whether a generative backend is configured.
    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Analyze a company. `content` is `None` when no usable page text exists.
    #[instrument(skip_all, fields(company = %company_name, has_content = content.is_some()))]
    pub async fn analyze(&self, company_name: &str, content: Option<&str>) -> Analysis {
        let (Some(provider), Some(text)) = (&self.provider, content) else {
            return fallback(company_name, content);
        };

        match self.model_analysis(provider.as_ref(), company_name, text).await {
            Ok(fields) => {
                info!(provider = provider.name(), "model analysis parsed");
                Analysis {
                    fields,
                    source: AnalysisSource::Llm,
                }
            }
            Err(e) => {
                warn!(provider = provider.name(), error = %e, "model analysis unavailable, using heuristic");
                fallback(company_name, content)
            }
        }
    }

    async fn model_analysis(
        &self,
        provider: &dyn CompletionProvider,
        company_name: &str,
        content: &str,
    ) -> std::result::Result<AnalysisFields, AnalysisError> {
        let prompt = build_prompt(company_name, Some(content), self.prompt_content_chars);

        let response = tokio::time::timeout(self.llm_timeout, provider.complete(&prompt))
            .await
            .map_err(|_| {
                AnalysisError::CapabilityUnavailable(format!(
                    "no response within {}ms",
                    self.llm_timeout.as_millis()
                ))
            })??;

        match parse_analysis(&response) {
            ParseOutcome::Parsed(fields) => Ok(fields),
            ParseOutcome::Degraded(reason) => Err(AnalysisError::ParseFailure(reason)),
        }
    }
}

fn fallback(company_name: &str, content: Option<&str>) -> Analysis {
    Analysis {
        fields: fallback_analysis(company_name, content),
        source: AnalysisSource::Fallback,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    const REPLY: &str = r#"Sure! {"summary":"X","target_customer":"Y","industry":"Z","company_size":"S","automation_pitch":"P"} Hope this helps!"#;

    /// Provider that returns a fixed reply (or error) after an optional delay.
    struct Scripted {
        reply: std::result::Result<String, AnalysisError>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(err: AnalysisError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(err),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }

        fn slow(reply: &str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                delay,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CompletionProvider for Scripted {
        async fn complete(&self, _prompt: &str) -> std::result::Result<String, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.reply.clone()
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn analyzer(provider: Arc<Scripted>) -> Analyzer {
        Analyzer::new(Some(provider), Duration::from_secs(2), 1500)
    }

    #[tokio::test]
    async fn model_reply_wrapped_in_prose_is_used() {
        let analysis = analyzer(Scripted::ok(REPLY))
            .analyze("Acme", Some("We build robots."))
            .await;
        assert_eq!(analysis.source, AnalysisSource::Llm);
        assert_eq!(analysis.fields.summary, "X");
        assert_eq!(analysis.fields.target_customer, "Y");
        assert_eq!(analysis.fields.industry, "Z");
        assert_eq!(analysis.fields.company_size, "S");
        assert_eq!(analysis.fields.automation_pitch, "P");
    }

    #[tokio::test]
    async fn absent_content_skips_the_model() {
        let provider = Scripted::ok(REPLY);
        let analysis = analyzer(provider.clone()).analyze("Acme", None).await;
        assert_eq!(analysis.source, AnalysisSource::Fallback);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn provider_error_falls_back() {
        let provider = Scripted::failing(AnalysisError::CapabilityUnavailable("401".into()));
        let analysis = analyzer(provider).analyze("Acme", Some("software")).await;
        assert_eq!(analysis.source, AnalysisSource::Fallback);
        assert_eq!(analysis.fields.industry, "Technology");
    }

    #[tokio::test]
    async fn unparsable_reply_falls_back() {
        let analysis = analyzer(Scripted::ok("I'd rather not."))
            .analyze("Acme", Some("text"))
            .await;
        assert_eq!(analysis.source, AnalysisSource::Fallback);
    }

    #[tokio::test]
    async fn slow_model_times_out_to_fallback() {
        let provider = Scripted::slow(REPLY, Duration::from_secs(5));
        let analyzer = Analyzer::new(Some(provider), Duration::from_millis(50), 1500);
        let analysis = analyzer.analyze("Acme", Some("text")).await;
        assert_eq!(analysis.source, AnalysisSource::Fallback);
    }

    #[tokio::test]
    async fn fallback_only_never_calls_out() {
        let analyzer = Analyzer::fallback_only();
        assert!(!analyzer.has_provider());
        let analysis = analyzer.analyze("Acme", Some("online store")).await;
        assert_eq!(analysis.source, AnalysisSource::Fallback);
        assert_eq!(analysis.fields.industry, "Retail");
    }
}
