//! Google Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use leadenrich_shared::{AnalysisError, ApiKey, LeadEnrichError, Result};

use super::{CompletionProvider, MAX_OUTPUT_TOKENS, TEMPERATURE, USER_AGENT, snippet};

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

/// Gemini client. The key travels in the `x-goog-api-key` header so it never
/// shows up in URLs or transport error messages.
pub struct Gemini {
    client: Client,
    endpoint: String,
    api_key: ApiKey,
}

impl Gemini {
    /// `base_url` is the API root, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    pub fn new(base_url: &str, model: &str, api_key: ApiKey, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| LeadEnrichError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/models/{model}:generateContent",
                base_url.trim_end_matches('/')
            ),
            api_key,
        })
    }
}

#[async_trait]
impl CompletionProvider for Gemini {
    async fn complete(&self, prompt: &str) -> std::result::Result<String, AnalysisError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalysisError::CapabilityUnavailable(format!("gemini request failed: {e}")))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AnalysisError::CapabilityUnavailable(format!("gemini response read failed: {e}"))
        })?;

        if !status.is_success() {
            let reason = match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => "unauthorized",
                _ => "error",
            };
            return Err(AnalysisError::CapabilityUnavailable(format!(
                "gemini API {reason} ({status}): {}",
                snippet(&body)
            )));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
            AnalysisError::ParseFailure(format!("unexpected gemini response shape: {e}"))
        })?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AnalysisError::ParseFailure("empty completion".into()));
        }
        debug!(chars = text.len(), "gemini completion received");
        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
