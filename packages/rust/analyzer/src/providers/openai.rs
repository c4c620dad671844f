//! OpenAI-style chat completions (OpenAI itself, OpenRouter, compatible proxies).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use leadenrich_shared::{AnalysisError, ApiKey, LeadEnrichError, Result};

use super::{CompletionProvider, MAX_OUTPUT_TOKENS, TEMPERATURE, USER_AGENT, snippet};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

/// Client for any `/chat/completions` endpoint with Bearer auth.
pub struct OpenAiCompatible {
    client: Client,
    name: String,
    endpoint: String,
    model: String,
    api_key: ApiKey,
}

impl OpenAiCompatible {
    /// `base_url` is the API root, e.g. `https://api.openai.com/v1`.
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        model: impl Into<String>,
        api_key: ApiKey,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| LeadEnrichError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            name: name.into(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
            api_key,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatible {
    async fn complete(&self, prompt: &str) -> std::result::Result<String, AnalysisError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
            max_tokens: MAX_OUTPUT_TOKENS,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                AnalysisError::CapabilityUnavailable(format!("{} request failed: {e}", self.name))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AnalysisError::CapabilityUnavailable(format!("{} response read failed: {e}", self.name))
        })?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|r| r.error.message)
                .unwrap_or_else(|_| snippet(&body));
            let reason = match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => "unauthorized",
                _ => "error",
            };
            return Err(AnalysisError::CapabilityUnavailable(format!(
                "{} API {reason} ({status}): {detail}",
                self.name
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            AnalysisError::ParseFailure(format!("unexpected {} response shape: {e}", self.name))
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AnalysisError::ParseFailure("empty completion".into()));
        }
        debug!(provider = %self.name, chars = text.len(), "completion received");
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenAiCompatible {
        OpenAiCompatible::new(
            "openai",
            &format!("{}/v1", server.uri()),
            "gpt-4o-mini",
            ApiKey::new("sk-test"),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn sends_chat_request_and_returns_content() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "max_tokens": 300,
                "messages": [{"role": "user", "content": "hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"a\":1}"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = provider(&server).complete("hello").await.unwrap();
        assert_eq!(text, "{\"a\":1}");
    }

    #[tokio::test]
    async fn unauthorized_is_capability_unavailable() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        let err = provider(&server).complete("hello").await.unwrap_err();
        match err {
            AnalysisError::CapabilityUnavailable(msg) => {
                assert!(msg.contains("unauthorized"));
                assert!(msg.contains("Incorrect API key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_parse_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let err = provider(&server).complete("hello").await.unwrap_err();
        assert!(matches!(err, AnalysisError::ParseFailure(_)));
    }
}
