// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenRouter provider adapter.
//!
//! Implements [`ProviderAdapter`] over the OpenAI-compatible
//! chat-completions API exposed by OpenRouter, both as a single JSON
//! response and as an SSE token stream.

pub mod client;
pub mod sse;
pub mod types;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jani_config::JaniConfig;
use jani_config::model::LlmConfig;
use jani_core::traits::{PluginAdapter, ProviderAdapter, TokenSink};
use jani_core::types::{AdapterType, HealthStatus};
use jani_core::{Completion, JaniError, Message, ProviderRequest, ProviderTag};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::client::OpenRouterClient;
use crate::types::ChatCompletionRequest;

const PROVIDER_NAME: &str = "openrouter";

/// OpenRouter adapter.
///
/// API key resolution order: `openrouter.api_key` -> `OPENROUTER_API_KEY`
/// env var -> configuration error.
pub struct OpenRouterProvider {
    client: OpenRouterClient,
    default_model: String,
    defaults: LlmConfig,
}

impl OpenRouterProvider {
    pub fn new(config: &JaniConfig) -> Result<Self, JaniError> {
        let api_key = resolve_api_key(config.openrouter.api_key.as_deref())?;
        let section = &config.openrouter;
        let client = OpenRouterClient::new(
            &api_key,
            &section.base_url,
            section.referer.as_deref(),
            section.title.as_deref(),
            Duration::from_secs(section.timeout_secs),
        )?;

        info!(model = %section.default_model, "OpenRouter provider initialized");

        Ok(Self {
            client,
            default_model: section.default_model.clone(),
            defaults: config.llm.clone(),
        })
    }

    /// Builds the wire request, filling unset sampling fields from `[llm]`.
    fn to_request<'a>(
        &'a self,
        messages: &'a [Message],
        request: &'a ProviderRequest,
        stream: bool,
    ) -> Result<ChatCompletionRequest<'a>, JaniError> {
        let model = resolve_model(request.model.as_deref(), &self.default_model)?;
        Ok(ChatCompletionRequest {
            model,
            messages,
            temperature: Some(request.temperature.unwrap_or(self.defaults.temperature)),
            top_p: Some(request.top_p.unwrap_or(self.defaults.top_p)),
            repetition_penalty: Some(
                request
                    .repetition_penalty
                    .unwrap_or(self.defaults.repetition_penalty),
            ),
            max_tokens: request
                .bounded_max_tokens()
                .or((self.defaults.max_tokens > 0).then_some(self.defaults.max_tokens)),
            stop: (!request.stop.is_empty()).then_some(request.stop.as_slice()),
            stream,
        })
    }
}

#[async_trait]
impl PluginAdapter for OpenRouterProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, JaniError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ProviderAdapter for OpenRouterProvider {
    fn tag(&self) -> ProviderTag {
        ProviderTag::OpenRouter
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn generate_reply(
        &self,
        messages: &[Message],
        request: &ProviderRequest,
    ) -> Result<String, JaniError> {
        let api_request = self.to_request(messages, request, false)?;
        let started = Instant::now();
        debug!(
            model = api_request.model,
            messages = ?messages,
            temperature = ?api_request.temperature,
            max_tokens = ?api_request.max_tokens,
            "sending to OpenRouter"
        );

        let response = self.client.complete(&api_request).await?;
        let duration_ms = started.elapsed().as_millis() as u64;

        let choice = response.choices.first();
        let finish_reason = choice.and_then(|c| c.finish_reason.as_deref());
        let content = choice
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.pick_content());

        let Some(content) = content else {
            error!(
                duration_ms,
                model = api_request.model,
                choices = response.choices.len(),
                finish_reason,
                "OpenRouter returned empty response"
            );
            return Err(JaniError::EmptyResponse {
                provider: PROVIDER_NAME.into(),
            });
        };

        debug!(
            duration_ms,
            model = api_request.model,
            finish_reason,
            usage = ?response.usage,
            content = %content,
            "OpenRouter response"
        );
        Ok(content)
    }

    async fn stream_reply(
        &self,
        messages: &[Message],
        request: &ProviderRequest,
        sink: &mut dyn TokenSink,
        cancel: &CancellationToken,
    ) -> Result<Completion, JaniError> {
        if cancel.is_cancelled() {
            return Err(JaniError::Cancelled);
        }
        let api_request = self.to_request(messages, request, true)?;
        debug!(model = api_request.model, messages = ?messages, "streaming from OpenRouter");

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(JaniError::Cancelled),
            response = self.client.open_stream(&api_request) => response?,
        };
        let text = sse::read_token_stream(response, sink, cancel).await?;
        if text.trim().is_empty() {
            error!(model = api_request.model, "OpenRouter stream produced no text");
            return Err(JaniError::EmptyResponse {
                provider: PROVIDER_NAME.into(),
            });
        }

        debug!(model = api_request.model, content = %text, "OpenRouter stream complete");
        Ok(Completion::from_text(text))
    }
}

/// Resolves the API key from config or environment.
fn resolve_api_key(config_key: Option<&str>) -> Result<String, JaniError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.to_string());
    }

    std::env::var("OPENROUTER_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            JaniError::Config(
                "OpenRouter API key not found. Set openrouter.api_key in config or OPENROUTER_API_KEY environment variable.".into(),
            )
        })
}

fn resolve_model<'a>(requested: Option<&'a str>, default: &'a str) -> Result<&'a str, JaniError> {
    requested
        .filter(|m| !m.trim().is_empty())
        .or_else(|| (!default.trim().is_empty()).then_some(default))
        .ok_or_else(|| JaniError::Config("OpenRouter model is not specified".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn test_config(base_url: &str) -> JaniConfig {
        let mut config = JaniConfig::default();
        config.openrouter.api_key = Some("sk-or-test-key".into());
        config.openrouter.base_url = base_url.to_string();
        config.openrouter.default_model = "test/model".into();
        config.openrouter.referer = Some("https://jani.example".into());
        config.openrouter.title = Some("Jani".into());
        config
    }

    fn sse_body(chunks: &[&str]) -> String {
        let mut body = String::from(": keep-alive\n\n");
        for chunk in chunks {
            let payload = serde_json::json!({"choices": [{"delta": {"content": chunk}}]});
            body.push_str(&format!("data: {payload}\n\n"));
        }
        body.push_str("data: [DONE]\n\n");
        body
    }

    #[tokio::test]
    async fn generate_reply_sends_headers_and_sampling() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-or-test-key"))
            .and(header("HTTP-Referer", "https://jani.example"))
            .and(header("X-Title", "Jani"))
            .and(body_partial_json(serde_json::json!({
                "model": "test/model",
                "temperature": 0.5,
                "top_p": 0.9,
                "stop": ["User:"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "  Hello there  "}, "finish_reason": "stop"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenRouterProvider::new(&test_config(&server.uri())).unwrap();
        let mut request = ProviderRequest::for_provider(ProviderTag::OpenRouter);
        request.temperature = Some(0.5);
        request.stop = vec!["User:".into()];

        let reply = provider
            .generate_reply(&[Message::user("hi")], &request)
            .await
            .unwrap();
        assert_eq!(reply, "Hello there");
    }

    #[tokio::test]
    async fn zero_max_tokens_and_empty_stop_are_omitted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "ok"}}]
            })))
            .mount(&server)
            .await;

        let provider = OpenRouterProvider::new(&test_config(&server.uri())).unwrap();
        let mut request = ProviderRequest::default();
        request.max_tokens = Some(0);
        provider
            .generate_reply(&[Message::user("hi")], &request)
            .await
            .unwrap();

        let received: Vec<Request> = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("stop").is_none());
        assert!(body.get("stream").is_none());
        let penalty = body["repetition_penalty"].as_f64().unwrap();
        assert!((penalty - 1.12).abs() < 1e-6, "got {penalty}");
    }

    #[tokio::test]
    async fn non_success_status_is_provider_error_with_truncated_body() {
        let server = MockServer::start().await;
        let long_body = "x".repeat(5000);
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string(long_body))
            .mount(&server)
            .await;

        let provider = OpenRouterProvider::new(&test_config(&server.uri())).unwrap();
        let err = provider
            .generate_reply(&[Message::user("hi")], &ProviderRequest::default())
            .await
            .unwrap_err();
        match err {
            JaniError::Provider { status, message, .. } => {
                assert_eq!(status, Some(503));
                assert!(message.contains("status 503"));
                assert!(message.len() < 1100);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unparseable_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let provider = OpenRouterProvider::new(&test_config(&server.uri())).unwrap();
        let err = provider
            .generate_reply(&[Message::user("hi")], &ProviderRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, JaniError::Parse { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn empty_choice_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": ""}, "finish_reason": "length"}]
            })))
            .mount(&server)
            .await;

        let provider = OpenRouterProvider::new(&test_config(&server.uri())).unwrap();
        let err = provider
            .generate_reply(&[Message::user("hi")], &ProviderRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, JaniError::EmptyResponse { .. }));
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        // SAFETY: tests in this module do not read OPENROUTER_API_KEY concurrently.
        unsafe { std::env::remove_var("OPENROUTER_API_KEY") };
        let mut config = JaniConfig::default();
        config.openrouter.api_key = None;
        let err = OpenRouterProvider::new(&config).err().unwrap();
        assert!(matches!(err, JaniError::Config(_)));
    }

    #[tokio::test]
    async fn empty_model_is_configuration_error() {
        let server = MockServer::start().await;
        let mut config = test_config(&server.uri());
        config.openrouter.default_model = String::new();
        let provider = OpenRouterProvider::new(&config).unwrap();
        let err = provider
            .generate_reply(&[Message::user("hi")], &ProviderRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, JaniError::Config(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stream_reply_forwards_tokens_and_accumulates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body(&["He", "llo"])),
            )
            .mount(&server)
            .await;

        let provider = OpenRouterProvider::new(&test_config(&server.uri())).unwrap();
        let mut seen = Vec::new();
        let mut sink = |t: &str| seen.push(t.to_string());
        let completion = provider
            .stream_reply(
                &[Message::user("hi")],
                &ProviderRequest::default(),
                &mut sink,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(completion.text, "Hello");
        assert!(completion.envelope.is_none());
        assert_eq!(seen, vec!["He", "llo"]);
    }

    #[tokio::test]
    async fn stream_without_text_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body(&[" ", ""])),
            )
            .mount(&server)
            .await;

        let provider = OpenRouterProvider::new(&test_config(&server.uri())).unwrap();
        let mut sink = |_: &str| {};
        let err = provider
            .stream_reply(
                &[Message::user("hi")],
                &ProviderRequest::default(),
                &mut sink,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, JaniError::EmptyResponse { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn mid_stream_error_object_is_provider_error() {
        let server = MockServer::start().await;
        let body = format!(
            "{}data: {{\"error\":{{\"code\":429,\"message\":\"rate limited\"}}}}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n"
        );
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let provider = OpenRouterProvider::new(&test_config(&server.uri())).unwrap();
        let mut sink = |_: &str| {};
        let err = provider
            .stream_reply(
                &[Message::user("hi")],
                &ProviderRequest::default(),
                &mut sink,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(
            matches!(err, JaniError::Provider { status: Some(429), .. }),
            "got: {err:?}"
        );
    }

    #[tokio::test]
    async fn streamed_envelope_is_parsed_leniently() {
        let server = MockServer::start().await;
        let envelope = r#"{"user_visible_text":"Hi!","actions":[{"type":"SET_FLAG","flag":"met"}]}"#;
        let (a, b) = envelope.split_at(20);
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body(&[a, b])),
            )
            .mount(&server)
            .await;

        let provider = OpenRouterProvider::new(&test_config(&server.uri())).unwrap();
        let mut sink = |_: &str| {};
        let completion = provider
            .stream_reply(
                &[Message::user("hi")],
                &ProviderRequest::default(),
                &mut sink,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(completion.text, envelope);
        assert_eq!(completion.envelope.unwrap().user_visible_text, "Hi!");
    }

    #[tokio::test]
    async fn already_cancelled_never_sends() {
        let server = MockServer::start().await;
        let provider = OpenRouterProvider::new(&test_config(&server.uri())).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut sink = |_: &str| {};
        let err = provider
            .stream_reply(&[Message::user("hi")], &ProviderRequest::default(), &mut sink, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, JaniError::Cancelled));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancellation_mid_stream_terminates_promptly() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body(&["slow"]))
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let provider = OpenRouterProvider::new(&test_config(&server.uri())).unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let mut sink = |_: &str| {};
        let started = std::time::Instant::now();
        let err = provider
            .stream_reply(&[Message::user("hi")], &ProviderRequest::default(), &mut sink, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, JaniError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
