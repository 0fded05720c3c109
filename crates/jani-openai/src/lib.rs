// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI provider adapter (non-streaming).

pub mod client;
pub mod types;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jani_config::JaniConfig;
use jani_config::model::LlmConfig;
use jani_core::traits::{PluginAdapter, ProviderAdapter};
use jani_core::types::{AdapterType, HealthStatus};
use jani_core::{JaniError, Message, ProviderRequest, ProviderTag};
use tracing::{debug, error, info};

use crate::client::OpenAiClient;
use crate::types::{ChatRequest, supports_stop};

const PROVIDER_NAME: &str = "openai";

/// OpenAI adapter. Key resolution: `openai.api_key` -> `OPENAI_API_KEY`.
///
/// Repetition penalty has no OpenAI equivalent and is dropped.
pub struct OpenAiProvider {
    client: OpenAiClient,
    default_model: String,
    defaults: LlmConfig,
}

impl OpenAiProvider {
    pub fn new(config: &JaniConfig) -> Result<Self, JaniError> {
        let api_key = resolve_api_key(config.openai.api_key.as_deref())?;
        let client = OpenAiClient::new(
            &api_key,
            &config.openai.base_url,
            Duration::from_secs(config.openai.timeout_secs),
        )?;

        info!(model = %config.openai.default_model, "OpenAI provider initialized");

        Ok(Self {
            client,
            default_model: config.openai.default_model.clone(),
            defaults: config.llm.clone(),
        })
    }
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
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
impl ProviderAdapter for OpenAiProvider {
    fn tag(&self) -> ProviderTag {
        ProviderTag::OpenAi
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn generate_reply(
        &self,
        messages: &[Message],
        request: &ProviderRequest,
    ) -> Result<String, JaniError> {
        let model = request
            .model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&self.default_model);
        if model.trim().is_empty() {
            return Err(JaniError::Config("OpenAI model is not specified".into()));
        }

        let stop = (supports_stop(model) && !request.stop.is_empty())
            .then_some(request.stop.as_slice());
        let api_request = ChatRequest {
            model,
            messages,
            temperature: request.temperature.unwrap_or(self.defaults.temperature),
            top_p: request.top_p.unwrap_or(self.defaults.top_p),
            max_tokens: request
                .bounded_max_tokens()
                .or((self.defaults.max_tokens > 0).then_some(self.defaults.max_tokens)),
            stop,
        };
        debug!(
            model,
            temperature = api_request.temperature,
            messages = ?messages,
            "OpenAI input"
        );

        let started = Instant::now();
        let response = self.client.complete(&api_request).await?;
        let duration_ms = started.elapsed().as_millis() as u64;
        let stop_count = stop.map_or(0, <[String]>::len);

        let Some(content) = response.content() else {
            error!(
                duration_ms,
                model,
                stop_count,
                choices = response.choices.len(),
                finish_reason = response.finish_reason(),
                "OpenAI returned empty response"
            );
            return Err(JaniError::EmptyResponse {
                provider: PROVIDER_NAME.into(),
            });
        };

        debug!(duration_ms, usage = ?response.usage, content = %content, "OpenAI output");
        Ok(content)
    }
}

fn resolve_api_key(config_key: Option<&str>) -> Result<String, JaniError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.to_string());
    }

    std::env::var("OPENAI_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            JaniError::Config(
                "OpenAI API key not found. Set openai.api_key in config or OPENAI_API_KEY environment variable.".into(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: &str) -> OpenAiProvider {
        let mut config = JaniConfig::default();
        config.openai.api_key = Some("sk-openai-test".into());
        config.openai.base_url = base_url.to_string();
        OpenAiProvider::new(&config).unwrap()
    }

    fn ok_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}, "finish_reason": "stop"}],
            "usage": {"total_tokens": 12}
        })
    }

    async fn sent_body(server: &MockServer) -> serde_json::Value {
        let received = server.received_requests().await.unwrap();
        serde_json::from_slice(&received[0].body).unwrap()
    }

    #[tokio::test]
    async fn sends_bearer_and_trims_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-openai-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "system", "content": "be kind"}, {"role": "user", "content": "hi"}],
                "stop": ["\nUser:"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("\n hello \n")))
            .expect(1)
            .mount(&server)
            .await;

        let mut request = ProviderRequest::for_provider(ProviderTag::OpenAi);
        request.stop = vec!["\nUser:".into()];
        let reply = provider(&server.uri())
            .generate_reply(&[Message::system("be kind"), Message::user("hi")], &request)
            .await
            .unwrap();
        assert_eq!(reply, "hello");
    }

    #[tokio::test]
    async fn gpt5_models_never_send_stop() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("ok")))
            .mount(&server)
            .await;

        let mut request = ProviderRequest::default();
        request.model = Some("gpt-5-mini".into());
        request.stop = vec!["User:".into()];
        request.repetition_penalty = Some(1.3);
        provider(&server.uri())
            .generate_reply(&[Message::user("hi")], &request)
            .await
            .unwrap();

        let body = sent_body(&server).await;
        assert_eq!(body["model"], "gpt-5-mini");
        assert!(body.get("stop").is_none());
        assert!(body.get("repetition_penalty").is_none());
        assert!(body.get("max_tokens").is_none());
    }

    #[tokio::test]
    async fn positive_max_tokens_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("ok")))
            .mount(&server)
            .await;

        let mut request = ProviderRequest::default();
        request.max_tokens = Some(300);
        provider(&server.uri())
            .generate_reply(&[Message::user("hi")], &request)
            .await
            .unwrap();
        assert_eq!(sent_body(&server).await["max_tokens"], 300);
    }

    #[tokio::test]
    async fn empty_content_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("   ")))
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .generate_reply(&[Message::user("hi")], &ProviderRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, JaniError::EmptyResponse { ref provider } if provider == "openai"));
    }

    #[tokio::test]
    async fn invalid_json_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .generate_reply(&[Message::user("hi")], &ProviderRequest::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to parse OpenAI response"));
    }

    #[tokio::test]
    async fn error_status_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .generate_reply(&[Message::user("hi")], &ProviderRequest::default())
            .await
            .unwrap_err();
        match err {
            JaniError::Provider { status, message, .. } => {
                assert_eq!(status, Some(429));
                assert!(message.contains("rate limited"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn blank_model_fails_before_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("ok")))
            .expect(0)
            .mount(&server)
            .await;

        let mut config = JaniConfig::default();
        config.openai.api_key = Some("sk-openai-test".into());
        config.openai.base_url = server.uri();
        config.openai.default_model = String::new();
        let err = OpenAiProvider::new(&config)
            .unwrap()
            .generate_reply(&[Message::user("hi")], &ProviderRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, JaniError::Config(ref m) if m.contains("model is not specified")));
    }
}
