// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Gemini provider adapter.
//!
//! Gemini keeps system text out of the turn list: system messages are
//! collected into `systemInstruction` and the remaining turns are remapped
//! to the `user`/`model` roles. Streaming is not used; the trait's default
//! `stream_reply` delivers the whole reply as one token.

pub mod client;
pub mod types;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jani_config::JaniConfig;
use jani_config::model::LlmConfig;
use jani_core::traits::{PluginAdapter, ProviderAdapter};
use jani_core::types::{AdapterType, HealthStatus};
use jani_core::{JaniError, Message, ProviderRequest, ProviderTag, Role};
use tracing::{debug, error, info};

use crate::client::GeminiClient;
use crate::types::{
    Content, GenerateContentRequest, GenerationConfig, Part, SystemInstruction,
    permissive_safety_settings,
};

const PROVIDER_NAME: &str = "gemini";

/// Gemini adapter. Key resolution: `gemini.api_key` -> `GEMINI_API_KEY`.
pub struct GeminiProvider {
    client: GeminiClient,
    default_model: String,
    defaults: LlmConfig,
}

impl GeminiProvider {
    pub fn new(config: &JaniConfig) -> Result<Self, JaniError> {
        let api_key = resolve_api_key(config.gemini.api_key.as_deref())?;
        let client = GeminiClient::new(
            api_key,
            &config.gemini.base_url,
            Duration::from_secs(config.gemini.timeout_secs),
        )?;

        info!(model = %config.gemini.default_model, "Gemini provider initialized");

        Ok(Self {
            client,
            default_model: config.gemini.default_model.clone(),
            defaults: config.llm.clone(),
        })
    }

    fn to_request<'a>(
        &self,
        messages: &'a [Message],
        request: &'a ProviderRequest,
    ) -> GenerateContentRequest<'a> {
        let system_parts: Vec<Part<'a>> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| Part { text: &m.content })
            .collect();

        let contents = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| Content {
                role: if m.role == Role::User { "user" } else { "model" },
                parts: vec![Part { text: &m.content }],
            })
            .collect();

        let max_output_tokens = request
            .bounded_max_tokens()
            .or((self.defaults.max_tokens > 0).then_some(self.defaults.max_tokens));

        GenerateContentRequest {
            contents,
            generation_config: GenerationConfig {
                temperature: request.temperature.unwrap_or(self.defaults.temperature),
                top_p: request.top_p.unwrap_or(self.defaults.top_p),
                stop_sequences: (!request.stop.is_empty()).then_some(request.stop.as_slice()),
                max_output_tokens,
            },
            safety_settings: permissive_safety_settings(),
            system_instruction: (!system_parts.is_empty())
                .then_some(SystemInstruction { parts: system_parts }),
        }
    }
}

#[async_trait]
impl PluginAdapter for GeminiProvider {
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
impl ProviderAdapter for GeminiProvider {
    fn tag(&self) -> ProviderTag {
        ProviderTag::Gemini
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
            return Err(JaniError::Config("Gemini model is not specified".into()));
        }

        let api_request = self.to_request(messages, request);
        debug!(
            model,
            temperature = api_request.generation_config.temperature,
            messages = ?messages,
            "Gemini input"
        );

        let started = Instant::now();
        let response = self.client.generate_content(model, &api_request).await?;
        let duration_ms = started.elapsed().as_millis() as u64;

        match response.first_text() {
            Some(text) => {
                debug!(duration_ms, usage = ?response.usage_metadata, content = %text, "Gemini output");
                Ok(text)
            }
            None => {
                let finish_reason = response.finish_reason();
                error!(duration_ms, finish_reason, "Gemini returned no text");
                if let Some(reason) = response.block_reason() {
                    return Err(JaniError::ContentBlocked {
                        reason: reason.to_string(),
                    });
                }
                Err(JaniError::EmptyResponse {
                    provider: PROVIDER_NAME.into(),
                })
            }
        }
    }
}

fn resolve_api_key(config_key: Option<&str>) -> Result<String, JaniError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.to_string());
    }

    std::env::var("GEMINI_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            JaniError::Config(
                "Gemini API key not found. Set gemini.api_key in config or GEMINI_API_KEY environment variable.".into(),
            )
        })
}
