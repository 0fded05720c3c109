// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the OpenAI chat-completions endpoint.

use std::time::Duration;

use jani_core::JaniError;
use jani_core::error::{MAX_ERROR_BODY_CHARS, truncate_chars};
use jani_security::transport_error;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, error};

use crate::types::{ChatRequest, ChatResponse};

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    endpoint: String,
}

impl OpenAiClient {
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, JaniError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| JaniError::Config(format!("invalid OpenAI API key header value: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| JaniError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        })
    }

    pub async fn complete(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, JaniError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error("OpenAI request failed", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error("failed to read OpenAI response", e))?;
        debug!(status = %status, bytes = body.len(), "OpenAI response received");

        if !status.is_success() {
            let err = JaniError::http_status(status.as_u16(), &body);
            error!(status = status.as_u16(), model = request.model, error = %err, "OpenAI request failed");
            return Err(err);
        }

        serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                body = truncate_chars(&body, MAX_ERROR_BODY_CHARS),
                "OpenAI response parse failed"
            );
            JaniError::parse("failed to parse OpenAI response", e)
        })
    }
}
