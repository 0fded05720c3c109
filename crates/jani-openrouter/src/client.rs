// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the OpenRouter chat-completions endpoint.

use std::time::Duration;

use jani_core::JaniError;
use jani_security::transport_error;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, error};

use crate::types::{ChatCompletionRequest, ChatCompletionResponse};

/// OpenRouter HTTP client. Built once; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: reqwest::Client,
    endpoint: String,
}

impl OpenRouterClient {
    /// Builds a client with auth and attribution headers baked in.
    pub fn new(
        api_key: &str,
        base_url: &str,
        referer: Option<&str>,
        title: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, JaniError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| JaniError::Config(format!("invalid OpenRouter API key header value: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(referer) = referer {
            headers.insert(
                "HTTP-Referer",
                HeaderValue::from_str(referer)
                    .map_err(|e| JaniError::Config(format!("invalid openrouter.referer: {e}")))?,
            );
        }
        if let Some(title) = title {
            headers.insert(
                "X-Title",
                HeaderValue::from_str(title)
                    .map_err(|e| JaniError::Config(format!("invalid openrouter.title: {e}")))?,
            );
        }

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

    /// Sends a non-streaming request and decodes the response body.
    pub async fn complete(
        &self,
        request: &ChatCompletionRequest<'_>,
    ) -> Result<ChatCompletionResponse, JaniError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error("OpenRouter request failed", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error("failed to read OpenRouter response", e))?;
        debug!(status = %status, bytes = body.len(), "completion response received");

        if !status.is_success() {
            let err = JaniError::http_status(status.as_u16(), &body);
            error!(status = status.as_u16(), error = %err, "OpenRouter request failed");
            return Err(err);
        }

        serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                body = jani_core::error::truncate_chars(&body, jani_core::error::MAX_ERROR_BODY_CHARS),
                "OpenRouter response parse failed"
            );
            JaniError::parse("failed to parse OpenRouter response", e)
        })
    }

    /// Opens a streaming request. The caller reads the SSE body.
    pub async fn open_stream(
        &self,
        request: &ChatCompletionRequest<'_>,
    ) -> Result<reqwest::Response, JaniError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Accept", "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error("OpenRouter stream request failed", e))?;

        let status = response.status();
        debug!(status = %status, "streaming response received");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = JaniError::http_status(status.as_u16(), &body);
            error!(status = status.as_u16(), error = %err, "OpenRouter stream request failed");
            return Err(err);
        }
        Ok(response)
    }
}
