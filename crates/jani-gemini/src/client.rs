// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for `models/{model}:generateContent`.
//!
//! The API key travels as the `key` query parameter, so URLs built here
//! must never be logged.

use std::time::Duration;

use jani_core::JaniError;
use jani_security::transport_error;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, error};

use crate::types::{GenerateContentRequest, GenerateContentResponse};

#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> Result<Self, JaniError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| JaniError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest<'_>,
    ) -> Result<GenerateContentResponse, JaniError> {
        let endpoint = format!("{}/v1beta/models/{model}:generateContent", self.base_url);
        let url = reqwest::Url::parse_with_params(&endpoint, &[("key", self.api_key.as_str())])
            .map_err(|e| JaniError::Config(format!("invalid Gemini endpoint: {e}")))?;
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error("Gemini request failed", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error("failed to read Gemini response", e))?;
        debug!(status = %status, bytes = body.len(), "generateContent response received");

        if !status.is_success() {
            let err = JaniError::http_status(status.as_u16(), &body);
            error!(status = status.as_u16(), error = %err, "Gemini request failed");
            return Err(err);
        }

        serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                body = jani_core::error::truncate_chars(&body, jani_core::error::MAX_ERROR_BODY_CHARS),
                "Gemini response parse failed"
            );
            JaniError::parse("failed to parse Gemini response", e)
        })
    }
}
