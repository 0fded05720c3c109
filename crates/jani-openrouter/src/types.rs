// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the OpenRouter chat-completions API.

use jani_core::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for `POST {base}/chat/completions`. `None` fields are omitted.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<&'a [String]>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

/// Non-streaming response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ResponseMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Assistant message. Reasoning models may leave `content` empty and put
/// the answer in one of the reasoning fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub reasoning_details: Option<Vec<Value>>,
}

impl ResponseMessage {
    /// First non-empty candidate among, in order: string content, content
    /// parts joined by `\n`, `reasoning_content`, `reasoning`, and
    /// `reasoning_details[].text` joined by `\n`. Trimmed.
    pub fn pick_content(&self) -> Option<String> {
        match &self.content {
            Some(Value::String(text)) if !text.trim().is_empty() => {
                return Some(text.trim().to_string());
            }
            Some(Value::Array(parts)) => {
                let joined = join_texts(parts.iter().map(|part| match part {
                    Value::String(s) => s.as_str(),
                    other => other.get("text").and_then(Value::as_str).unwrap_or(""),
                }));
                if !joined.is_empty() {
                    return Some(joined);
                }
            }
            _ => {}
        }

        for candidate in [&self.reasoning_content, &self.reasoning] {
            if let Some(text) = candidate.as_deref().map(str::trim)
                && !text.is_empty()
            {
                return Some(text.to_string());
            }
        }

        let details = self.reasoning_details.as_deref().unwrap_or_default();
        let joined = join_texts(
            details
                .iter()
                .map(|d| d.get("text").and_then(Value::as_str).unwrap_or("")),
        );
        (!joined.is_empty()).then_some(joined)
    }
}

fn join_texts<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
