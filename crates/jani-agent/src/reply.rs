// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shaping of raw model output into the reply shown to the user.
//!
//! Characters are prompted to answer with a JSON object:
//!
//! ```json
//! {"reply": "…", "thoughts": "…", "mood": "playful",
//!  "relationship_delta": {"trust": 2, "affection": 3}}
//! ```
//!
//! Models often wrap the object in prose or cut it off, so extraction is
//! forgiving and falls back to the raw text.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

/// Bound applied to every relationship delta component.
pub const MAX_DELTA: i32 = 10;

const MAX_PARSE_ATTEMPTS: usize = 3;

static REPLY_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)\{.*"reply".*\}"#).unwrap());

/// Relationship change reported by the model, per dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelationshipDelta {
    pub attraction: Option<i32>,
    pub trust: Option<i32>,
    pub affection: Option<i32>,
    pub dominance: Option<i32>,
}

impl RelationshipDelta {
    /// Sum of the reported components.
    pub fn total(&self) -> i32 {
        [self.attraction, self.trust, self.affection, self.dominance]
            .into_iter()
            .flatten()
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(fields) => {
                let component = |name: &str| fields.get(name).and_then(Value::as_f64).map(clamp_delta);
                Self {
                    attraction: component("attraction"),
                    trust: component("trust"),
                    affection: component("affection"),
                    dominance: component("dominance"),
                }
            }
            Value::Number(n) => {
                let delta = n.as_f64().map(clamp_delta).unwrap_or(0);
                if delta == 0 {
                    return Self::default();
                }
                // Legacy single score: all of it to affection, half to trust.
                Self {
                    affection: Some(delta),
                    trust: Some(round_half_up(f64::from(delta) * 0.5)),
                    ..Self::default()
                }
            }
            _ => Self::default(),
        }
    }
}

/// Output of [`parse_json_reply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    pub reply: String,
    pub thoughts: Option<String>,
    pub mood: Option<String>,
    pub delta: RelationshipDelta,
}

impl ParsedReply {
    fn raw(text: &str) -> Self {
        Self {
            reply: text.to_string(),
            thoughts: None,
            mood: None,
            delta: RelationshipDelta::default(),
        }
    }
}

/// Extracts the structured reply from model output.
///
/// Looks for the span from the first `{` to the last `}` containing
/// `"reply"`. When it does not parse, the span is cut back to the previous
/// `}` and retried. Anything unusable yields the raw text unchanged.
pub fn parse_json_reply(raw: &str) -> ParsedReply {
    let Some(found) = REPLY_OBJECT.find(raw) else {
        debug!(raw_len = raw.len(), "no JSON reply object in model output");
        return ParsedReply::raw(raw);
    };

    let mut candidate = found.as_str();
    let mut parsed = None;
    for _ in 0..MAX_PARSE_ATTEMPTS {
        match serde_json::from_str::<Value>(candidate) {
            Ok(value) => {
                parsed = Some(value);
                break;
            }
            Err(_) => match candidate[..candidate.len() - 1].rfind('}') {
                Some(idx) if idx > 0 => candidate = &candidate[..=idx],
                _ => break,
            },
        }
    }

    let Some(value) = parsed else {
        warn!(raw_len = raw.len(), "JSON reply object did not parse, using raw text");
        return ParsedReply::raw(raw);
    };

    let reply = match value.get("reply").and_then(Value::as_str) {
        Some(reply) if !reply.is_empty() => reply.to_string(),
        _ => {
            warn!("JSON reply object has no usable reply field");
            return ParsedReply::raw(raw);
        }
    };

    let text_field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    ParsedReply {
        reply,
        thoughts: text_field("thoughts"),
        mood: text_field("mood"),
        delta: value
            .get("relationship_delta")
            .map(RelationshipDelta::from_value)
            .unwrap_or_default(),
    }
}

/// Removes speaker prefixes and anything the model wrote on the user's behalf.
///
/// A leading `Name:` / `Name -` is stripped (case-insensitive). The text is
/// cut at the first `User:`, `Пользователь:`, `@username:` or `username:`.
pub fn sanitize_reply(reply: &str, character_name: &str, username: Option<&str>) -> String {
    let mut cleaned = reply.trim();

    if let Ok(speaker) = Regex::new(&format!(r"(?i)^{}\s*[:\-]*\s*", regex::escape(character_name)))
        && let Some(m) = speaker.find(cleaned)
    {
        cleaned = &cleaned[m.end()..];
    }

    let mut markers = vec!["User:".to_string(), "Пользователь:".to_string()];
    if let Some(name) = username.filter(|n| !n.is_empty()) {
        markers.push(format!("@{name}:"));
        markers.push(format!("{name}:"));
    }

    for marker in &markers {
        let Ok(pattern) = Regex::new(&format!("(?i){}", regex::escape(marker))) else {
            continue;
        };
        if let Some(m) = pattern.find(cleaned) {
            cleaned = cleaned[..m.start()].trim();
            break;
        }
    }

    cleaned.trim().to_string()
}

/// Text returned to the caller: thoughts, a blank line, then the reply.
pub fn compose_reply(thoughts: Option<&str>, cleaned: &str) -> String {
    match thoughts {
        Some(thoughts) => format!("{thoughts}\n\n{cleaned}"),
        None => cleaned.to_string(),
    }
}

fn clamp_delta(value: f64) -> i32 {
    round_half_up(value.clamp(-f64::from(MAX_DELTA), f64::from(MAX_DELTA)))
}

fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}
