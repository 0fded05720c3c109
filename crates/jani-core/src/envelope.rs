// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Action envelope extraction from free-form LLM output.
//!
//! Models may answer with a JSON object separating narration from
//! machine-actionable directives:
//!
//! ```json
//! {"user_visible_text": "…", "actions": [{"type": "SET_FLAG", "flag": "met"}], "summary": "…"}
//! ```
//!
//! Two entry points share the same decoding:
//! [`parse_envelope_lenient`] returns `None` for anything that is not an
//! envelope, while [`parse_envelope_strict`] reports an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::JaniError;

/// A machine-actionable directive attached to a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Offer an inventory item to the user.
    OfferItem {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        item_slug: Option<String>,
        #[serde(default, alias = "reason_ru", skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Consume an inventory item.
    ConsumeItem {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        item_slug: Option<String>,
    },
    /// Set a named story flag.
    SetFlag {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        flag: Option<String>,
    },
    /// Advance the story graph to a node.
    ProgressStory {
        #[serde(default, alias = "story_node_id", skip_serializing_if = "Option::is_none")]
        node_id: Option<String>,
    },
}

/// Structured reply: visible narration plus ordered actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEnvelope {
    pub user_visible_text: String,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Attempts to read an envelope, returning `None` instead of failing.
///
/// Any JSON object with a string `user_visible_text` qualifies. Individual
/// actions that do not decode are dropped with a warning rather than
/// discarding the whole envelope.
pub fn parse_envelope_lenient(raw: &str) -> Option<ActionEnvelope> {
    let value = decode_object(raw)?;
    let text = value.get("user_visible_text")?.as_str()?.to_string();

    let actions = match value.get("actions") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match Action::deserialize(item) {
                Ok(action) => Some(action),
                Err(e) => {
                    warn!(error = %e, action = %item, "dropping unrecognized envelope action");
                    None
                }
            })
            .collect(),
        _ => Vec::new(),
    };

    let summary = value
        .get("summary")
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(ActionEnvelope {
        user_visible_text: text,
        actions,
        summary,
    })
}

/// Parses an envelope, failing on anything that does not validate.
///
/// Unlike the lenient variant, unknown action types are an error.
pub fn parse_envelope_strict(raw: &str) -> Result<ActionEnvelope, JaniError> {
    let value = decode_object(raw).ok_or_else(|| JaniError::Parse {
        message: "unable to parse action envelope: not a JSON object".into(),
        source: None,
    })?;

    serde_json::from_value::<ActionEnvelope>(value)
        .map_err(|e| JaniError::parse("unable to parse action envelope", e))
}

/// Decodes trimmed input as a JSON object.
fn decode_object(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value @ Value::Object(_)) => Some(value),
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "reply text is not a JSON envelope");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_parses_set_flag() {
        let env =
            parse_envelope_strict(r#"{"user_visible_text":"hi","actions":[{"type":"SET_FLAG","flag":"x"}]}"#)
                .unwrap();
        assert_eq!(env.user_visible_text, "hi");
        assert_eq!(
            env.actions,
            vec![Action::SetFlag {
                flag: Some("x".into())
            }]
        );
        assert!(env.summary.is_none());
    }

    #[test]
    fn strict_rejects_missing_visible_text() {
        let err = parse_envelope_strict(r#"{"foo":"bar"}"#).unwrap_err();
        assert!(err.to_string().contains("unable to parse action envelope"), "got: {err}");
    }

    #[test]
    fn lenient_returns_none_for_malformed_input() {
        assert!(parse_envelope_lenient(r#"{"foo":"bar"}"#).is_none());
        assert!(parse_envelope_lenient("just prose").is_none());
        assert!(parse_envelope_lenient("[1,2,3]").is_none());
        assert!(parse_envelope_lenient(r#"{"user_visible_text": 5}"#).is_none());
        assert!(parse_envelope_lenient(r#"{"user_visible_text": "cut"#).is_none());
    }

    #[test]
    fn strict_rejects_unknown_action_type() {
        let raw = r#"{"user_visible_text":"hi","actions":[{"type":"TELEPORT"}]}"#;
        assert!(parse_envelope_strict(raw).is_err());
    }

    #[test]
    fn lenient_drops_unknown_actions_but_keeps_envelope() {
        let raw = r#"{"user_visible_text":"hi","actions":[{"type":"TELEPORT"},{"type":"CONSUME_ITEM","item_slug":"apple"}]}"#;
        let env = parse_envelope_lenient(raw).unwrap();
        assert_eq!(
            env.actions,
            vec![Action::ConsumeItem {
                item_slug: Some("apple".into())
            }]
        );
    }

    #[test]
    #[tracing_test::traced_test]
    fn lenient_logs_dropped_actions() {
        let raw = r#"{"user_visible_text":"hi","actions":[{"type":"DANCE"}]}"#;
        let env = parse_envelope_lenient(raw).unwrap();
        assert!(env.actions.is_empty());
        assert!(logs_contain("dropping unrecognized envelope action"));
    }

    #[test]
    fn all_action_types_decode() {
        let raw = r#"{
            "user_visible_text": "Take this.",
            "actions": [
                {"type": "OFFER_ITEM", "item_slug": "rose", "reason_ru": "подарок"},
                {"type": "CONSUME_ITEM", "item_slug": "key"},
                {"type": "SET_FLAG", "flag": "gift_given"},
                {"type": "PROGRESS_STORY", "node_id": "chapter-2"}
            ],
            "summary": "Gave a rose."
        }"#;
        let env = parse_envelope_strict(raw).unwrap();
        assert_eq!(env.actions.len(), 4);
        assert_eq!(
            env.actions[0],
            Action::OfferItem {
                item_slug: Some("rose".into()),
                reason: Some("подарок".into()),
            }
        );
        assert_eq!(
            env.actions[3],
            Action::ProgressStory {
                node_id: Some("chapter-2".into())
            }
        );
        assert_eq!(env.summary.as_deref(), Some("Gave a rose."));
    }

    #[test]
    fn actions_default_to_empty_and_whitespace_is_trimmed() {
        let env = parse_envelope_strict("\n  {\"user_visible_text\":\"hello\"}  \n").unwrap();
        assert!(env.actions.is_empty());
    }

    #[test]
    fn type_specific_fields_are_optional() {
        let env = parse_envelope_strict(r#"{"user_visible_text":"x","actions":[{"type":"PROGRESS_STORY"}]}"#)
            .unwrap();
        assert_eq!(env.actions, vec![Action::ProgressStory { node_id: None }]);
    }
}
