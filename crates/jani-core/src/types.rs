// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by providers, the orchestrator and the persistence seam.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::envelope::ActionEnvelope;

/// Internal user identifier assigned by the persistence layer.
pub type UserId = i64;

/// Character identifier.
pub type CharacterId = i64;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter in the registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Notifier,
    Storage,
}

// --- Prompt types ---

/// Speaker of a prompt message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One prompt message. Order within a prompt is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Vendor adapter selector stored on character configuration.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ProviderTag {
    /// OpenAI-compatible router with token streaming.
    #[default]
    OpenRouter,
    /// Gemini `generateContent` API.
    Gemini,
    /// Plain OpenAI chat completions.
    OpenAi,
}

/// Sampling options for a single generation call.
///
/// `None` fields fall back to the adapter's configured defaults; adapters
/// silently drop fields their wire format cannot express.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProviderRequest {
    pub provider: ProviderTag,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub repetition_penalty: Option<f32>,
    /// `None` or `Some(0)` leaves the completion length to the provider.
    pub max_tokens: Option<u32>,
    pub stop: Vec<String>,
}

impl ProviderRequest {
    /// Creates request options targeting the given provider.
    pub fn for_provider(provider: ProviderTag) -> Self {
        Self {
            provider,
            ..Self::default()
        }
    }

    /// Returns the positive token limit, if any.
    pub fn bounded_max_tokens(&self) -> Option<u32> {
        self.max_tokens.filter(|n| *n > 0)
    }
}

/// Final text of a generation call plus the envelope parsed from it, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub envelope: Option<ActionEnvelope>,
}

impl Completion {
    /// Wraps plain reply text, parsing an envelope leniently.
    pub fn from_text(text: String) -> Self {
        let envelope = crate::envelope::parse_envelope_lenient(&text);
        Self { text, envelope }
    }
}

// --- Identity claims ---

/// The `user` object embedded in Telegram Mini App init data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_premium: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allows_write_to_pm: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// Output of a successful claims validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthResult {
    /// External identity id taken from the embedded user, when present.
    pub identity_id: Option<i64>,
    /// `auth_date` as unix seconds.
    pub auth_timestamp: i64,
    /// All claim pairs except `hash`, in the order received.
    pub raw_claims: Vec<(String, String)>,
    pub parsed_user: Option<TelegramUser>,
}

/// Identity handed to the orchestrator by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Telegram user id.
    pub external_id: i64,
    pub username: Option<String>,
}

impl Identity {
    /// Extracts the caller identity from a validated claims set.
    pub fn from_auth(auth: &AuthResult) -> Option<Self> {
        let user = auth.parsed_user.as_ref()?;
        Some(Self {
            external_id: user.id,
            username: user.username.clone(),
        })
    }
}

// --- Persistence records ---

/// A user row as returned by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub external_id: i64,
    pub username: Option<String>,
    pub last_character_id: Option<CharacterId>,
    pub last_active_at: DateTime<Utc>,
}

/// Access tier of a character.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccessTier {
    #[default]
    Free,
    Premium,
}

/// A character definition with per-character LLM overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterRecord {
    pub id: CharacterId,
    pub name: String,
    pub system_prompt: String,
    pub is_active: bool,
    pub access: AccessTier,
    pub provider: Option<ProviderTag>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
}

impl CharacterRecord {
    pub fn is_premium(&self) -> bool {
        self.access == AccessTier::Premium
    }
}

/// Author of a stored dialog line.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DialogRole {
    User,
    Assistant,
}

impl From<DialogRole> for Role {
    fn from(role: DialogRole) -> Self {
        match role {
            DialogRole::User => Role::User,
            DialogRole::Assistant => Role::Assistant,
        }
    }
}

/// An immutable stored dialog line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogMessage {
    pub id: i64,
    pub user_id: UserId,
    pub character_id: CharacterId,
    pub role: DialogRole,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl DialogMessage {
    pub fn to_message(&self) -> Message {
        Message {
            role: self.role.into(),
            content: self.text.clone(),
        }
    }
}

/// Insert payload for a dialog line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDialogMessage {
    pub user_id: UserId,
    pub character_id: CharacterId,
    pub role: DialogRole,
    pub text: String,
}

/// Per-(user, character) conversation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub user_id: UserId,
    pub character_id: CharacterId,
    relationship_score: i32,
    pub mood: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub messages_count: u32,
}

impl ChatSession {
    /// Lower bound of the relationship score.
    pub const MIN_SCORE: i32 = 0;
    /// Upper bound of the relationship score.
    pub const MAX_SCORE: i32 = 100;
    /// Score assigned to a fresh session.
    pub const INITIAL_SCORE: i32 = 50;

    pub fn new(user_id: UserId, character_id: CharacterId) -> Self {
        Self {
            user_id,
            character_id,
            relationship_score: Self::INITIAL_SCORE,
            mood: None,
            last_message_at: None,
            messages_count: 0,
        }
    }

    pub fn relationship_score(&self) -> i32 {
        self.relationship_score
    }

    /// Sets the score, clamped to `[MIN_SCORE, MAX_SCORE]`.
    pub fn set_relationship_score(&mut self, score: i32) {
        self.relationship_score = score.clamp(Self::MIN_SCORE, Self::MAX_SCORE);
    }

    /// Shifts the score by `delta`, clamped.
    pub fn adjust_relationship(&mut self, delta: i32) {
        self.set_relationship_score(self.relationship_score.saturating_add(delta));
    }

    /// Records one completed exchange.
    pub fn record_message(&mut self, at: DateTime<Utc>) {
        self.messages_count = self.messages_count.saturating_add(1);
        self.last_message_at = Some(at);
    }
}

/// Category of a long-term memory about the user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MemoryCategory {
    Fact,
    Preference,
    Emotion,
    Relationship,
}

/// A stored memory row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: i64,
    pub user_id: UserId,
    pub character_id: CharacterId,
    pub category: MemoryCategory,
    pub content: String,
    /// 1 (trivial) to 10 (core fact).
    pub importance: u8,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMemory {
    pub user_id: UserId,
    pub character_id: CharacterId,
    pub category: MemoryCategory,
    pub content: String,
    pub importance: u8,
}

/// Context of a failed generation, sent to administrators.
#[derive(Debug, Clone)]
pub struct GenerationAlert {
    pub occurred_at: DateTime<Utc>,
    pub user_id: UserId,
    pub external_id: i64,
    pub character_id: CharacterId,
    pub character_name: String,
    pub provider: ProviderTag,
    pub model: String,
    pub user_message: String,
    pub error: String,
}
