// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Jani chat service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use jani_core::ProviderTag;
use serde::{Deserialize, Serialize};

/// Top-level Jani configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct JaniConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Telegram init-data verification.
    #[serde(default)]
    pub auth: AuthConfig,

    /// OpenRouter adapter settings.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Gemini adapter settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// OpenAI adapter settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Provider-independent sampling defaults.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Chat turn policy and sampling.
    #[serde(default)]
    pub chat: ChatConfig,

    /// Reply cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Long-term memory extraction.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Admin alerting over the Telegram Bot API.
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name used in logs.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "jani".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram Mini App init-data verification.
///
/// `bot_token` derives the HMAC secret; `secret_key` supplies it directly
/// and wins when both are set.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    #[serde(default)]
    pub bot_token: Option<String>,

    #[serde(default)]
    pub secret_key: Option<String>,

    /// Maximum accepted age of `auth_date` in seconds. `0` disables the check.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            secret_key: None,
            max_age_secs: default_max_age_secs(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "[REDACTED]"))
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[REDACTED]"))
            .field("max_age_secs", &self.max_age_secs)
            .finish()
    }
}

fn default_max_age_secs() -> u64 {
    86_400
}

/// OpenRouter chat-completions configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenRouterConfig {
    /// API key. Falls back to `OPENROUTER_API_KEY` when unset.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_openrouter_base_url")]
    pub base_url: String,

    #[serde(default = "default_openrouter_model")]
    pub default_model: String,

    /// Sent as `HTTP-Referer` for OpenRouter attribution.
    #[serde(default)]
    pub referer: Option<String>,

    /// Sent as `X-Title` for OpenRouter attribution.
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openrouter_base_url(),
            default_model: default_openrouter_model(),
            referer: None,
            title: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_openrouter_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_openrouter_model() -> String {
    "openrouter/auto".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

/// Gemini `generateContent` configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    /// API key. Falls back to `GEMINI_API_KEY` when unset.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    #[serde(default = "default_gemini_model")]
    pub default_model: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_gemini_base_url(),
            default_model: default_gemini_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

/// OpenAI chat-completions configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    /// API key. Falls back to `OPENAI_API_KEY` when unset.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default = "default_openai_model")]
    pub default_model: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_base_url(),
            default_model: default_openai_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Provider selection and sampling defaults for ad-hoc completions.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Provider used when a character does not name one.
    #[serde(default)]
    pub default_provider: ProviderTag,

    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_repetition_penalty")]
    pub repetition_penalty: f32,

    /// Output token cap. `0` leaves the provider default.
    #[serde(default)]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_provider: ProviderTag::default(),
            temperature: default_llm_temperature(),
            top_p: default_top_p(),
            repetition_penalty: default_repetition_penalty(),
            max_tokens: 0,
        }
    }
}

fn default_llm_temperature() -> f32 {
    0.95
}

fn default_top_p() -> f32 {
    0.9
}

fn default_repetition_penalty() -> f32 {
    1.12
}

/// Chat turn policy: quotas, history window and sampling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// Enforce the free daily quota for users without a subscription.
    #[serde(default = "default_true")]
    pub enable_message_limit: bool,

    #[serde(default = "default_free_daily_message_limit")]
    pub free_daily_message_limit: u32,

    /// Number of most recent dialog messages loaded into the prompt.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Approximate prompt token budget. `0` means unbounded.
    #[serde(default)]
    pub token_budget: usize,

    /// Tokens reserved for the reply when `token_budget` is set.
    #[serde(default = "default_response_reserve")]
    pub response_reserve: usize,

    #[serde(default = "default_chat_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_repetition_penalty")]
    pub repetition_penalty: f32,

    #[serde(default = "default_stop_sequences")]
    pub stop_sequences: Vec<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enable_message_limit: true,
            free_daily_message_limit: default_free_daily_message_limit(),
            history_limit: default_history_limit(),
            token_budget: 0,
            response_reserve: default_response_reserve(),
            temperature: default_chat_temperature(),
            top_p: default_top_p(),
            repetition_penalty: default_repetition_penalty(),
            stop_sequences: default_stop_sequences(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_free_daily_message_limit() -> u32 {
    50
}

fn default_history_limit() -> usize {
    60
}

fn default_response_reserve() -> usize {
    450
}

fn default_chat_temperature() -> f32 {
    1.02
}

fn default_stop_sequences() -> Vec<String> {
    vec![
        "User:".to_string(),
        "\nUser".to_string(),
        "\nПользователь".to_string(),
    ]
}

/// Reply cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Entry lifetime in seconds. `0` disables the cache.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    30
}

/// Long-term memory extraction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum memories stored per user/character pair.
    #[serde(default = "default_max_per_pair")]
    pub max_per_pair: usize,

    #[serde(default = "default_extraction_temperature")]
    pub extraction_temperature: f32,

    #[serde(default = "default_extraction_max_tokens")]
    pub extraction_max_tokens: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_per_pair: default_max_per_pair(),
            extraction_temperature: default_extraction_temperature(),
            extraction_max_tokens: default_extraction_max_tokens(),
        }
    }
}

fn default_max_per_pair() -> usize {
    50
}

fn default_extraction_temperature() -> f32 {
    0.3
}

fn default_extraction_max_tokens() -> u32 {
    300
}

/// Admin alerting configuration. Without a bot token alerts are disabled.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotifierConfig {
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Telegram chat ids that receive generation-failure alerts.
    #[serde(default)]
    pub admin_telegram_ids: Vec<i64>,

    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            admin_telegram_ids: Vec::new(),
            api_base: default_telegram_api_base(),
        }
    }
}

impl std::fmt::Debug for NotifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifierConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "[REDACTED]"))
            .field("admin_telegram_ids", &self.admin_telegram_ids)
            .field("api_base", &self.api_base)
            .finish()
    }
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}
