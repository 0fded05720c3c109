// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde attributes cannot express: URL shapes,
//! sampling ranges and cross-field token budgets.

use crate::diagnostic::ConfigError;
use crate::model::JaniConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first.
pub fn validate_config(config: &JaniConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.agent.name.trim().is_empty() {
        errors.push(validation("agent.name must not be empty".to_string()));
    }

    for (key, url) in [
        ("openrouter.base_url", &config.openrouter.base_url),
        ("gemini.base_url", &config.gemini.base_url),
        ("openai.base_url", &config.openai.base_url),
        ("notifier.api_base", &config.notifier.api_base),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(validation(format!(
                "{key} must be an http(s) URL, got `{url}`"
            )));
        }
    }

    for (key, model) in [
        ("openrouter.default_model", &config.openrouter.default_model),
        ("gemini.default_model", &config.gemini.default_model),
        ("openai.default_model", &config.openai.default_model),
    ] {
        if model.trim().is_empty() {
            errors.push(validation(format!("{key} must not be empty")));
        }
    }

    for (key, secs) in [
        ("openrouter.timeout_secs", config.openrouter.timeout_secs),
        ("gemini.timeout_secs", config.gemini.timeout_secs),
        ("openai.timeout_secs", config.openai.timeout_secs),
    ] {
        if secs == 0 {
            errors.push(validation(format!("{key} must be at least 1")));
        }
    }

    for (key, value) in [
        ("llm.temperature", config.llm.temperature),
        ("chat.temperature", config.chat.temperature),
        ("memory.extraction_temperature", config.memory.extraction_temperature),
    ] {
        if !(0.0..=2.0).contains(&value) {
            errors.push(validation(format!(
                "{key} must be between 0.0 and 2.0, got {value}"
            )));
        }
    }

    for (key, value) in [("llm.top_p", config.llm.top_p), ("chat.top_p", config.chat.top_p)] {
        if !(value > 0.0 && value <= 1.0) {
            errors.push(validation(format!(
                "{key} must be in (0.0, 1.0], got {value}"
            )));
        }
    }

    for (key, value) in [
        ("llm.repetition_penalty", config.llm.repetition_penalty),
        ("chat.repetition_penalty", config.chat.repetition_penalty),
    ] {
        if value <= 0.0 {
            errors.push(validation(format!("{key} must be positive, got {value}")));
        }
    }

    if config.chat.history_limit == 0 {
        errors.push(validation("chat.history_limit must be at least 1".to_string()));
    }

    if config.chat.token_budget > 0 && config.chat.response_reserve >= config.chat.token_budget {
        errors.push(validation(format!(
            "chat.response_reserve ({}) must be smaller than chat.token_budget ({})",
            config.chat.response_reserve, config.chat.token_budget
        )));
    }

    if config.memory.enabled && config.memory.max_per_pair == 0 {
        errors.push(validation(
            "memory.max_per_pair must be at least 1 when memory is enabled".to_string(),
        ));
    }

    if config.notifier.bot_token.is_some() && config.notifier.admin_telegram_ids.is_empty() {
        tracing::warn!("notifier.bot_token is set but notifier.admin_telegram_ids is empty");
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validation(message: String) -> ConfigError {
    ConfigError::Validation { message }
}
