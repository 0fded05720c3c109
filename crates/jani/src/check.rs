// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `jani check-config` and `jani verify-init-data`.

use jani_auth::InitDataValidator;
use jani_config::JaniConfig;
use jani_core::types::AuthResult;

fn configured(value: Option<&String>) -> &'static str {
    if value.is_some_and(|v| !v.is_empty()) {
        "set"
    } else {
        "not set"
    }
}

/// Summary printed by `check-config`. Secrets are reported as set or not set only.
pub fn config_summary(config: &JaniConfig) -> String {
    let mut lines = vec![
        format!("agent.name              = {}", config.agent.name),
        format!("llm.default_provider    = {}", config.llm.default_provider),
        format!(
            "openrouter              = model {}, api key {}",
            config.openrouter.default_model,
            configured(config.openrouter.api_key.as_ref())
        ),
        format!(
            "gemini                  = model {}, api key {}",
            config.gemini.default_model,
            configured(config.gemini.api_key.as_ref())
        ),
        format!(
            "openai                  = model {}, api key {}",
            config.openai.default_model,
            configured(config.openai.api_key.as_ref())
        ),
    ];

    let auth = if config.auth.secret_key.as_ref().is_some_and(|k| !k.is_empty()) {
        "secret key"
    } else if config.auth.bot_token.as_ref().is_some_and(|t| !t.is_empty()) {
        "bot token"
    } else {
        "NOT CONFIGURED (all requests will be rejected)"
    };
    lines.push(format!("auth                    = {auth}"));

    let limit = if config.chat.enable_message_limit {
        format!("{} free messages per day", config.chat.free_daily_message_limit)
    } else {
        "disabled".to_string()
    };
    lines.push(format!("chat.message_limit      = {limit}"));
    lines.push(format!("cache.ttl_secs          = {}", config.cache.ttl_secs));
    lines.push(format!(
        "memory                  = {}",
        if config.memory.enabled {
            format!("enabled, {} per pair", config.memory.max_per_pair)
        } else {
            "disabled".to_string()
        }
    ));
    let notifier_enabled = config.notifier.bot_token.as_ref().is_some_and(|t| !t.is_empty())
        && !config.notifier.admin_telegram_ids.is_empty();
    lines.push(format!(
        "notifier                = {}",
        if notifier_enabled {
            format!("{} admin(s)", config.notifier.admin_telegram_ids.len())
        } else {
            "disabled".to_string()
        }
    ));
    lines.push(format!(
        "gateway                 = {}:{}",
        config.gateway.host, config.gateway.port
    ));
    lines.join("\n")
}

pub fn check_config(config: &JaniConfig) -> i32 {
    println!("jani: configuration is valid");
    println!("{}", config_summary(config));
    0
}

pub fn verify_init_data(config: &JaniConfig, raw: &str, at: Option<i64>) -> i32 {
    let validator = InitDataValidator::from_config(&config.auth);
    let result = match at {
        Some(now) => validator.validate_at(raw, now),
        None => validator.validate(raw),
    };
    match result {
        Ok(auth) => {
            println!("{}", describe(&auth));
            0
        }
        Err(e) => {
            eprintln!("jani: init data rejected [{}]: {e}", e.code());
            1
        }
    }
}

fn describe(auth: &AuthResult) -> String {
    let signed_at = chrono::DateTime::from_timestamp(auth.auth_timestamp, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| auth.auth_timestamp.to_string());
    let user = auth
        .parsed_user
        .as_ref()
        .and_then(|u| serde_json::to_string_pretty(u).ok())
        .unwrap_or_else(|| "none".to_string());
    format!("valid init data\nauth_date: {signed_at}\nuser: {user}")
}
