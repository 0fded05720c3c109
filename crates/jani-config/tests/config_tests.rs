// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Jani configuration system.

use jani_config::diagnostic::ConfigError;
use jani_config::model::JaniConfig;
use jani_config::{load_and_validate_str, load_config_from_str};
use jani_core::ProviderTag;
use miette::Diagnostic;

#[test]
fn valid_toml_deserializes_into_jani_config() {
    let toml = r#"
[agent]
name = "jani-staging"
log_level = "debug"

[auth]
bot_token = "123456:ABC"
max_age_secs = 3600

[openrouter]
api_key = "sk-or-123"
default_model = "mistralai/mistral-nemo"
referer = "https://jani.example"
title = "Jani"

[gemini]
default_model = "gemini-1.5-pro"

[llm]
default_provider = "gemini"
max_tokens = 512

[chat]
free_daily_message_limit = 10
history_limit = 20
token_budget = 4096

[cache]
ttl_secs = 0

[memory]
enabled = false

[notifier]
bot_token = "999:XYZ"
admin_telegram_ids = [111, 222]

[gateway]
host = "0.0.0.0"
port = 8080
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.agent.name, "jani-staging");
    assert_eq!(config.agent.log_level, "debug");
    assert_eq!(config.auth.bot_token.as_deref(), Some("123456:ABC"));
    assert_eq!(config.auth.max_age_secs, 3600);
    assert_eq!(config.openrouter.api_key.as_deref(), Some("sk-or-123"));
    assert_eq!(config.openrouter.default_model, "mistralai/mistral-nemo");
    assert_eq!(config.openrouter.title.as_deref(), Some("Jani"));
    assert_eq!(config.gemini.default_model, "gemini-1.5-pro");
    assert_eq!(config.llm.default_provider, ProviderTag::Gemini);
    assert_eq!(config.llm.max_tokens, 512);
    assert_eq!(config.chat.free_daily_message_limit, 10);
    assert_eq!(config.chat.history_limit, 20);
    assert_eq!(config.chat.token_budget, 4096);
    assert_eq!(config.cache.ttl_secs, 0);
    assert!(!config.memory.enabled);
    assert_eq!(config.notifier.admin_telegram_ids, vec![111, 222]);
    assert_eq!(config.gateway.host, "0.0.0.0");
    assert_eq!(config.gateway.port, 8080);
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.agent.name, "jani");
    assert_eq!(config.agent.log_level, "info");
    assert!(config.auth.bot_token.is_none());
    assert_eq!(config.auth.max_age_secs, 86_400);
    assert_eq!(config.openrouter.base_url, "https://openrouter.ai/api/v1");
    assert_eq!(config.openrouter.default_model, "openrouter/auto");
    assert_eq!(config.openrouter.timeout_secs, 300);
    assert_eq!(config.gemini.base_url, "https://generativelanguage.googleapis.com");
    assert_eq!(config.gemini.default_model, "gemini-2.0-flash");
    assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
    assert_eq!(config.openai.default_model, "gpt-4o-mini");
    assert_eq!(config.llm.default_provider, ProviderTag::OpenRouter);
    assert_eq!(config.llm.max_tokens, 0);
    assert!(config.chat.enable_message_limit);
    assert_eq!(config.chat.free_daily_message_limit, 50);
    assert_eq!(config.chat.history_limit, 60);
    assert_eq!(config.chat.token_budget, 0);
    assert_eq!(config.chat.response_reserve, 450);
    assert_eq!(config.chat.stop_sequences.len(), 3);
    assert_eq!(config.cache.ttl_secs, 30);
    assert!(config.memory.enabled);
    assert_eq!(config.memory.max_per_pair, 50);
    assert_eq!(config.memory.extraction_max_tokens, 300);
    assert!(config.notifier.admin_telegram_ids.is_empty());
    assert_eq!(config.notifier.api_base, "https://api.telegram.org");
    assert_eq!(config.gateway.port, 3000);
}

#[test]
fn unknown_field_in_section_produces_error() {
    let toml = r#"
[openrouter]
api_kye = "abc"
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("api_kye"),
        "error should mention unknown field, got: {err_str}"
    );
}

#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[anthropic]
api_key = "x"
"#;

    let err = load_config_from_str(toml).expect_err("unknown top-level section should be rejected");
    assert!(format!("{err}").contains("anthropic") || format!("{err}").contains("unknown field"));
}

#[test]
fn dotted_override_sets_nested_key() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: JaniConfig = Figment::new()
        .merge(Serialized::defaults(JaniConfig::default()))
        .merge(Toml::string("[openai]\ndefault_model = \"gpt-4o\"\n"))
        .merge(("openai.default_model", "gpt-5-mini"))
        .extract()
        .expect("should merge override");

    assert_eq!(config.openai.default_model, "gpt-5-mini");
}

#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: JaniConfig = Figment::new()
        .merge(Serialized::defaults(JaniConfig::default()))
        .merge(Toml::file("/nonexistent/path/jani.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.agent.name, "jani");
}

#[test]
fn diagnostic_error_includes_suggestion_and_valid_keys() {
    let toml = r#"
[chat]
histroy_limit = 10
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let found = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "histroy_limit"
                && suggestion.as_deref() == Some("history_limit")
                && valid_keys.contains("free_daily_message_limit")
        })
    });
    assert!(found, "expected UnknownKey with suggestion, got: {errors:?}");
}

#[test]
fn invalid_type_is_reported() {
    let toml = r#"
[gateway]
port = "eighty"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("port"))),
        "got: {errors:?}"
    );
}

#[test]
fn unknown_provider_tag_is_rejected() {
    let toml = r#"
[llm]
default_provider = "anthropic"
"#;
    assert!(load_config_from_str(toml).is_err());
}

#[test]
fn config_error_renders_with_miette() {
    use miette::GraphicalReportHandler;

    let error = ConfigError::UnknownKey {
        key: "api_kye".to_string(),
        section: Some("openai".to_string()),
        suggestion: Some("api_key".to_string()),
        valid_keys: "api_key, base_url".to_string(),
        span: None,
        src: None,
    };

    assert!(error.code().is_some());
    let help = error.help().expect("should have help").to_string();
    assert!(help.contains("did you mean `api_key`"), "got: {help}");

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render");
    assert!(buf.contains("openai.api_kye"));
}

#[test]
fn key_under_wrong_section_names_the_owning_sections() {
    let toml = "[chat]\nbot_token = \"123:abc\"\n";
    let errors = load_and_validate_str(toml).expect_err("bot_token is not a chat key");
    let misplaced = errors.iter().find_map(|e| match e {
        ConfigError::MisplacedKey {
            key,
            section,
            belongs_to,
            span,
            ..
        } => Some((key.clone(), section.clone(), belongs_to.clone(), span.is_some())),
        _ => None,
    });
    let (key, section, belongs_to, has_span) = misplaced.expect("expected MisplacedKey");
    assert_eq!(key, "bot_token");
    assert_eq!(section, "chat");
    assert_eq!(belongs_to, vec!["auth", "notifier"]);
    assert!(has_span, "key should be located in the source");

    let help = errors[0].help().map(|h| h.to_string()).unwrap_or_default();
    assert_eq!(help, "move it under [auth] or [notifier]");
}

#[test]
fn misspelled_section_is_suggested() {
    let errors = load_and_validate_str("[openroutr]\napi_key = \"k\"\n").expect_err("unknown section");
    assert!(
        errors.iter().any(|e| matches!(e,
            ConfigError::UnknownKey { key, section: None, suggestion, .. }
                if key == "openroutr" && suggestion.as_deref() == Some("openrouter"))),
        "got: {errors:?}"
    );
}

#[test]
fn secret_values_are_not_echoed_in_type_errors() {
    let errors = load_and_validate_str("[openai]\napi_key = 987654321\n").expect_err("wrong type");
    let rendered: Vec<String> = errors.iter().map(ToString::to_string).collect();
    assert!(
        errors.iter().any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key == "openai.api_key")),
        "got: {rendered:?}"
    );
    assert!(rendered.iter().all(|r| !r.contains("987654321")), "got: {rendered:?}");

    // Non-secret values are still shown.
    let errors = load_and_validate_str("[gateway]\nport = \"eighty\"\n").expect_err("wrong type");
    assert!(errors.iter().any(|e| e.to_string().contains("eighty")));
}

#[test]
fn section_key_table_matches_model() {
    use jani_config::diagnostic::SECTION_KEYS;
    use std::collections::BTreeSet;

    fn accepted(errors: &[ConfigError]) -> BTreeSet<String> {
        errors
            .iter()
            .find_map(|e| match e {
                ConfigError::UnknownKey { valid_keys, .. } => {
                    Some(valid_keys.split(", ").map(str::to_string).collect())
                }
                _ => None,
            })
            .expect("expected UnknownKey")
    }

    let root = load_and_validate_str("[zz_section]\nx = 1\n").expect_err("unknown section");
    let sections: BTreeSet<String> = SECTION_KEYS.iter().map(|(s, _)| s.to_string()).collect();
    assert_eq!(accepted(&root), sections);

    for (section, keys) in SECTION_KEYS {
        let toml = format!("[{section}]\nzz_not_a_key = 1\n");
        let errors = load_and_validate_str(&toml).expect_err("unknown key");
        let expected: BTreeSet<String> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(accepted(&errors), expected, "section [{section}]");
    }
}

#[test]
fn validation_runs_after_deserialization() {
    let toml = r#"
[chat]
token_budget = 300
response_reserve = 450
"#;

    let errors = load_and_validate_str(toml).expect_err("reserve larger than budget");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("token_budget"))
    ));
}

#[test]
fn load_and_validate_path_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jani.toml");
    std::fs::write(&path, "[gateway]\nport = 9090\n").unwrap();

    let config = jani_config::load_and_validate_path(&path).expect("file should load");
    assert_eq!(config.gateway.port, 9090);
}
