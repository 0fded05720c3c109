// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns figment extraction failures into miette diagnostics about `jani.toml`.
//!
//! Every error is placed in the `[section]` it came from. An unknown key is
//! first matched against the keys of its own section ("did you mean
//! `history_limit`?"). When nothing there is close, the other sections are
//! searched, so a `bot_token` written under `[chat]` is reported as
//! belonging to `[auth]` or `[notifier]` instead of as a typo.
//!
//! Credentials never reach the rendered output: type errors on
//! [`SECRET_KEYS`] omit the offending value.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity for a suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Every `jani.toml` section with the keys it accepts.
///
/// Kept in step with [`crate::model::JaniConfig`]; the config tests check
/// each entry against the keys figment reports for that section.
pub const SECTION_KEYS: &[(&str, &[&str])] = &[
    ("agent", &["name", "log_level"]),
    ("auth", &["bot_token", "secret_key", "max_age_secs"]),
    (
        "openrouter",
        &["api_key", "base_url", "default_model", "referer", "title", "timeout_secs"],
    ),
    ("gemini", &["api_key", "base_url", "default_model", "timeout_secs"]),
    ("openai", &["api_key", "base_url", "default_model", "timeout_secs"]),
    (
        "llm",
        &["default_provider", "temperature", "top_p", "repetition_penalty", "max_tokens"],
    ),
    (
        "chat",
        &[
            "enable_message_limit",
            "free_daily_message_limit",
            "history_limit",
            "token_budget",
            "response_reserve",
            "temperature",
            "top_p",
            "repetition_penalty",
            "stop_sequences",
        ],
    ),
    ("cache", &["ttl_secs"]),
    (
        "memory",
        &["enabled", "max_per_pair", "extraction_temperature", "extraction_max_tokens"],
    ),
    ("notifier", &["bot_token", "admin_telegram_ids", "api_base"]),
    ("gateway", &["host", "port"]),
];

/// Keys whose values are credentials.
pub const SECRET_KEYS: &[&str] = &["api_key", "bot_token", "secret_key"];

/// A configuration error with diagnostic context.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key (or, at the top level, a section) that nothing accepts.
    #[error("unknown configuration key `{}`", qualified(.section.as_deref(), .key))]
    #[diagnostic(
        code(jani::config::unknown_key),
        help("{}", unknown_key_help(section.as_deref(), suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Enclosing section; `None` for a top-level table name.
        section: Option<String>,
        /// Closest valid key, if any is similar enough.
        suggestion: Option<String>,
        /// Comma-separated keys accepted at this level.
        valid_keys: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A real key written under the wrong section.
    #[error("`{key}` is not a `[{section}]` setting")]
    #[diagnostic(
        code(jani::config::misplaced_key),
        help("move it under {}", bracketed(belongs_to))
    )]
    MisplacedKey {
        key: String,
        section: String,
        /// Sections that do accept `key`.
        belongs_to: Vec<String>,
        #[label("belongs to another section")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(jani::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        /// Dotted path, e.g. `gateway.port`.
        key: String,
        detail: String,
        expected: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{}`", qualified(.section.as_deref(), .key))]
    #[diagnostic(
        code(jani::config::missing_key),
        help("{}", missing_key_help(section.as_deref(), key))
    )]
    MissingKey { key: String, section: Option<String> },

    /// A value deserialized but failed a semantic check.
    #[error("validation error: {message}")]
    #[diagnostic(code(jani::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(jani::config::other))]
    Other(String),
}

fn qualified(section: Option<&str>, key: &str) -> String {
    match section {
        Some(section) => format!("{section}.{key}"),
        None => key.to_string(),
    }
}

fn bracketed(sections: &[String]) -> String {
    sections
        .iter()
        .map(|s| format!("[{s}]"))
        .collect::<Vec<_>>()
        .join(" or ")
}

fn unknown_key_help(section: Option<&str>, suggestion: Option<&str>, valid_keys: &str) -> String {
    match (section, suggestion) {
        (None, Some(s)) => format!("did you mean the `[{s}]` section? Sections: {valid_keys}"),
        (None, None) => format!("valid sections: {valid_keys}"),
        (Some(_), Some(s)) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        (Some(section), None) => format!("valid keys in [{section}]: {valid_keys}"),
    }
}

fn missing_key_help(section: Option<&str>, key: &str) -> String {
    match section {
        Some(section) => format!("add `{key} = <value>` under [{section}] in jani.toml"),
        None => format!("add `{key} = <value>` to jani.toml"),
    }
}

/// Sections other than `current` that accept `key`.
pub fn sections_accepting(key: &str, current: Option<&str>) -> Vec<String> {
    SECTION_KEYS
        .iter()
        .filter(|(section, keys)| Some(*section) != current && keys.contains(&key))
        .map(|(section, _)| section.to_string())
        .collect()
}

pub fn is_secret_key(key: &str) -> bool {
    SECRET_KEYS.contains(&key)
}

/// Converts a `figment::Error` (which may hold several errors) into diagnostics.
///
/// `toml_sources` pairs each loaded file path with its contents so unknown
/// keys can be underlined in place.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    let mut errors = Vec::new();
    for error in err {
        let path: Vec<String> = error.path.iter().map(|s| s.to_string()).collect();
        let section = path.first().cloned();

        let converted = match &error.kind {
            Kind::UnknownField(field, expected) => {
                let (span, src) = locate(&error, &path, field, toml_sources);
                let suggestion = suggest_key(field, expected);
                let belongs_to = sections_accepting(field, section.as_deref());
                match section {
                    Some(section) if suggestion.is_none() && !belongs_to.is_empty() => {
                        ConfigError::MisplacedKey {
                            key: field.clone(),
                            section,
                            belongs_to,
                            span,
                            src,
                        }
                    }
                    section => ConfigError::UnknownKey {
                        key: field.clone(),
                        section,
                        suggestion,
                        valid_keys: expected.join(", "),
                        span,
                        src,
                    },
                }
            }
            Kind::MissingField(field) => ConfigError::MissingKey {
                key: field.to_string(),
                section,
            },
            Kind::InvalidType(actual, expected) => {
                let leaf = path.last().map(String::as_str).unwrap_or_default();
                let detail = if is_secret_key(leaf) {
                    format!("expected {expected}")
                } else {
                    format!("found {actual}, expected {expected}")
                };
                ConfigError::InvalidType {
                    key: path.join("."),
                    detail,
                    expected: expected.to_string(),
                    span: None,
                    src: None,
                }
            }
            _ => ConfigError::Other(error.to_string()),
        };
        errors.push(converted);
    }
    errors
}

/// Finds the file an error came from and the span of `field` inside it.
fn locate(
    error: &figment::error::Error,
    path: &[String],
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|source| match source {
            figment::Source::File(file) => Some(file.display().to_string()),
            _ => None,
        });

    // Inline strings carry no file metadata; fall back to the single source.
    let source = match origin {
        Some(file) => toml_sources.iter().find(|(p, _)| *p == file),
        None if toml_sources.len() == 1 => toml_sources.first(),
        None => None,
    };

    source
        .and_then(|(file, content)| {
            let offset = find_key_offset(content, path, field)?;
            Some((
                Some(SourceSpan::new(offset.into(), field.len())),
                Some(NamedSource::new(file, content.clone())),
            ))
        })
        .unwrap_or((None, None))
}

/// Byte offset of `field` inside the `[path[0]]` table, or from the start
/// of the document for top-level keys.
///
/// A top-level `field` that names a table is found through its `[field]`
/// header.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let start = match path.first() {
        None => {
            if let Some(pos) = content.find(&format!("[{field}]")) {
                return Some(pos + 1);
            }
            0
        }
        Some(section) => {
            let header = format!("[{section}]");
            content.find(&header)? + header.len()
        }
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let body = line.trim_start();
        if path.first().is_some() && body.starts_with('[') {
            break;
        }
        if let Some(rest) = body.strip_prefix(field)
            && rest.trim_start().starts_with('=')
        {
            return Some(offset + (line.len() - body.len()));
        }
        offset += line.len();
    }
    None
}

/// Best candidate above the similarity threshold.
pub fn suggest_key(unknown: &str, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .map(|&candidate| (strsim::jaro_winkler(unknown, candidate), candidate))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, candidate)| candidate.to_string())
}

/// Renders diagnostics to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{buf}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_close_key() {
        let valid = &["api_key", "base_url", "default_model", "timeout_secs"];
        assert_eq!(suggest_key("api_kye", valid), Some("api_key".to_string()));
        assert_eq!(suggest_key("zzzzzz", valid), None);
    }

    #[test]
    fn shared_keys_list_every_owning_section() {
        assert_eq!(sections_accepting("bot_token", Some("chat")), vec!["auth", "notifier"]);
        assert_eq!(sections_accepting("bot_token", Some("auth")), vec!["notifier"]);
        assert_eq!(
            sections_accepting("api_key", None),
            vec!["openrouter", "gemini", "openai"]
        );
        assert!(sections_accepting("nonsense", None).is_empty());
    }

    #[test]
    fn key_offset_stays_inside_its_section() {
        let content = "[auth]\nbot_token = \"x\"\n\n[chat]\nhistroy_limit = 5\nbot_token = \"y\"\n";
        let chat = vec!["chat".to_string()];
        let o = find_key_offset(content, &chat, "bot_token").unwrap();
        assert!(o > content.find("[chat]").unwrap());
        assert_eq!(&content[o..o + "bot_token".len()], "bot_token");

        let auth = vec!["auth".to_string()];
        assert_eq!(find_key_offset(content, &auth, "histroy_limit"), None);
    }

    #[test]
    fn key_offset_handles_crlf_and_section_headers() {
        let content = "[gateway]\r\nprot = 1\r\n";
        let gateway = vec!["gateway".to_string()];
        let o = find_key_offset(content, &gateway, "prot").unwrap();
        assert_eq!(&content[o..o + 4], "prot");

        let content = "[openroutr]\napi_key = \"k\"\n";
        let o = find_key_offset(content, &[], "openroutr").unwrap();
        assert_eq!(&content[o..o + "openroutr".len()], "openroutr");
    }

    #[test]
    fn help_text_depends_on_level() {
        assert_eq!(
            unknown_key_help(None, Some("openrouter"), "agent, auth"),
            "did you mean the `[openrouter]` section? Sections: agent, auth"
        );
        assert_eq!(
            unknown_key_help(Some("cache"), None, "ttl_secs"),
            "valid keys in [cache]: ttl_secs"
        );
        assert_eq!(
            missing_key_help(Some("gateway"), "port"),
            "add `port = <value>` under [gateway] in jani.toml"
        );
    }
}
