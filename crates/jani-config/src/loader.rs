// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./jani.toml` > `~/.config/jani/jani.toml` > `/etc/jani/jani.toml`
//! with environment variable overrides via `JANI_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::JaniConfig;

/// Top-level sections addressable from `JANI_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &[
    "agent",
    "auth",
    "openrouter",
    "gemini",
    "openai",
    "llm",
    "chat",
    "cache",
    "memory",
    "notifier",
    "gateway",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/jani/jani.toml`
/// 3. `~/.config/jani/jani.toml`
/// 4. `./jani.toml`
/// 5. `JANI_*` environment variables
pub fn load_config() -> Result<JaniConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string layered over the defaults only.
pub fn load_config_from_str(toml_content: &str) -> Result<JaniConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(JaniConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<JaniConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(JaniConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The full provider stack before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(JaniConfig::default()))
        .merge(Toml::file("/etc/jani/jani.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("jani/jani.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("jani.toml"))
        .merge(env_provider())
}

/// Environment provider mapping the first `_` after a known section to a dot.
///
/// `JANI_OPENROUTER_API_KEY` must become `openrouter.api_key`, not
/// `openrouter.api.key`, so `Env::split` is not usable here.
fn env_provider() -> Env {
    Env::prefixed("JANI_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env key to its dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(map_env_key("openrouter_api_key"), "openrouter.api_key");
        assert_eq!(map_env_key("chat_free_daily_message_limit"), "chat.free_daily_message_limit");
        assert_eq!(map_env_key("notifier_bot_token"), "notifier.bot_token");
        assert_eq!(map_env_key("openai_default_model"), "openai.default_model");
        assert_eq!(map_env_key("unknown_thing"), "unknown_thing");
    }

    #[test]
    fn env_overrides_apply_through_jail() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("JANI_AUTH_BOT_TOKEN", "42:secret");
            jail.set_env("JANI_CACHE_TTL_SECS", "0");
            let config: JaniConfig = Figment::new()
                .merge(Serialized::defaults(JaniConfig::default()))
                .merge(env_provider())
                .extract()?;
            assert_eq!(config.auth.bot_token.as_deref(), Some("42:secret"));
            assert_eq!(config.cache.ttl_secs, 0);
            Ok(())
        });
    }
}
