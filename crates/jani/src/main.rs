// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Jani - character chat backend tools.
//!
//! This is the binary entry point: configuration checks, init-data
//! verification and one-shot prompts against a provider adapter.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod chat;
mod check;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use jani_config::JaniConfig;
use jani_core::ProviderTag;

/// Jani - LLM character chat backend.
#[derive(Parser, Debug)]
#[command(name = "jani", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the default locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration and print a summary.
    CheckConfig,
    /// Validate a Telegram Mini App init data string.
    VerifyInitData {
        /// The raw, URL-encoded init data.
        raw: String,
        /// Validate as if the current time were this unix timestamp.
        #[arg(long, value_name = "UNIX_SECS")]
        at: Option<i64>,
    },
    /// Send a one-shot prompt through a provider adapter.
    Chat {
        /// Adapter to use: openrouter, gemini or openai.
        #[arg(long, default_value = "openrouter")]
        provider: ProviderTag,
        /// Model override; defaults to the adapter's configured model.
        #[arg(long)]
        model: Option<String>,
        /// Optional system prompt.
        #[arg(long)]
        system: Option<String>,
        /// Wait for the full reply even when the adapter can stream.
        #[arg(long)]
        no_stream: bool,
        prompt: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => jani_config::load_and_validate_path(path),
        None => jani_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            jani_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config);

    let code = match cli.command {
        Some(Commands::CheckConfig) => check::check_config(&config),
        Some(Commands::VerifyInitData { raw, at }) => check::verify_init_data(&config, &raw, at),
        Some(Commands::Chat {
            provider,
            model,
            system,
            no_stream,
            prompt,
        }) => {
            let options = chat::ChatOptions {
                provider,
                model,
                system,
                stream: !no_stream,
            };
            chat::run_chat(&config, options, &prompt).await
        }
        None => {
            println!("jani: use --help for available commands");
            0
        }
    };
    std::process::exit(code);
}

/// Secrets from the config that must never appear in log output.
fn known_secrets(config: &JaniConfig) -> Vec<String> {
    [
        config.openrouter.api_key.as_ref(),
        config.gemini.api_key.as_ref(),
        config.openai.api_key.as_ref(),
        config.auth.bot_token.as_ref(),
        config.auth.secret_key.as_ref(),
        config.notifier.bot_token.as_ref(),
    ]
    .into_iter()
    .flatten()
    .filter(|s| !s.is_empty())
    .cloned()
    .collect()
}

/// Initializes the tracing subscriber, writing redacted output to stderr.
fn init_tracing(config: &JaniConfig) {
    use jani_security::RedactingWriter;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("jani={level},jani_agent={level},warn", level = config.agent.log_level))
    });
    let secrets: Arc<[String]> = known_secrets(config).into();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(move || RedactingWriter::new(std::io::stderr(), secrets.clone()))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc can advance the stats epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_chat_flags() {
        let cli = Cli::try_parse_from([
            "jani", "chat", "--provider", "Gemini", "--model", "gemini-2.5-pro", "hello",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Chat {
                provider,
                model,
                no_stream,
                prompt,
                ..
            }) => {
                assert_eq!(provider, ProviderTag::Gemini);
                assert_eq!(model.as_deref(), Some("gemini-2.5-pro"));
                assert!(!no_stream);
                assert_eq!(prompt, "hello");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn cli_rejects_unknown_provider() {
        assert!(Cli::try_parse_from(["jani", "chat", "--provider", "anthropic", "hi"]).is_err());
    }

    #[test]
    fn secrets_are_collected_from_every_section() {
        let mut config = JaniConfig::default();
        config.openai.api_key = Some("sk-openai".into());
        config.notifier.bot_token = Some("1:notifier".into());
        config.gemini.api_key = Some(String::new());
        let secrets = known_secrets(&config);
        assert_eq!(secrets, vec!["sk-openai".to_string(), "1:notifier".to_string()]);
    }
}
