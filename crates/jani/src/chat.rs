// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `jani chat`: one prompt, one reply, straight through an adapter.

use std::io::Write;
use std::sync::Arc;

use jani_config::JaniConfig;
use jani_core::{JaniError, Message, ProviderAdapter, ProviderRequest, ProviderTag};
use jani_gemini::GeminiProvider;
use jani_openai::OpenAiProvider;
use jani_openrouter::OpenRouterProvider;

pub struct ChatOptions {
    pub provider: ProviderTag,
    pub model: Option<String>,
    pub system: Option<String>,
    pub stream: bool,
}

/// Constructs the adapter selected by `tag`.
pub fn build_provider(
    tag: ProviderTag,
    config: &JaniConfig,
) -> Result<Arc<dyn ProviderAdapter>, JaniError> {
    Ok(match tag {
        ProviderTag::OpenRouter => Arc::new(OpenRouterProvider::new(config)?),
        ProviderTag::Gemini => Arc::new(GeminiProvider::new(config)?),
        ProviderTag::OpenAi => Arc::new(OpenAiProvider::new(config)?),
    })
}

/// Runs the command and returns the process exit code.
pub async fn run_chat(config: &JaniConfig, options: ChatOptions, prompt: &str) -> i32 {
    match chat(config, options, prompt).await {
        Ok(()) => 0,
        Err(JaniError::Cancelled) => {
            eprintln!("\njani: cancelled");
            130
        }
        Err(e) => {
            eprintln!("jani: {e}");
            1
        }
    }
}

async fn chat(config: &JaniConfig, options: ChatOptions, prompt: &str) -> Result<(), JaniError> {
    let provider = build_provider(options.provider, config)?;

    let mut messages = Vec::with_capacity(2);
    if let Some(system) = options.system.filter(|s| !s.trim().is_empty()) {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(prompt));

    let request = ProviderRequest {
        model: options.model,
        ..ProviderRequest::for_provider(options.provider)
    };

    tracing::debug!(
        provider = %options.provider,
        model = request.model.as_deref().unwrap_or(provider.default_model()),
        streaming = options.stream && provider.supports_streaming(),
        "sending one-shot prompt"
    );

    if options.stream && provider.supports_streaming() {
        let cancel = jani_agent::shutdown::install_signal_handler();
        let mut stdout = std::io::stdout();
        let mut sink = move |token: &str| {
            let _ = stdout.write_all(token.as_bytes());
            let _ = stdout.flush();
        };
        provider
            .stream_reply(&messages, &request, &mut sink, &cancel)
            .await?;
        println!();
    } else {
        let reply = provider.generate_reply(&messages, &request).await?;
        println!("{reply}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_each_adapter_when_keyed() {
        let mut config = JaniConfig::default();
        config.openrouter.api_key = Some("sk-or-test".into());
        config.gemini.api_key = Some("gm-test".into());
        config.openai.api_key = Some("sk-test".into());
        for tag in [ProviderTag::OpenRouter, ProviderTag::Gemini, ProviderTag::OpenAi] {
            let provider = build_provider(tag, &config).unwrap();
            assert_eq!(provider.tag(), tag);
        }
    }
}
