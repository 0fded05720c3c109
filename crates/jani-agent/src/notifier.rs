// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram alerts to administrators on generation failures.

use std::time::Duration;

use async_trait::async_trait;
use jani_config::model::NotifierConfig;
use jani_core::Notifier;
use jani_core::error::truncate_chars;
use jani_core::types::GenerationAlert;
use jani_security::redact;
use serde::Serialize;
use tracing::{error, info, warn};

/// Characters of the user message included in an alert.
const USER_MESSAGE_PREVIEW_CHARS: usize = 200;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
}

/// Sends an HTML `sendMessage` to every configured admin.
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: String,
    bot_token: String,
    admin_ids: Vec<i64>,
}

impl TelegramNotifier {
    pub fn new(api_base: &str, bot_token: String, admin_ids: Vec<i64>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: format!("{}/bot{bot_token}/sendMessage", api_base.trim_end_matches('/')),
            bot_token,
            admin_ids,
        }
    }

    /// Builds a notifier when a bot token and at least one admin id are set.
    pub fn from_config(config: &NotifierConfig) -> Option<Self> {
        let token = config.bot_token.as_deref().filter(|t| !t.is_empty())?;
        if config.admin_telegram_ids.is_empty() {
            warn!("no admin Telegram ids configured, generation alerts disabled");
            return None;
        }
        Some(Self::new(
            &config.api_base,
            token.to_string(),
            config.admin_telegram_ids.clone(),
        ))
    }

    fn scrub(&self, text: &str) -> String {
        redact(text, std::slice::from_ref(&self.bot_token))
    }
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("admin_ids", &self.admin_ids)
            .field("bot_token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify_generation_failure(&self, alert: &GenerationAlert) {
        let text = format_alert(alert);

        for &admin_id in &self.admin_ids {
            let body = SendMessage {
                chat_id: admin_id,
                text: &text,
                parse_mode: "HTML",
            };
            match self.client.post(&self.endpoint).json(&body).send().await {
                Ok(response) if response.status().is_success() => {
                    info!(admin_id, "admin notification sent");
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    error!(
                        admin_id,
                        status,
                        error = %self.scrub(truncate_chars(&body, 1000)),
                        "failed to send Telegram notification"
                    );
                }
                Err(e) => {
                    error!(
                        admin_id,
                        error = %self.scrub(&e.without_url().to_string()),
                        "Telegram notification error"
                    );
                }
            }
        }
    }
}

/// Renders an alert as Telegram HTML.
pub fn format_alert(alert: &GenerationAlert) -> String {
    let message = if alert.user_message.chars().count() > USER_MESSAGE_PREVIEW_CHARS {
        format!(
            "{}...",
            truncate_chars(&alert.user_message, USER_MESSAGE_PREVIEW_CHARS)
        )
    } else {
        alert.user_message.clone()
    };

    [
        "🚨 <b>LLM Error</b>".to_string(),
        String::new(),
        format!("<b>Time:</b> <code>{}</code>", alert.occurred_at.to_rfc3339()),
        format!("<b>User ID:</b> <code>{}</code>", alert.user_id),
        format!("<b>Telegram ID:</b> <code>{}</code>", alert.external_id),
        format!("<b>Character ID:</b> <code>{}</code>", alert.character_id),
        format!("<b>Character:</b> {}", escape_html(&alert.character_name)),
        format!("<b>Provider:</b> <code>{}</code>", alert.provider),
        format!("<b>Model:</b> <code>{}</code>", escape_html(&alert.model)),
        format!("<b>User Message:</b> {}", escape_html(&message)),
        String::new(),
        format!("<b>Error:</b> <code>{}</code>", escape_html(&alert.error)),
    ]
    .join("\n")
}

/// Escapes the three characters Telegram HTML treats specially.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
