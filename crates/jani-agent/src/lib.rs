// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat orchestration for Jani.
//!
//! [`ChatOrchestrator`] turns one user message into a character reply:
//! it resolves the user and character, enforces access and daily limits,
//! assembles the prompt, calls the provider selected by the character,
//! shapes and stores the reply, and schedules memory extraction.

pub mod notifier;
pub mod prompt;
pub mod registry;
pub mod reply;
pub mod session;
pub mod shutdown;

pub use notifier::TelegramNotifier;
pub use registry::ProviderRegistry;
pub use reply::{ParsedReply, RelationshipDelta, parse_json_reply, sanitize_reply};
pub use session::{ChatOrchestrator, ChatReply, ChatRequest, ChatState};
