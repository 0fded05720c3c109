// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Jani character chat service.
//!
//! Holds the shared error type, prompt and persistence types, the adapter
//! and collaborator traits, the action-envelope parser and the prompt cache.

pub mod cache;
pub mod envelope;
pub mod error;
pub mod traits;
pub mod types;

pub use cache::{PromptCache, cache_key};
pub use envelope::{Action, ActionEnvelope, parse_envelope_lenient, parse_envelope_strict};
pub use error::{ErrorKind, JaniError};
pub use types::{CharacterId, Completion, Message, ProviderRequest, ProviderTag, Role, UserId};

pub use traits::{ChatStore, Notifier, PluginAdapter, ProviderAdapter, TokenSink};
