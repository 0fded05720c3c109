// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter and collaborator trait definitions.
//!
//! Providers extend the [`PluginAdapter`] base trait. Persistence and
//! notification are consumed through [`ChatStore`] and [`Notifier`]; the
//! core never implements them itself.

pub mod adapter;
pub mod notifier;
pub mod provider;
pub mod storage;

pub use adapter::PluginAdapter;
pub use notifier::Notifier;
pub use provider::{ProviderAdapter, TokenSink};
pub use storage::ChatStore;
