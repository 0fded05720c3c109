// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Jani integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic tests without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - scripted LLM provider that records its calls
//! - [`InMemoryStore`] - `ChatStore` backed by process memory
//! - [`RecordingNotifier`] - captures admin alerts
//! - [`TestHarness`] - orchestrator wired to all of the above

pub mod harness;
pub mod mock_provider;
pub mod notifier;
pub mod store;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_provider::{MockProvider, MockReply, RecordedCall};
pub use notifier::RecordingNotifier;
pub use store::{InMemoryStore, character};
