// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Administrator alert sink.

use async_trait::async_trait;

use crate::types::GenerationAlert;

/// Fire-and-forget alert delivery.
///
/// Implementations swallow and log their own failures; nothing is returned
/// to the caller.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_generation_failure(&self, alert: &GenerationAlert);
}
