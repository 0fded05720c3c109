// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notifier that records alerts instead of sending them.

use std::sync::Mutex;

use async_trait::async_trait;
use jani_core::Notifier;
use jani_core::types::GenerationAlert;

#[derive(Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<GenerationAlert>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<GenerationAlert> {
        self.alerts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_generation_failure(&self, alert: &GenerationAlert) {
        tracing::debug!(user_id = alert.user_id, "recording generation alert");
        self.alerts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(alert.clone());
    }
}
