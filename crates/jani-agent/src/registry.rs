// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapters keyed by [`ProviderTag`].

use std::collections::HashMap;
use std::sync::Arc;

use jani_core::{JaniError, ProviderAdapter, ProviderTag};
use tracing::info;

/// One adapter per vendor. Populated at startup, read-only afterwards.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderTag, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an adapter under its own tag, replacing any previous one.
    pub fn register(&mut self, provider: Arc<dyn ProviderAdapter>) {
        let tag = provider.tag();
        info!(provider = %tag, default_model = provider.default_model(), "provider registered");
        self.providers.insert(tag, provider);
    }

    pub fn with(mut self, provider: Arc<dyn ProviderAdapter>) -> Self {
        self.register(provider);
        self
    }

    /// Looks up an adapter, failing with a configuration error when absent.
    pub fn get(&self, tag: ProviderTag) -> Result<Arc<dyn ProviderAdapter>, JaniError> {
        self.providers
            .get(&tag)
            .cloned()
            .ok_or_else(|| JaniError::Config(format!("provider {tag} is not configured")))
    }

    pub fn contains(&self, tag: ProviderTag) -> bool {
        self.providers.contains_key(&tag)
    }

    /// Registered tags, in no particular order.
    pub fn tags(&self) -> Vec<ProviderTag> {
        self.providers.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.tags())
            .finish()
    }
}
