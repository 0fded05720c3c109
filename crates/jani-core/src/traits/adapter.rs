// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait shared by provider integrations.

use async_trait::async_trait;

use crate::error::JaniError;
use crate::types::{AdapterType, HealthStatus};

/// Identity and health reporting common to every adapter.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the semantic version of this adapter.
    fn version(&self) -> semver::Version;

    /// Returns the type of adapter.
    fn adapter_type(&self) -> AdapterType;

    /// Reports whether the adapter is usable. Must not consume provider quota.
    async fn health_check(&self) -> Result<HealthStatus, JaniError>;
}
