// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Jani chat core.

use strum::{Display, EnumString};
use thiserror::Error;

use crate::types::CharacterId;

/// The primary error type shared by providers, the orchestrator and transports.
///
/// Policy outcomes (limit reached, premium required) are ordinary variants with
/// payloads so callers can render a precise message; [`JaniError::kind`]
/// separates them from genuinely exceptional failures.
#[derive(Debug, Error)]
pub enum JaniError {
    /// Missing secret, API key or model. Raised before any network call.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed or forged input (bad signature, expired claims).
    #[error("validation failed [{code}]: {message}")]
    Validation { code: &'static str, message: String },

    /// No character could be resolved for the request.
    #[error("a character must be selected before chatting")]
    CharacterRequired,

    /// The character does not exist or has been deactivated.
    #[error("character {character_id} is not available")]
    CharacterInactive { character_id: CharacterId },

    /// The character is premium-tier and the caller holds no entitlement.
    #[error("character {character_id} requires an active subscription")]
    PremiumRequired { character_id: CharacterId },

    /// The caller used up the free daily message allowance.
    #[error("daily message limit reached ({used}/{limit})")]
    LimitReached { used: u32, limit: u32 },

    /// Upstream LLM API failure (non-2xx status, transport-level rejection).
    #[error("provider error: {message}")]
    Provider {
        status: Option<u16>,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The provider refused to produce content for safety reasons.
    #[error("provider blocked the completion: {reason}")]
    ContentBlocked { reason: String },

    /// The provider answered successfully but no reply text could be extracted.
    #[error("{provider} returned an empty response")]
    EmptyResponse { provider: String },

    /// A response body could not be decoded.
    #[error("parse error: {message}")]
    Parse {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Connection-level failure; the caller may retry.
    #[error("network error: {message}")]
    Network {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The caller cancelled a streaming request.
    #[error("operation cancelled")]
    Cancelled,

    /// Wrapped provider failure surfaced by the orchestrator.
    #[error("failed to generate a reply: {message}")]
    Generation { message: String },

    /// Persistence collaborator failure.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Upper bound on how much of an upstream error body is kept.
pub const MAX_ERROR_BODY_CHARS: usize = 1000;

/// Returns at most `max` characters of `s`, respecting char boundaries.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Coarse error taxonomy used at transport boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Validation,
    NotFound,
    Policy,
    Provider,
    TransientNetwork,
    Cancelled,
    Storage,
    Internal,
}

impl JaniError {
    /// Builds a [`JaniError::Storage`] from any error type.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        JaniError::Storage {
            source: Box::new(err),
        }
    }

    /// Builds a [`JaniError::Parse`] carrying the underlying decode error.
    pub fn parse(message: impl Into<String>, err: impl std::error::Error + Send + Sync + 'static) -> Self {
        JaniError::Parse {
            message: message.into(),
            source: Some(Box::new(err)),
        }
    }

    /// Builds a [`JaniError::Provider`] for a non-2xx HTTP response.
    ///
    /// The body is cut to [`MAX_ERROR_BODY_CHARS`] characters.
    pub fn http_status(status: u16, body: &str) -> Self {
        JaniError::Provider {
            status: Some(status),
            message: format!(
                "request failed with status {status}: {}",
                truncate_chars(body, MAX_ERROR_BODY_CHARS)
            ),
            source: None,
        }
    }

    /// Classifies the error into the coarse taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            JaniError::Config(_) => ErrorKind::Configuration,
            JaniError::Validation { .. } => ErrorKind::Validation,
            JaniError::CharacterRequired | JaniError::CharacterInactive { .. } => {
                ErrorKind::NotFound
            }
            JaniError::PremiumRequired { .. } | JaniError::LimitReached { .. } => {
                ErrorKind::Policy
            }
            JaniError::Provider { .. }
            | JaniError::ContentBlocked { .. }
            | JaniError::EmptyResponse { .. }
            | JaniError::Parse { .. }
            | JaniError::Generation { .. } => ErrorKind::Provider,
            JaniError::Network { .. } | JaniError::Timeout { .. } => ErrorKind::TransientNetwork,
            JaniError::Cancelled => ErrorKind::Cancelled,
            JaniError::Storage { .. } => ErrorKind::Storage,
            JaniError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            JaniError::Config(_) => "configuration",
            JaniError::Validation { code, .. } => code,
            JaniError::CharacterRequired => "character_required",
            JaniError::CharacterInactive { .. } => "character_inactive",
            JaniError::PremiumRequired { .. } => "premium_required",
            JaniError::LimitReached { .. } => "limit_reached",
            JaniError::Provider { .. } => "provider_error",
            JaniError::ContentBlocked { .. } => "content_blocked",
            JaniError::EmptyResponse { .. } => "empty_response",
            JaniError::Parse { .. } => "parse_error",
            JaniError::Network { .. } => "network_error",
            JaniError::Cancelled => "cancelled",
            JaniError::Generation { .. } => "llm_generation",
            JaniError::Storage { .. } => "storage_error",
            JaniError::Timeout { .. } => "timeout",
            JaniError::Internal(_) => "internal_error",
        }
    }

    /// Whether a caller may reasonably retry the same request unchanged.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Provider | ErrorKind::TransientNetwork
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_errors_carry_payload_in_message() {
        let err = JaniError::LimitReached { used: 50, limit: 50 };
        assert_eq!(err.to_string(), "daily message limit reached (50/50)");
        assert_eq!(err.kind(), ErrorKind::Policy);
        assert_eq!(err.code(), "limit_reached");
        assert!(!err.is_retriable());
    }

    #[test]
    fn provider_failures_are_retriable() {
        let err = JaniError::Provider {
            status: Some(503),
            message: "request failed with status 503".into(),
            source: None,
        };
        assert_eq!(err.kind(), ErrorKind::Provider);
        assert!(err.is_retriable());

        let net = JaniError::Network {
            message: "connection reset".into(),
            source: None,
        };
        assert_eq!(net.kind(), ErrorKind::TransientNetwork);
        assert!(net.is_retriable());
    }

    #[test]
    fn http_status_truncates_body_on_char_boundary() {
        let body = "я".repeat(1500);
        let err = JaniError::http_status(502, &body);
        match &err {
            JaniError::Provider { status, message, .. } => {
                assert_eq!(*status, Some(502));
                assert!(message.starts_with("request failed with status 502: "));
                assert_eq!(message.chars().filter(|c| *c == 'я').count(), 1000);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn not_found_kinds() {
        assert_eq!(JaniError::CharacterRequired.kind(), ErrorKind::NotFound);
        assert_eq!(
            JaniError::CharacterInactive { character_id: 7 }.kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn validation_code_is_passed_through() {
        let err = JaniError::Validation {
            code: "INVALID_SIGNATURE",
            message: "hash mismatch".into(),
        };
        assert_eq!(err.code(), "INVALID_SIGNATURE");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn error_kind_display_is_snake_case() {
        assert_eq!(ErrorKind::TransientNetwork.to_string(), "transient_network");
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
    }
}
