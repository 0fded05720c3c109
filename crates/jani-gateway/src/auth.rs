// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Init-data authentication middleware.
//!
//! The signed claims string is read from `X-Telegram-Init-Data`, or from
//! `Authorization: tma <data>`. Without a configured secret every request
//! is rejected (fail-closed).

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use jani_auth::InitDataError;
use jani_core::types::Identity;

use crate::error::ApiError;
use crate::server::GatewayState;

pub const INIT_DATA_HEADER: &str = "x-telegram-init-data";

const AUTHORIZATION_SCHEME: &str = "tma ";

/// Validates init data and stores the `AuthResult` and `Identity` as
/// request extensions.
pub async fn auth_middleware(
    State(state): State<GatewayState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let raw = init_data_from_headers(request.headers())
        .ok_or_else(|| ApiError::unauthorized("missing_init_data", "init data is required"))?;

    let auth = state.validator.validate(&raw).map_err(|e| match e {
        InitDataError::Configuration => {
            tracing::error!("gateway has no init data secret configured -- rejecting request");
            ApiError::unauthorized(e.code(), "authentication is not configured")
        }
        other => {
            tracing::debug!(code = other.code(), "init data rejected");
            ApiError::unauthorized(other.code(), other.to_string())
        }
    })?;

    let identity = Identity::from_auth(&auth)
        .ok_or_else(|| ApiError::unauthorized("MISSING_USER", "init data carries no user"))?;

    request.extensions_mut().insert(auth);
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

fn init_data_from_headers(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(INIT_DATA_HEADER).and_then(|v| v.to_str().ok())
        && !value.trim().is_empty()
    {
        return Some(value.trim().to_string());
    }
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            v.get(..AUTHORIZATION_SCHEME.len())
                .filter(|scheme| scheme.eq_ignore_ascii_case(AUTHORIZATION_SCHEME))
                .map(|_| v[AUTHORIZATION_SCHEME.len()..].trim().to_string())
        })
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue, header};

    #[test]
    fn prefers_dedicated_header() {
        let mut headers = HeaderMap::new();
        headers.insert(INIT_DATA_HEADER, HeaderValue::from_static("a=1"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("tma b=2"));
        assert_eq!(init_data_from_headers(&headers).as_deref(), Some("a=1"));
    }

    #[test]
    fn reads_tma_authorization_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("TMA b=2"));
        assert_eq!(init_data_from_headers(&headers).as_deref(), Some("b=2"));
    }

    #[test]
    fn ignores_other_schemes_and_blank_values() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert!(init_data_from_headers(&headers).is_none());

        headers.insert(INIT_DATA_HEADER, HeaderValue::from_static("  "));
        assert!(init_data_from_headers(&headers).is_none());
    }
}
