// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of chat errors to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use jani_core::JaniError;
use serde_json::{Map, Value, json};

/// An error rendered as `{"error": code, "message": ..., ...payload}`.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub payload: Map<String, Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            payload: Map::new(),
        }
    }

    pub fn unauthorized(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, code, message)
    }

    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }

    /// JSON body of the error.
    pub fn body(&self) -> Value {
        let mut body = self.payload.clone();
        body.insert("error".into(), json!(self.code));
        body.insert("message".into(), json!(self.message));
        Value::Object(body)
    }
}

impl From<JaniError> for ApiError {
    fn from(err: JaniError) -> Self {
        let code = err.code();
        match &err {
            JaniError::CharacterRequired => Self::bad_request(code, err.to_string()),
            JaniError::CharacterInactive { character_id } => {
                Self::new(StatusCode::NOT_FOUND, code, err.to_string())
                    .with_field("character_id", *character_id)
            }
            JaniError::PremiumRequired { character_id } => {
                Self::new(StatusCode::PAYMENT_REQUIRED, code, err.to_string())
                    .with_field("character_id", *character_id)
            }
            JaniError::LimitReached { used, limit } => {
                Self::new(StatusCode::TOO_MANY_REQUESTS, code, err.to_string())
                    .with_field("used", *used)
                    .with_field("limit", *limit)
            }
            JaniError::Generation { .. } => Self::new(
                StatusCode::BAD_GATEWAY,
                code,
                "the character could not answer right now, please try again",
            ),
            JaniError::Validation { code, message } => Self::unauthorized(*code, message.clone()),
            _ => {
                tracing::error!(error = %err, "request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, "internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (JaniError::CharacterRequired, StatusCode::BAD_REQUEST),
            (JaniError::CharacterInactive { character_id: 1 }, StatusCode::NOT_FOUND),
            (JaniError::PremiumRequired { character_id: 1 }, StatusCode::PAYMENT_REQUIRED),
            (JaniError::LimitReached { used: 5, limit: 5 }, StatusCode::TOO_MANY_REQUESTS),
            (
                JaniError::Generation {
                    message: "x".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                JaniError::Validation {
                    code: "EXPIRED",
                    message: "old".into(),
                },
                StatusCode::UNAUTHORIZED,
            ),
            (JaniError::Internal("db".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn limit_body_carries_usage() {
        let body = ApiError::from(JaniError::LimitReached { used: 2, limit: 2 }).body();
        insta::assert_json_snapshot!(body, @r#"
        {
          "error": "limit_reached",
          "limit": 2,
          "message": "daily message limit reached (2/2)",
          "used": 2
        }
        "#);
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let api = ApiError::from(JaniError::Storage {
            source: "connection refused to db.internal:5432".into(),
        });
        assert_eq!(api.code, "storage_error");
        assert_eq!(api.message, "internal server error");
    }

    #[test]
    fn generation_failure_hides_provider_detail() {
        let api = ApiError::from(JaniError::Generation {
            message: "provider error: request failed with status 401".into(),
        });
        assert_eq!(api.code, "llm_generation");
        assert!(!api.message.contains("401"));
    }
}
