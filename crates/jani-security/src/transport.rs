// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of HTTP client failures into credential-free errors.

use jani_core::JaniError;

use crate::redact::redact;

/// Maps a reqwest failure to [`JaniError`] without leaking the request URL.
///
/// Gemini carries its API key in the query string, so the URL is stripped
/// from the retained source and the message is scrubbed as well.
pub fn transport_error(context: &str, err: reqwest::Error) -> JaniError {
    let mut message = redact(&format!("{context}: {err}"), &[]);
    if err.is_timeout() {
        message.push_str(" (timed out)");
    }
    JaniError::Network {
        message,
        source: Some(Box::new(err.without_url())),
    }
}
