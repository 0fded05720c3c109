// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Secret redaction for the Jani chat service.
//!
//! Provider API keys and bot tokens travel in headers and, for Gemini, in
//! the request URL. Anything that may end up in a log line or an error
//! body goes through [`redact`] first.

pub mod redact;
pub mod transport;

pub use redact::{REDACTED, RedactingWriter, redact};
pub use transport::transport_error;
