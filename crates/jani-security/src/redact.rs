// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Regex and exact-match secret scrubbing.

use std::io::Write;
use std::sync::{Arc, LazyLock};

use regex::Regex;

/// Known secret shapes and their replacements.
///
/// Replacements may reference capture groups so that surrounding syntax
/// (a query parameter name, an auth scheme) survives.
static REDACTION_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        // OpenAI and OpenRouter keys: sk-..., sk-or-v1-...
        (Regex::new(r"sk-[a-zA-Z0-9_\-]{20,}").unwrap(), REDACTED),
        // Google API keys.
        (Regex::new(r"AIza[0-9A-Za-z_\-]{30,}").unwrap(), REDACTED),
        // Key passed as a query parameter.
        (Regex::new(r"([?&]key=)[^&\s\x22')]+").unwrap(), "${1}[REDACTED]"),
        (Regex::new(r"(Bearer\s+)[a-zA-Z0-9._\-]{10,}").unwrap(), "${1}[REDACTED]"),
        // Telegram bot tokens: 123456789:AA...
        (Regex::new(r"\d{8,10}:[a-zA-Z0-9_\-]{35}").unwrap(), REDACTED),
    ]
});

/// The redaction placeholder.
pub const REDACTED: &str = "[REDACTED]";

/// Redact known secret formats and the given literal values from `input`.
///
/// Literal values are replaced longest first so a secret that contains
/// another is not partially revealed.
pub fn redact(input: &str, known_secrets: &[String]) -> String {
    let mut result = input.to_string();

    for (pattern, replacement) in REDACTION_PATTERNS.iter() {
        if pattern.is_match(&result) {
            result = pattern.replace_all(&result, *replacement).into_owned();
        }
    }

    let mut sorted: Vec<&String> = known_secrets.iter().filter(|s| !s.is_empty()).collect();
    sorted.sort_by_key(|v| std::cmp::Reverse(v.len()));
    for value in sorted {
        result = result.replace(value.as_str(), REDACTED);
    }

    result
}

/// A writer that scrubs secrets before forwarding bytes.
///
/// Used as the tracing output so configured API keys and bot tokens never
/// reach stderr verbatim.
pub struct RedactingWriter<W> {
    inner: W,
    known_secrets: Arc<[String]>,
}

impl<W: Write> RedactingWriter<W> {
    pub fn new(inner: W, known_secrets: Arc<[String]>) -> Self {
        Self {
            inner,
            known_secrets,
        }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let input = String::from_utf8_lossy(buf);
        let redacted = redact(&input, &self.known_secrets);
        self.inner.write_all(redacted.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
