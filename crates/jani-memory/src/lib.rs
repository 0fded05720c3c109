// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-term memory for Jani.
//!
//! After each exchange a secondary LLM call proposes facts about the user.
//! New facts are stored per (user, character) pair, which never holds more
//! than the configured number of memories.

pub mod extractor;
pub mod limit;

pub use extractor::{ExtractedFact, MemoryExtractor, parse_extraction_response};
pub use limit::{enforce_memory_limit, select_evictions};
