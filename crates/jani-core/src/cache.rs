// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local TTL cache for generated replies.
//!
//! Entries expire lazily: an expired entry is evicted by the lookup that
//! finds it. There is no background sweeper. The cache is an optimization
//! only and never holds durable state.

use std::time::Duration;

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tokio::time::Instant;

use crate::traits::TokenSink;
use crate::types::{Completion, Message};

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// TTL key/value store. A zero TTL disables caching entirely.
pub struct PromptCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    ttl: Duration,
}

impl<V: Clone> PromptCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Returns the value if present and not yet expired.
    pub fn get(&self, key: &str) -> Option<V> {
        if !self.is_enabled() {
            return None;
        }
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if now <= entry.expires_at => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove_if(key, |_, entry| now > entry.expires_at);
        }
        None
    }

    /// Stores `value` until `now + ttl`.
    pub fn set(&self, key: impl Into<String>, value: V) {
        if !self.is_enabled() {
            return;
        }
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Default cache key: SHA-256 over the model and every `role:content` pair
/// in order, hex encoded.
///
/// Each field is length-prefixed so distinct message sequences cannot
/// concatenate to the same byte stream.
pub fn cache_key(model: &str, messages: &[Message]) -> String {
    let mut hasher = Sha256::new();
    update_field(&mut hasher, model.as_bytes());
    for message in messages {
        update_field(&mut hasher, message.role.to_string().as_bytes());
        hasher.update(b":");
        update_field(&mut hasher, message.content.as_bytes());
    }
    hex::encode(hasher.finalize())
}

fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

/// Replays a cached completion to a token sink.
///
/// When the cached reply carries an envelope, the sink sees the visible text
/// once, matching what a live streamed call would have delivered.
pub fn replay_cached(completion: &Completion, sink: Option<&mut dyn TokenSink>) {
    if let (Some(envelope), Some(sink)) = (&completion.envelope, sink) {
        sink.on_token(&envelope.user_visible_text);
    }
}
