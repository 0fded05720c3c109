// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-pair memory cap.

use jani_core::JaniError;
use jani_core::traits::ChatStore;
use jani_core::types::{CharacterId, MemoryRecord, UserId};
use tracing::debug;

/// Ids to delete so that at most `cap` memories remain.
///
/// Lowest importance goes first; ties are broken by age, oldest first.
pub fn select_evictions(memories: &[MemoryRecord], cap: usize) -> Vec<i64> {
    if memories.len() <= cap {
        return Vec::new();
    }
    let mut ordered: Vec<&MemoryRecord> = memories.iter().collect();
    ordered.sort_by(|a, b| {
        a.importance
            .cmp(&b.importance)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
    ordered
        .into_iter()
        .take(memories.len() - cap)
        .map(|m| m.id)
        .collect()
}

/// Deletes memories beyond `cap` for the pair. Returns how many were removed.
pub async fn enforce_memory_limit(
    store: &dyn ChatStore,
    user_id: UserId,
    character_id: CharacterId,
    cap: usize,
) -> Result<usize, JaniError> {
    let memories = store.list_memories(user_id, character_id).await?;
    let evictions = select_evictions(&memories, cap);
    for id in &evictions {
        store.delete_memory(*id).await?;
    }
    if !evictions.is_empty() {
        debug!(user_id, character_id, removed = evictions.len(), cap, "memory cap enforced");
    }
    Ok(evictions.len())
}
