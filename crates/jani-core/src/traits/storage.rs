// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence collaborator consumed by the orchestrator.
//!
//! Every method is a single-row operation; the core never requires
//! multi-row transactions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::JaniError;
use crate::types::{
    CharacterId, CharacterRecord, ChatSession, DialogMessage, MemoryRecord, NewDialogMessage,
    NewMemory, UserId, UserRecord,
};

/// CRUD over users, characters, dialogs, sessions and memories.
#[async_trait]
pub trait ChatStore: Send + Sync {
    // --- users ---

    /// Upserts by external (Telegram) id and bumps `last_active_at`.
    async fn find_or_create_user(
        &self,
        external_id: i64,
        username: Option<&str>,
    ) -> Result<UserRecord, JaniError>;

    async fn update_last_character(
        &self,
        user_id: UserId,
        character_id: CharacterId,
    ) -> Result<(), JaniError>;

    /// Whether the user holds an active paid entitlement.
    async fn has_active_subscription(&self, user_id: UserId) -> Result<bool, JaniError>;

    // --- characters ---

    async fn get_character(
        &self,
        character_id: CharacterId,
    ) -> Result<Option<CharacterRecord>, JaniError>;

    /// Character of the user's most recent dialog line, if any.
    async fn last_conversed_character(
        &self,
        user_id: UserId,
    ) -> Result<Option<CharacterId>, JaniError>;

    // --- dialogs ---

    /// Counts user-authored lines created at or after `since`.
    async fn count_user_messages_since(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<u32, JaniError>;

    /// Records a regenerated reply. Regenerations write no dialog line but
    /// still count against the daily message limit.
    async fn record_regeneration(
        &self,
        user_id: UserId,
        character_id: CharacterId,
        at: DateTime<Utc>,
    ) -> Result<(), JaniError>;

    /// Counts regenerations recorded at or after `since`.
    async fn count_regenerations_since(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<u32, JaniError>;

    /// Up to `limit` most recent lines for the pair, in any order.
    async fn recent_messages(
        &self,
        user_id: UserId,
        character_id: CharacterId,
        limit: usize,
    ) -> Result<Vec<DialogMessage>, JaniError>;

    async fn append_message(&self, message: NewDialogMessage)
    -> Result<DialogMessage, JaniError>;

    // --- sessions ---

    async fn get_or_create_session(
        &self,
        user_id: UserId,
        character_id: CharacterId,
    ) -> Result<ChatSession, JaniError>;

    async fn save_session(&self, session: &ChatSession) -> Result<(), JaniError>;

    // --- memories ---

    async fn list_memories(
        &self,
        user_id: UserId,
        character_id: CharacterId,
    ) -> Result<Vec<MemoryRecord>, JaniError>;

    async fn add_memory(&self, memory: NewMemory) -> Result<MemoryRecord, JaniError>;

    async fn delete_memory(&self, memory_id: i64) -> Result<(), JaniError>;

    async fn count_memories(
        &self,
        user_id: UserId,
        character_id: CharacterId,
    ) -> Result<usize, JaniError>;
}
