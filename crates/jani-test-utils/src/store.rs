// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`ChatStore`] for tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jani_core::types::{
    AccessTier, CharacterId, CharacterRecord, ChatSession, DialogMessage, DialogRole,
    MemoryCategory, MemoryRecord, NewDialogMessage, NewMemory, UserId, UserRecord,
};
use jani_core::{ChatStore, JaniError};

#[derive(Default)]
struct State {
    next_id: i64,
    users: Vec<UserRecord>,
    characters: HashMap<CharacterId, CharacterRecord>,
    subscribers: HashSet<UserId>,
    dialogs: Vec<DialogMessage>,
    sessions: HashMap<(UserId, CharacterId), ChatSession>,
    memories: Vec<MemoryRecord>,
    regenerations: Vec<(UserId, CharacterId, DateTime<Utc>)>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Thread-safe store keeping every row in process memory.
///
/// Ids are allocated from one shared counter, so they also reflect
/// insertion order across tables.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_character(&self, character: CharacterRecord) {
        self.state().characters.insert(character.id, character);
    }

    /// Creates (or returns) the user for `external_id` without going through the trait.
    pub fn seed_user(&self, external_id: i64, username: Option<&str>) -> UserRecord {
        let mut state = self.state();
        upsert_user(&mut state, external_id, username)
    }

    pub fn set_last_character(&self, user_id: UserId, character_id: Option<CharacterId>) {
        if let Some(user) = self.state().users.iter_mut().find(|u| u.id == user_id) {
            user.last_character_id = character_id;
        }
    }

    pub fn grant_subscription(&self, user_id: UserId) {
        self.state().subscribers.insert(user_id);
    }

    /// Inserts a dialog line with an explicit timestamp.
    pub fn seed_message(
        &self,
        user_id: UserId,
        character_id: CharacterId,
        role: DialogRole,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> DialogMessage {
        let mut state = self.state();
        let message = DialogMessage {
            id: state.next_id(),
            user_id,
            character_id,
            role,
            text: text.to_string(),
            created_at,
        };
        state.dialogs.push(message.clone());
        message
    }

    pub fn seed_memory(
        &self,
        user_id: UserId,
        character_id: CharacterId,
        category: MemoryCategory,
        content: &str,
        importance: u8,
        created_at: DateTime<Utc>,
    ) -> MemoryRecord {
        let mut state = self.state();
        let memory = MemoryRecord {
            id: state.next_id(),
            user_id,
            character_id,
            category,
            content: content.to_string(),
            importance,
            created_at,
        };
        state.memories.push(memory.clone());
        memory
    }

    pub fn user(&self, external_id: i64) -> Option<UserRecord> {
        self.state()
            .users
            .iter()
            .find(|u| u.external_id == external_id)
            .cloned()
    }

    /// Dialog lines for a pair in insertion order.
    pub fn dialog(&self, user_id: UserId, character_id: CharacterId) -> Vec<DialogMessage> {
        self.state()
            .dialogs
            .iter()
            .filter(|m| m.user_id == user_id && m.character_id == character_id)
            .cloned()
            .collect()
    }

    pub fn dialog_len(&self) -> usize {
        self.state().dialogs.len()
    }

    pub fn session(&self, user_id: UserId, character_id: CharacterId) -> Option<ChatSession> {
        self.state().sessions.get(&(user_id, character_id)).cloned()
    }

    pub fn memories(&self, user_id: UserId, character_id: CharacterId) -> Vec<MemoryRecord> {
        self.state()
            .memories
            .iter()
            .filter(|m| m.user_id == user_id && m.character_id == character_id)
            .cloned()
            .collect()
    }
}

fn upsert_user(state: &mut State, external_id: i64, username: Option<&str>) -> UserRecord {
    let now = Utc::now();
    if let Some(user) = state.users.iter_mut().find(|u| u.external_id == external_id) {
        if let Some(name) = username {
            user.username = Some(name.to_string());
        }
        user.last_active_at = now;
        return user.clone();
    }
    let user = UserRecord {
        id: state.next_id(),
        external_id,
        username: username.map(str::to_string),
        last_character_id: None,
        last_active_at: now,
    };
    state.users.push(user.clone());
    user
}

#[async_trait]
impl ChatStore for InMemoryStore {
    async fn find_or_create_user(
        &self,
        external_id: i64,
        username: Option<&str>,
    ) -> Result<UserRecord, JaniError> {
        let mut state = self.state();
        Ok(upsert_user(&mut state, external_id, username))
    }

    async fn update_last_character(
        &self,
        user_id: UserId,
        character_id: CharacterId,
    ) -> Result<(), JaniError> {
        let mut state = self.state();
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| JaniError::Internal(format!("unknown user {user_id}")))?;
        user.last_character_id = Some(character_id);
        Ok(())
    }

    async fn has_active_subscription(&self, user_id: UserId) -> Result<bool, JaniError> {
        Ok(self.state().subscribers.contains(&user_id))
    }

    async fn get_character(
        &self,
        character_id: CharacterId,
    ) -> Result<Option<CharacterRecord>, JaniError> {
        Ok(self.state().characters.get(&character_id).cloned())
    }

    async fn last_conversed_character(
        &self,
        user_id: UserId,
    ) -> Result<Option<CharacterId>, JaniError> {
        Ok(self
            .state()
            .dialogs
            .iter()
            .filter(|m| m.user_id == user_id)
            .max_by_key(|m| (m.created_at, m.id))
            .map(|m| m.character_id))
    }

    async fn count_user_messages_since(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<u32, JaniError> {
        let count = self
            .state()
            .dialogs
            .iter()
            .filter(|m| m.user_id == user_id && m.role == DialogRole::User && m.created_at >= since)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn record_regeneration(
        &self,
        user_id: UserId,
        character_id: CharacterId,
        at: DateTime<Utc>,
    ) -> Result<(), JaniError> {
        self.state().regenerations.push((user_id, character_id, at));
        Ok(())
    }

    async fn count_regenerations_since(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<u32, JaniError> {
        let count = self
            .state()
            .regenerations
            .iter()
            .filter(|(user, _, at)| *user == user_id && *at >= since)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn recent_messages(
        &self,
        user_id: UserId,
        character_id: CharacterId,
        limit: usize,
    ) -> Result<Vec<DialogMessage>, JaniError> {
        let mut lines = self.dialog(user_id, character_id);
        lines.sort_by_key(|m| std::cmp::Reverse((m.created_at, m.id)));
        lines.truncate(limit);
        Ok(lines)
    }

    async fn append_message(
        &self,
        message: NewDialogMessage,
    ) -> Result<DialogMessage, JaniError> {
        let mut state = self.state();
        let stored = DialogMessage {
            id: state.next_id(),
            user_id: message.user_id,
            character_id: message.character_id,
            role: message.role,
            text: message.text,
            created_at: Utc::now(),
        };
        state.dialogs.push(stored.clone());
        Ok(stored)
    }

    async fn get_or_create_session(
        &self,
        user_id: UserId,
        character_id: CharacterId,
    ) -> Result<ChatSession, JaniError> {
        Ok(self
            .state()
            .sessions
            .entry((user_id, character_id))
            .or_insert_with(|| ChatSession::new(user_id, character_id))
            .clone())
    }

    async fn save_session(&self, session: &ChatSession) -> Result<(), JaniError> {
        self.state()
            .sessions
            .insert((session.user_id, session.character_id), session.clone());
        Ok(())
    }

    async fn list_memories(
        &self,
        user_id: UserId,
        character_id: CharacterId,
    ) -> Result<Vec<MemoryRecord>, JaniError> {
        let mut memories = self.memories(user_id, character_id);
        memories.sort_by(|a, b| {
            b.importance
                .cmp(&a.importance)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(memories)
    }

    async fn add_memory(&self, memory: NewMemory) -> Result<MemoryRecord, JaniError> {
        let mut state = self.state();
        let stored = MemoryRecord {
            id: state.next_id(),
            user_id: memory.user_id,
            character_id: memory.character_id,
            category: memory.category,
            content: memory.content,
            importance: memory.importance,
            created_at: Utc::now(),
        };
        state.memories.push(stored.clone());
        Ok(stored)
    }

    async fn delete_memory(&self, memory_id: i64) -> Result<(), JaniError> {
        self.state().memories.retain(|m| m.id != memory_id);
        Ok(())
    }

    async fn count_memories(
        &self,
        user_id: UserId,
        character_id: CharacterId,
    ) -> Result<usize, JaniError> {
        Ok(self.memories(user_id, character_id).len())
    }
}

/// An active free-tier character with no LLM overrides.
pub fn character(id: CharacterId, name: &str) -> CharacterRecord {
    CharacterRecord {
        id,
        name: name.to_string(),
        system_prompt: format!("You are {name}."),
        is_active: true,
        access: AccessTier::Free,
        provider: None,
        model: None,
        temperature: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn user_is_created_once() {
        let store = InMemoryStore::new();
        let first = store.find_or_create_user(42, Some("dana")).await.unwrap();
        let again = store.find_or_create_user(42, None).await.unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(again.username.as_deref(), Some("dana"));
    }

    #[tokio::test]
    async fn recent_messages_are_newest_first_and_limited() {
        let store = InMemoryStore::new();
        let t0 = Utc::now() - Duration::minutes(10);
        for i in 0..5 {
            store.seed_message(1, 2, DialogRole::User, &format!("m{i}"), t0 + Duration::minutes(i));
        }
        let recent = store.recent_messages(1, 2, 3).await.unwrap();
        let texts: Vec<_> = recent.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["m4", "m3", "m2"]);
    }

    #[tokio::test]
    async fn counts_only_user_lines_since() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store.seed_message(1, 2, DialogRole::User, "old", now - Duration::days(1));
        store.seed_message(1, 2, DialogRole::User, "new", now);
        store.seed_message(1, 2, DialogRole::Assistant, "reply", now);
        store.seed_message(1, 3, DialogRole::User, "other character", now);
        let since = now - Duration::hours(1);
        assert_eq!(store.count_user_messages_since(1, since).await.unwrap(), 2);
        assert_eq!(store.last_conversed_character(1).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn regenerations_are_counted_apart_from_dialog() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store.record_regeneration(1, 2, now - Duration::days(1)).await.unwrap();
        store.record_regeneration(1, 2, now).await.unwrap();
        store.record_regeneration(7, 2, now).await.unwrap();
        let since = now - Duration::hours(1);
        assert_eq!(store.count_regenerations_since(1, since).await.unwrap(), 1);
        assert_eq!(store.count_user_messages_since(1, since).await.unwrap(), 0);
        assert!(store.dialog(1, 2).is_empty());
    }
}
