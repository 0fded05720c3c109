// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt assembly: system block, known user facts, then the dialog.

use jani_core::Message;
use jani_core::types::{DialogMessage, DialogRole, MemoryRecord};
use tracing::debug;

/// Fixed per-message overhead added to the token estimate.
const MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// Rough token estimate: one token per four characters, at least one.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4).max(1)
}

pub fn estimate_message_tokens(message: &Message) -> usize {
    estimate_tokens(&message.content) + MESSAGE_OVERHEAD_TOKENS
}

/// Sorts stored lines chronologically, oldest first.
pub fn order_history(mut history: Vec<DialogMessage>) -> Vec<DialogMessage> {
    history.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    history
}

/// Renders the pair's memories as a system block, one `- [category] content`
/// line each. `None` when there are no memories.
pub fn build_user_facts(memories: &[MemoryRecord]) -> Option<String> {
    if memories.is_empty() {
        return None;
    }
    let lines: Vec<String> = memories
        .iter()
        .map(|m| format!("- [{}] {}", m.category, m.content))
        .collect();
    Some(format!(
        "UserFacts (what the character already knows about the user):\n{}",
        lines.join("\n")
    ))
}

/// Dialog turns sent after the system block.
///
/// A normal message appends `text` as the new user turn. A regenerate
/// replays the history up to and including its last user line and appends
/// nothing; `text` is only used when the window holds no user line.
pub fn conversation_turns(history: &[DialogMessage], text: &str, is_regenerate: bool) -> Vec<Message> {
    if is_regenerate
        && let Some(last_user) = history.iter().rposition(|m| m.role == DialogRole::User)
    {
        return history[..=last_user].iter().map(DialogMessage::to_message).collect();
    }
    let mut turns: Vec<Message> = history.iter().map(DialogMessage::to_message).collect();
    turns.push(Message::user(text));
    turns
}

/// Keeps the newest turns that fit in `budget` tokens.
///
/// The latest turn is always kept, even when it alone exceeds the budget.
/// Returns the kept turns in their original order and the number dropped.
pub fn apply_history_budget(turns: Vec<Message>, budget: usize) -> (Vec<Message>, usize) {
    let total = turns.len();
    let mut kept = Vec::with_capacity(total);
    let mut used = 0;

    for (index, message) in turns.into_iter().rev().enumerate() {
        let tokens = estimate_message_tokens(&message);
        if index == 0 || used + tokens <= budget {
            used += tokens;
            kept.push(message);
        }
    }

    kept.reverse();
    let dropped = total - kept.len();
    (kept, dropped)
}

/// Builds the full prompt for one generation call.
///
/// With `token_budget == 0` the whole window is sent. Otherwise the dialog
/// gets what remains after the system block and the response reserve.
pub fn assemble_prompt(
    system_prompt: &str,
    memories: &[MemoryRecord],
    turns: Vec<Message>,
    token_budget: usize,
    response_reserve: usize,
) -> Vec<Message> {
    let mut prompt = vec![Message::system(system_prompt)];
    if let Some(facts) = build_user_facts(memories) {
        prompt.push(Message::system(facts));
    }

    let turns = if token_budget > 0 {
        let static_tokens: usize = prompt.iter().map(estimate_message_tokens).sum();
        let latest = turns.last().map(estimate_message_tokens).unwrap_or(0);
        let available = token_budget
            .saturating_sub(static_tokens + response_reserve)
            .max(latest);
        let (kept, dropped) = apply_history_budget(turns, available);
        if dropped > 0 {
            debug!(dropped, available, "history trimmed to token budget");
        }
        kept
    } else {
        turns
    };

    prompt.extend(turns);
    prompt
}
