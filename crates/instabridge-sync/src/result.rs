// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;

/// Characters of a conversation ID kept in error strings.
const CONVERSATION_ID_PREFIX: usize = 20;

/// Outcome of one sync run. Partial failures land in `errors`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncResult {
    pub conversations_found: usize,
    pub conversations_synced: usize,
    pub messages_synced: usize,
    pub messages_skipped: usize,
    pub errors: Vec<String>,
    /// Channel ID committed as the tenant's new `messaging_channel_id`.
    pub identity_corrected: Option<String>,
    /// Conversations resolved by the first-participant heuristic.
    pub low_confidence_resolutions: usize,
}

impl SyncResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Records a failure scoped to one conversation.
    pub fn record_conversation_error(&mut self, conversation_id: &str, error: impl fmt::Display) {
        self.errors.push(format!(
            "conversation {}: {error}",
            truncate_id(conversation_id)
        ));
    }

    pub fn record_error(&mut self, error: impl fmt::Display) {
        self.errors.push(error.to_string());
    }
}

/// Conversation IDs are long opaque tokens; keep a recognizable prefix.
fn truncate_id(id: &str) -> &str {
    match id.char_indices().nth(CONVERSATION_ID_PREFIX) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}
