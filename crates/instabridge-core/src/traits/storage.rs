// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, etc.).

use async_trait::async_trait;

use crate::error::BridgeError;
use crate::types::{CommitOutcome, ConversationSummary, Message, SyncBatch, TenantAccount};

/// Adapter for storage and persistence backends.
///
/// Holds tenant accounts and the message history. Message IDs are unique;
/// inserting a known ID is reported as [`BridgeError::DuplicateMessage`] so
/// callers can treat it as "already processed" rather than a failure.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), BridgeError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), BridgeError>;

    // --- Tenant accounts ---

    async fn get_account(&self, id: &str) -> Result<Option<TenantAccount>, BridgeError>;

    async fn list_accounts(&self) -> Result<Vec<TenantAccount>, BridgeError>;

    /// Finds the tenant whose `instagram_account_id` or `messaging_channel_id` equals `id`.
    async fn find_account_by_business_id(
        &self,
        id: &str,
    ) -> Result<Option<TenantAccount>, BridgeError>;

    /// Inserts the account or replaces its identifiers, username, and token.
    async fn upsert_account(&self, account: &TenantAccount) -> Result<(), BridgeError>;

    async fn update_messaging_channel_id(
        &self,
        account_id: &str,
        channel_id: &str,
    ) -> Result<(), BridgeError>;

    // --- Messages ---

    async fn message_exists(&self, id: &str) -> Result<bool, BridgeError>;

    async fn get_message(&self, id: &str) -> Result<Option<Message>, BridgeError>;

    async fn get_message_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<Message>, BridgeError>;

    /// Inserts a single message. Fails with `DuplicateMessage` if the ID
    /// (or idempotency key) is already stored.
    async fn insert_message(&self, message: &Message) -> Result<(), BridgeError>;

    /// Messages of one tenant in chronological order.
    async fn list_messages(
        &self,
        account_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, BridgeError>;

    /// Stored conversations of one tenant, newest first.
    async fn get_conversations_for_account(
        &self,
        account_id: &str,
        limit: i64,
    ) -> Result<Vec<ConversationSummary>, BridgeError>;

    /// Commits a sync run's identity correction and messages atomically.
    ///
    /// Duplicate message IDs are counted in the outcome, not raised.
    async fn commit_sync_batch(&self, batch: SyncBatch) -> Result<CommitOutcome, BridgeError>;
}
