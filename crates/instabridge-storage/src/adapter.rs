// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use instabridge_config::model::StorageConfig;
use instabridge_core::{
    BridgeError, CommitOutcome, ConversationSummary, Message, StorageAdapter, SyncBatch,
    TenantAccount,
};

use crate::database::{storage_err, Database};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`] is called.
    ///
    /// [`initialize`]: StorageAdapter::initialize
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, BridgeError> {
        self.db.get().ok_or_else(|| BridgeError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), BridgeError> {
        let path = self.config.database_path.clone();
        let db = Database::open_with(&path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| BridgeError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), BridgeError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            })
            .await
            .map_err(storage_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Tenant accounts ---

    async fn get_account(&self, id: &str) -> Result<Option<TenantAccount>, BridgeError> {
        queries::accounts::get_account(self.db()?, id).await
    }

    async fn list_accounts(&self) -> Result<Vec<TenantAccount>, BridgeError> {
        queries::accounts::list_accounts(self.db()?).await
    }

    async fn find_account_by_business_id(
        &self,
        id: &str,
    ) -> Result<Option<TenantAccount>, BridgeError> {
        queries::accounts::find_account_by_business_id(self.db()?, id).await
    }

    async fn upsert_account(&self, account: &TenantAccount) -> Result<(), BridgeError> {
        queries::accounts::upsert_account(self.db()?, account).await
    }

    async fn update_messaging_channel_id(
        &self,
        account_id: &str,
        channel_id: &str,
    ) -> Result<(), BridgeError> {
        queries::accounts::update_messaging_channel_id(self.db()?, account_id, channel_id).await
    }

    // --- Messages ---

    async fn message_exists(&self, id: &str) -> Result<bool, BridgeError> {
        queries::messages::message_exists(self.db()?, id).await
    }

    async fn get_message(&self, id: &str) -> Result<Option<Message>, BridgeError> {
        queries::messages::get_message(self.db()?, id).await
    }

    async fn get_message_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<Message>, BridgeError> {
        queries::messages::get_message_by_idempotency_key(self.db()?, key).await
    }

    async fn insert_message(&self, message: &Message) -> Result<(), BridgeError> {
        queries::messages::insert_message(self.db()?, message).await
    }

    async fn list_messages(
        &self,
        account_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, BridgeError> {
        queries::messages::list_messages(self.db()?, account_id, limit).await
    }

    async fn get_conversations_for_account(
        &self,
        account_id: &str,
        limit: i64,
    ) -> Result<Vec<ConversationSummary>, BridgeError> {
        queries::messages::get_conversations_for_account(self.db()?, account_id, limit).await
    }

    async fn commit_sync_batch(&self, batch: SyncBatch) -> Result<CommitOutcome, BridgeError> {
        queries::sync::commit_sync_batch(self.db()?, batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn initialize_opens_database_at_configured_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("init_test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
        storage.close().await.unwrap();
    }

    #[tokio::test]
    async fn operations_before_initialize_fail() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("uninit.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        let err = storage.list_accounts().await.unwrap_err();
        assert!(err.to_string().contains("not initialized"));
    }

    #[tokio::test]
    async fn double_initialize_fails() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
    }
}
