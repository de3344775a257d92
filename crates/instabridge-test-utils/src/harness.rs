// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness backed by a temp SQLite database.
//!
//! `TestHarness` opens a real `SqliteStorage` in a temp directory and seeds
//! it with tenant accounts, so services run against the same storage code
//! as production.

use std::sync::Arc;

use instabridge_config::model::StorageConfig;
use instabridge_core::{BridgeError, StorageAdapter, TenantAccount};
use instabridge_storage::SqliteStorage;
use secrecy::SecretString;

/// Tenant record with a fixed test token.
pub fn tenant_account(id: &str, instagram_account_id: &str, channel: Option<&str>) -> TenantAccount {
    TenantAccount {
        id: id.to_string(),
        instagram_account_id: Some(instagram_account_id.to_string()),
        messaging_channel_id: channel.map(str::to_string),
        username: Some(format!("{id}_shop")),
        access_token: SecretString::from(format!("token-{id}")),
        created_at: String::new(),
        updated_at: String::new(),
    }
}

/// Builder for creating test environments with seeded tenants.
pub struct TestHarnessBuilder {
    tenants: Vec<TenantAccount>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            tenants: Vec::new(),
        }
    }

    /// Seed a tenant.
    pub fn with_tenant(mut self, id: &str, instagram_account_id: &str, channel: Option<&str>) -> Self {
        self.tenants
            .push(tenant_account(id, instagram_account_id, channel));
        self
    }

    /// Build the harness: open storage in a fresh temp dir and seed tenants.
    pub async fn build(self) -> Result<TestHarness, BridgeError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| BridgeError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let storage = SqliteStorage::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        });
        storage.initialize().await?;
        for tenant in &self.tenants {
            storage.upsert_account(tenant).await?;
        }

        Ok(TestHarness {
            storage: Arc::new(storage),
            _temp_dir: temp_dir,
        })
    }
}

/// Temp storage with seeded tenants.
pub struct TestHarness {
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<dyn StorageAdapter>,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Current stored state of a tenant.
    pub async fn tenant(&self, id: &str) -> Result<TenantAccount, BridgeError> {
        self.storage
            .get_account(id)
            .await?
            .ok_or_else(|| BridgeError::NotFound {
                entity: "account".into(),
                id: id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeds_tenants() {
        let harness = TestHarness::builder()
            .with_tenant("acct-1", "100", None)
            .with_tenant("acct-2", "300", Some("301"))
            .build()
            .await
            .unwrap();

        let tenant = harness.tenant("acct-2").await.unwrap();
        assert_eq!(tenant.messaging_channel_id.as_deref(), Some("301"));
        assert_eq!(harness.storage.list_accounts().await.unwrap().len(), 2);
        assert!(harness.tenant("ghost").await.is_err());
    }
}
