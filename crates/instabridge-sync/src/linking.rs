// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Onboarding of a tenant after the OAuth exchange.

use std::sync::Arc;

use instabridge_core::{BridgeError, InstagramApi, StorageAdapter, TenantAccount};
use secrecy::SecretString;
use tracing::{info, warn};

use crate::result::SyncResult;
use crate::service::{InstagramSyncService, SyncOptions};

/// A linked tenant plus the outcome of its first sync.
#[derive(Debug)]
pub struct LinkOutcome {
    pub account: TenantAccount,
    pub initial_sync: SyncResult,
}

/// Links Instagram accounts to tenants and seeds their history.
pub struct AccountLinkingService {
    storage: Arc<dyn StorageAdapter>,
    sync: InstagramSyncService,
    options: SyncOptions,
}

impl AccountLinkingService {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        sync: InstagramSyncService,
        options: SyncOptions,
    ) -> Self {
        Self {
            storage,
            sync,
            options,
        }
    }

    /// Stores the tenant under `account_id` and runs an initial sync.
    ///
    /// `api` must be authenticated with `access_token`. The profile's
    /// `user_id` is what webhooks route on, so it seeds
    /// `messaging_channel_id` when it differs from the profile ID. A failed
    /// initial sync is reported in the outcome and never fails the link.
    pub async fn link_account(
        &self,
        account_id: &str,
        access_token: SecretString,
        api: &dyn InstagramApi,
    ) -> Result<LinkOutcome, BridgeError> {
        let profile = api.get_own_profile().await?.ok_or_else(|| BridgeError::Api {
            message: "own profile unavailable".into(),
            source: None,
        })?;

        let messaging_channel_id = profile
            .user_id
            .filter(|user_id| !user_id.trim().is_empty() && *user_id != profile.id);

        let account = TenantAccount {
            id: account_id.to_string(),
            instagram_account_id: Some(profile.id.clone()),
            messaging_channel_id,
            username: profile.username,
            access_token,
            created_at: String::new(),
            updated_at: String::new(),
        };
        self.storage.upsert_account(&account).await?;

        let account = self
            .storage
            .get_account(account_id)
            .await?
            .ok_or_else(|| BridgeError::NotFound {
                entity: "account".into(),
                id: account_id.to_string(),
            })?;
        info!(
            account_id,
            instagram_account_id = %profile.id,
            messaging_channel_id = account.messaging_channel_id.as_deref().unwrap_or("-"),
            "account linked"
        );

        let initial_sync = self.sync.sync_account(&account, api, &self.options).await;
        if !initial_sync.is_clean() {
            warn!(
                account_id,
                errors = initial_sync.errors.len(),
                "initial sync finished with errors"
            );
        }

        Ok(LinkOutcome {
            account,
            initial_sync,
        })
    }
}
