// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand implementations.
//!
//! Every command opens the same storage, builds a per-tenant Graph API
//! client from the stored token, and prints either a short text summary or
//! JSON for scripting.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use instabridge_config::model::BridgeConfig;
use instabridge_core::{BridgeError, Message, StorageAdapter, TenantAccount};
use instabridge_instagram::InstagramClient;
use instabridge_storage::SqliteStorage;
use instabridge_sync::{
    AccountLinkingService, InstagramSyncService, OutboundService, ProfileCache, RetryPolicy,
    SyncOptions, SyncResult, WebhookOutcome, WebhookProcessor,
};
use secrecy::SecretString;
use serde::Serialize;
use tracing::warn;

/// JSON shape of one account's sync.
#[derive(Debug, Serialize)]
pub struct SyncReport {
    pub account_id: String,
    pub conversations_found: usize,
    pub conversations_synced: usize,
    pub messages_synced: usize,
    pub messages_skipped: usize,
    pub identity_corrected: Option<String>,
    pub errors: Vec<String>,
}

impl SyncReport {
    fn new(account_id: &str, result: &SyncResult) -> Self {
        Self {
            account_id: account_id.to_string(),
            conversations_found: result.conversations_found,
            conversations_synced: result.conversations_synced,
            messages_synced: result.messages_synced,
            messages_skipped: result.messages_skipped,
            identity_corrected: result.identity_corrected.clone(),
            errors: result.errors.clone(),
        }
    }

    fn print_text(&self) {
        println!(
            "{}: {}/{} conversations, {} new messages, {} skipped",
            self.account_id,
            self.conversations_synced,
            self.conversations_found,
            self.messages_synced,
            self.messages_skipped
        );
        if let Some(channel) = &self.identity_corrected {
            println!("  messaging channel id corrected to {channel}");
        }
        for error in &self.errors {
            println!("  error: {error}");
        }
    }
}

#[derive(Debug, Serialize)]
struct MessageReport<'a> {
    id: &'a str,
    sender_id: &'a str,
    recipient_id: &'a str,
    direction: String,
    timestamp: String,
}

impl<'a> From<&'a Message> for MessageReport<'a> {
    fn from(message: &'a Message) -> Self {
        Self {
            id: &message.id,
            sender_id: &message.sender_id,
            recipient_id: &message.recipient_id,
            direction: message.direction.to_string(),
            timestamp: message.timestamp.to_rfc3339(),
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), BridgeError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| BridgeError::Internal(format!("failed to encode output: {e}")))?;
    println!("{out}");
    Ok(())
}

/// Opened storage plus the services built on it.
pub struct Bridge {
    config: BridgeConfig,
    storage: Arc<dyn StorageAdapter>,
    cache: Arc<ProfileCache>,
}

impl Bridge {
    pub async fn open(config: BridgeConfig) -> Result<Self, BridgeError> {
        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        let cache = Arc::new(ProfileCache::from_config(&config.cache));
        Ok(Self {
            config,
            storage: Arc::new(storage),
            cache,
        })
    }

    pub async fn close(&self) {
        if let Err(e) = self.storage.close().await {
            warn!(error = %e, "storage close failed");
        }
    }

    fn sync_service(&self) -> InstagramSyncService {
        InstagramSyncService::new(self.storage.clone())
            .with_profile_cache(self.cache.clone())
            .with_retry_policy(RetryPolicy::from_config(&self.config.sync))
    }

    fn client(&self, token: &SecretString) -> Result<InstagramClient, BridgeError> {
        InstagramClient::new(token, &self.config.instagram)
    }

    async fn account(&self, id: &str) -> Result<TenantAccount, BridgeError> {
        self.storage
            .get_account(id)
            .await?
            .ok_or_else(|| BridgeError::NotFound {
                entity: "account".into(),
                id: id.to_string(),
            })
    }

    pub async fn run_sync(
        &self,
        account_id: Option<&str>,
        hours_back: Option<u32>,
        json: bool,
    ) -> Result<(), BridgeError> {
        let accounts = match account_id {
            Some(id) => vec![self.account(id).await?],
            None => self.storage.list_accounts().await?,
        };
        let mut options = SyncOptions::from_config(&self.config.sync);
        if let Some(hours) = hours_back {
            options.hours_back = hours;
        }

        let service = self.sync_service();
        let mut reports = Vec::with_capacity(accounts.len());
        for account in &accounts {
            let client = self.client(&account.access_token)?;
            let result = service.sync_account(account, &client, &options).await;
            reports.push(SyncReport::new(&account.id, &result));
        }

        if json {
            print_json(&reports)
        } else {
            if reports.is_empty() {
                println!("no linked accounts");
            }
            reports.iter().for_each(SyncReport::print_text);
            Ok(())
        }
    }

    pub async fn run_link(
        &self,
        account_id: &str,
        token: SecretString,
        json: bool,
    ) -> Result<(), BridgeError> {
        let client = self.client(&token)?;
        let linker = AccountLinkingService::new(
            self.storage.clone(),
            self.sync_service(),
            SyncOptions::from_config(&self.config.sync),
        );
        let outcome = linker.link_account(account_id, token, &client).await?;
        let report = SyncReport::new(account_id, &outcome.initial_sync);

        if json {
            print_json(&report)
        } else {
            println!(
                "linked {} as instagram account {}",
                account_id,
                outcome.account.instagram_account_id.as_deref().unwrap_or("?")
            );
            report.print_text();
            Ok(())
        }
    }

    pub async fn run_ingest(&self, file: Option<&Path>, json: bool) -> Result<(), BridgeError> {
        let body = match file {
            Some(path) => std::fs::read(path)
                .map_err(|e| BridgeError::Internal(format!("reading {}: {e}", path.display())))?,
            None => {
                let mut buf = Vec::new();
                std::io::stdin()
                    .read_to_end(&mut buf)
                    .map_err(|e| BridgeError::Internal(format!("reading stdin: {e}")))?;
                buf
            }
        };

        let outcome = WebhookProcessor::new(self.storage.clone())
            .process(&body)
            .await?;
        if json {
            print_json(&WebhookReport::from(outcome))
        } else {
            println!(
                "stored {}, skipped {}, unrouted {}, errors {}",
                outcome.stored, outcome.skipped, outcome.unrouted, outcome.errors
            );
            Ok(())
        }
    }

    pub async fn run_send(
        &self,
        account_id: &str,
        to: &str,
        text: &str,
        idempotency_key: Option<&str>,
        json: bool,
    ) -> Result<(), BridgeError> {
        let account = self.account(account_id).await?;
        let client = self.client(&account.access_token)?;
        let message = OutboundService::new(self.storage.clone())
            .send_text(&account, &client, to, text, idempotency_key)
            .await?;

        if json {
            print_json(&MessageReport::from(&message))
        } else {
            println!("sent {} to {}", message.id, message.recipient_id);
            Ok(())
        }
    }

    pub async fn run_conversations(
        &self,
        account_id: &str,
        limit: i64,
        json: bool,
    ) -> Result<(), BridgeError> {
        let summaries = self
            .storage
            .get_conversations_for_account(account_id, limit)
            .await?;

        if json {
            let rows: Vec<_> = summaries
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "customer_id": s.customer_id,
                        "last_message_at": s.last_message_at.to_rfc3339(),
                        "last_message_text": s.last_message_text,
                        "message_count": s.message_count,
                    })
                })
                .collect();
            return print_json(&rows);
        }

        if summaries.is_empty() {
            println!("no conversations stored for {account_id}");
        }
        for summary in &summaries {
            println!(
                "{}  {}  {} messages  {}",
                summary.last_message_at.format("%Y-%m-%d %H:%M"),
                summary.customer_id,
                summary.message_count,
                summary.last_message_text.as_deref().unwrap_or("")
            );
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct WebhookReport {
    stored: usize,
    skipped: usize,
    unrouted: usize,
    errors: usize,
}

impl From<WebhookOutcome> for WebhookReport {
    fn from(outcome: WebhookOutcome) -> Self {
        Self {
            stored: outcome.stored,
            skipped: outcome.skipped,
            unrouted: outcome.unrouted,
            errors: outcome.errors,
        }
    }
}
