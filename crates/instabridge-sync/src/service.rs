// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Two-phase conversation sync.
//!
//! Phase one lists conversation metadata (cheap, retried); phase two fetches
//! messages only for conversations updated inside the recency window. All
//! writes of a run are staged in a [`SyncBatch`] and committed once, so an
//! identity correction never lands without the messages that revealed it.
//!
//! A sync never returns an error. Failures are recorded in
//! [`SyncResult::errors`] and the run carries on with the next item.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use instabridge_config::model::SyncConfig;
use instabridge_core::{
    BridgeError, Conversation, DeliveryStatus, InstagramApi, Message, ProviderMessage,
    StorageAdapter, SyncBatch, TenantAccount,
};
use tracing::{debug, info, warn};

use crate::cache::ProfileCache;
use crate::identity::AccountIdentity;
use crate::metrics;
use crate::resolve::{
    customer_from_messages, resolve_participants, ParticipantResolution, ResolutionConfidence,
};
use crate::result::SyncResult;
use crate::retry::RetryPolicy;
use crate::timestamps::{is_within_window, parse_provider_timestamp};

/// Per-run sync parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub hours_back: u32,
    pub max_messages_per_conversation: usize,
    pub conversation_limit: usize,
    pub cache_profiles: bool,
    /// Wall-clock cap on fetching. Staged messages are still committed.
    pub timeout: Option<Duration>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            hours_back: 24,
            max_messages_per_conversation: 25,
            conversation_limit: 50,
            cache_profiles: true,
            timeout: None,
        }
    }
}

impl SyncOptions {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            hours_back: config.hours_back,
            max_messages_per_conversation: config.max_messages_per_conversation,
            conversation_limit: config.conversation_limit,
            cache_profiles: config.cache_profiles,
            timeout: config.timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Mutable state of one run.
struct SyncRun {
    identity: AccountIdentity,
    batch: SyncBatch,
    result: SyncResult,
}

impl SyncRun {
    /// Adopts a business ID that differs from the effective channel ID, at
    /// most once per run.
    ///
    /// Once a correction is staged, IDs the run already recognizes are
    /// accepted as is. Returns false for an unknown ID after that point.
    fn observe_business_id(&mut self, business_id: &str) -> bool {
        if business_id == self.identity.effective_channel_id() {
            return true;
        }
        if let Some(staged) = &self.batch.messaging_channel_id {
            if self.identity.is_business_id(business_id) {
                return true;
            }
            warn!(
                account_id = %self.identity.account_id(),
                staged = %staged,
                observed = business_id,
                "conflicting business id observed, keeping the first correction"
            );
            return false;
        }

        info!(
            account_id = %self.identity.account_id(),
            previous = %self.identity.effective_channel_id(),
            observed = business_id,
            "correcting messaging channel id"
        );
        self.identity = self.identity.corrected_to(business_id);
        self.batch.messaging_channel_id = Some(business_id.to_string());
        true
    }
}

/// Pulls a tenant's recent Instagram history into storage.
pub struct InstagramSyncService {
    storage: Arc<dyn StorageAdapter>,
    cache: Option<Arc<ProfileCache>>,
    retry: RetryPolicy,
}

impl InstagramSyncService {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self {
            storage,
            cache: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_profile_cache(mut self, cache: Arc<ProfileCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Syncs one tenant against the current time.
    pub async fn sync_account(
        &self,
        account: &TenantAccount,
        api: &dyn InstagramApi,
        options: &SyncOptions,
    ) -> SyncResult {
        self.sync_account_at(account, api, options, Utc::now()).await
    }

    /// Syncs one tenant with the recency window anchored at `now`.
    pub async fn sync_account_at(
        &self,
        account: &TenantAccount,
        api: &dyn InstagramApi,
        options: &SyncOptions,
        now: DateTime<Utc>,
    ) -> SyncResult {
        let identity = match AccountIdentity::from_account(account) {
            Ok(identity) => identity,
            Err(e) => {
                warn!(account_id = %account.id, error = %e, "cannot sync account");
                metrics::record_sync_run("failed");
                let mut result = SyncResult::default();
                result.record_error(e);
                return result;
            }
        };

        let mut run = SyncRun {
            identity,
            batch: SyncBatch::new(account.id.clone()),
            result: SyncResult::default(),
        };

        match options.timeout {
            Some(limit) => {
                if tokio::time::timeout(limit, self.collect(&mut run, api, options, now))
                    .await
                    .is_err()
                {
                    warn!(
                        account_id = %account.id,
                        timeout_secs = limit.as_secs(),
                        staged = run.batch.messages.len(),
                        "sync timed out, committing what was staged"
                    );
                    run.result
                        .record_error(BridgeError::Timeout { duration: limit });
                }
            }
            None => self.collect(&mut run, api, options, now).await,
        }

        let SyncRun {
            batch, mut result, ..
        } = run;
        self.commit(batch, &mut result).await;

        let status = if result.conversations_found == 0 && result.is_clean() {
            "empty"
        } else if result.is_clean() {
            "ok"
        } else {
            "degraded"
        };
        metrics::record_sync_run(status);
        metrics::record_sync_messages("synced", result.messages_synced);
        metrics::record_sync_messages("skipped", result.messages_skipped);
        info!(
            account_id = %account.id,
            conversations_found = result.conversations_found,
            conversations_synced = result.conversations_synced,
            messages_synced = result.messages_synced,
            messages_skipped = result.messages_skipped,
            errors = result.errors.len(),
            "sync finished"
        );
        result
    }

    /// Phases one and two. Everything lands in `run`.
    async fn collect(
        &self,
        run: &mut SyncRun,
        api: &dyn InstagramApi,
        options: &SyncOptions,
        now: DateTime<Utc>,
    ) {
        let conversations = self
            .retry
            .list_with_retry("conversations", || {
                api.get_conversations(options.conversation_limit, false)
            })
            .await;
        run.result.conversations_found = conversations.len();
        if conversations.is_empty() {
            debug!(account_id = %run.identity.account_id(), "no conversations to sync");
            return;
        }

        // A window reaching past the representable range has no cutoff.
        let cutoff = chrono::Duration::try_hours(i64::from(options.hours_back))
            .and_then(|window| now.checked_sub_signed(window));
        if cutoff.is_none() {
            debug!(hours_back = options.hours_back, "recency window unbounded");
        }
        let recent: Vec<Conversation> = conversations
            .into_iter()
            .filter(|c| {
                cutoff.is_none_or(|cutoff| is_within_window(c.updated_time.as_deref(), cutoff))
            })
            .collect();
        debug!(
            account_id = %run.identity.account_id(),
            found = run.result.conversations_found,
            recent = recent.len(),
            "conversations filtered by recency"
        );

        for conversation in &recent {
            match self
                .sync_conversation(run, api, options, conversation, now)
                .await
            {
                Ok(()) => run.result.conversations_synced += 1,
                Err(e) => {
                    warn!(conversation_id = %conversation.id, error = %e, "conversation sync failed");
                    run.result.record_conversation_error(&conversation.id, e);
                }
            }
        }
    }

    async fn sync_conversation(
        &self,
        run: &mut SyncRun,
        api: &dyn InstagramApi,
        options: &SyncOptions,
        conversation: &Conversation,
        now: DateTime<Utc>,
    ) -> Result<(), BridgeError> {
        let resolved = match resolve_participants(&run.identity, conversation) {
            ParticipantResolution::Resolved {
                business_id,
                customer_id,
                confidence,
            } => {
                if confidence == ResolutionConfidence::AssumedFirstParticipant {
                    warn!(
                        conversation_id = %conversation.id,
                        business_id = %business_id,
                        customer_id = %customer_id,
                        "no participant matched the account, assuming the first is the business"
                    );
                    metrics::record_identity_fallback("first_participant");
                    run.result.low_confidence_resolutions += 1;
                }
                Some((business_id, customer_id))
            }
            ParticipantResolution::Ambiguous => {
                return Err(BridgeError::Identity(
                    "both participants are business ids".into(),
                ));
            }
            ParticipantResolution::Unresolvable => {
                debug!(
                    conversation_id = %conversation.id,
                    participants = conversation.participants.len(),
                    "participants unresolvable, resolving customer from messages"
                );
                None
            }
        };

        let messages = api
            .get_conversation_messages(&conversation.id, options.max_messages_per_conversation)
            .await?
            .ok_or_else(|| BridgeError::Api {
                message: "conversation messages unavailable".into(),
                source: None,
            })?;

        let customer_id = match resolved {
            Some((business_id, customer_id)) => {
                if !run.observe_business_id(&business_id) {
                    return Err(BridgeError::Identity(format!(
                        "business id {business_id} conflicts with the correction staged this run"
                    )));
                }
                customer_id
            }
            None => customer_from_messages(&run.identity, &messages).ok_or_else(|| {
                BridgeError::Identity("could not determine the customer".into())
            })?,
        };

        if options.cache_profiles {
            self.cache_profile(api, &customer_id).await;
        }

        for message in &messages {
            if let Err(e) = self.stage_message(run, message, &customer_id, now).await {
                run.result
                    .record_conversation_error(&conversation.id, format!("message {}: {e}", message.id));
            }
        }
        Ok(())
    }

    /// Dedupes one provider message and stages it. Duplicates count as skipped.
    async fn stage_message(
        &self,
        run: &mut SyncRun,
        message: &ProviderMessage,
        customer_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), BridgeError> {
        if run.batch.contains(&message.id) || self.storage.message_exists(&message.id).await? {
            run.result.messages_skipped += 1;
            return Ok(());
        }

        let from_id = message
            .from_id
            .as_deref()
            .ok_or_else(|| BridgeError::MalformedPayload {
                context: "conversation message".into(),
                message: "missing sender".into(),
            })?;

        let direction = run.identity.detect_direction(from_id);
        let (sender_id, recipient_id) = run.identity.normalize_message_ids(from_id, customer_id);
        let timestamp = match message.created_time.as_deref().and_then(parse_provider_timestamp) {
            Some(ts) => ts,
            None => {
                debug!(message_id = %message.id, "unparsable message time, using now");
                now
            }
        };
        let attachments = if message.attachments.is_empty() {
            None
        } else {
            Some(
                serde_json::to_string(&message.attachments)
                    .map_err(|e| BridgeError::Internal(format!("encoding attachments: {e}")))?,
            )
        };

        run.batch.messages.push(Message {
            id: message.id.clone(),
            account_id: run.identity.account_id().to_string(),
            sender_id,
            recipient_id,
            message_text: message.text.clone(),
            attachments,
            timestamp,
            direction,
            delivery_status: DeliveryStatus::Synced,
            idempotency_key: None,
        });
        Ok(())
    }

    /// Best effort: failures are logged, never propagated.
    async fn cache_profile(&self, api: &dyn InstagramApi, customer_id: &str) {
        let Some(cache) = &self.cache else {
            return;
        };
        if cache.get(customer_id).is_some() {
            return;
        }
        match api.get_user_profile(customer_id).await {
            Ok(Some(profile)) => cache.set(customer_id, profile),
            Ok(None) => debug!(customer_id, "profile unavailable"),
            Err(e) => warn!(customer_id, error = %e, "profile fetch failed"),
        }
    }

    async fn commit(&self, batch: SyncBatch, result: &mut SyncResult) {
        if batch.is_empty() {
            return;
        }
        let correction = batch.messaging_channel_id.clone();
        let account_id = batch.account_id.clone();

        match self.storage.commit_sync_batch(batch).await {
            Ok(outcome) => {
                result.messages_synced = outcome.inserted;
                result.messages_skipped += outcome.duplicates;
                result.identity_corrected = correction;
            }
            Err(e) => {
                warn!(account_id = %account_id, error = %e, "sync commit failed");
                result.record_error(format!("commit failed: {e}"));
                result.messages_synced = 0;
                result.conversations_synced = 0;
            }
        }
    }
}
