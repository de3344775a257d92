// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live message ingestion from Instagram webhooks.
//!
//! Each event is routed to a tenant by business ID, normalized with the
//! tenant's [`AccountIdentity`], and stored with `delivery_status = sent`.
//! Deliveries are at-least-once, so redelivered messages count as skipped.
//! A channel-ID backfill is committed in the same transaction as the
//! message that revealed it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use instabridge_core::{
    BridgeError, CommitOutcome, DeliveryStatus, Message, StorageAdapter, SyncBatch, TenantAccount,
};
use instabridge_instagram::{parse_webhook_payload, WebhookMessageEvent};
use tracing::{debug, info, warn};

use crate::identity::AccountIdentity;
use crate::metrics;

/// Per-delivery counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WebhookOutcome {
    pub stored: usize,
    pub skipped: usize,
    /// Events no tenant claims.
    pub unrouted: usize,
    pub errors: usize,
}

enum EventOutcome {
    Stored,
    Skipped,
    Unrouted,
}

pub struct WebhookProcessor {
    storage: Arc<dyn StorageAdapter>,
}

impl WebhookProcessor {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Processes one webhook body.
    ///
    /// Only a body that is not a webhook envelope is an error; per-event
    /// failures are logged and counted.
    pub async fn process(&self, body: &[u8]) -> Result<WebhookOutcome, BridgeError> {
        let events = parse_webhook_payload(body)?;
        let mut outcome = WebhookOutcome::default();

        for event in &events {
            match self.process_event(event).await {
                Ok(EventOutcome::Stored) => outcome.stored += 1,
                Ok(EventOutcome::Skipped) => outcome.skipped += 1,
                Ok(EventOutcome::Unrouted) => outcome.unrouted += 1,
                Err(e) => {
                    warn!(message_id = %event.message_id, error = %e, "webhook event failed");
                    outcome.errors += 1;
                }
            }
        }

        metrics::record_webhook_events("stored", outcome.stored);
        metrics::record_webhook_events("skipped", outcome.skipped);
        metrics::record_webhook_events("unrouted", outcome.unrouted);
        metrics::record_webhook_events("failed", outcome.errors);
        debug!(
            events = events.len(),
            stored = outcome.stored,
            skipped = outcome.skipped,
            unrouted = outcome.unrouted,
            errors = outcome.errors,
            "webhook processed"
        );
        Ok(outcome)
    }

    async fn process_event(&self, event: &WebhookMessageEvent) -> Result<EventOutcome, BridgeError> {
        let Some(account) = self.route(event).await? else {
            debug!(
                channel_id = %event.channel_id,
                sender_id = %event.sender_id,
                recipient_id = %event.recipient_id,
                "no tenant for webhook event"
            );
            return Ok(EventOutcome::Unrouted);
        };

        // The channel backfill and the message commit together.
        let mut batch = SyncBatch::new(account.id.clone());
        let mut identity = AccountIdentity::from_account(&account)?;
        if identity.messaging_channel_id().is_none()
            && event.channel_id != identity.instagram_account_id()
        {
            identity = identity.with_messaging_channel_id(event.channel_id.as_str());
            batch.messaging_channel_id = Some(event.channel_id.clone());
        }

        if self.storage.message_exists(&event.message_id).await? {
            self.commit(batch).await?;
            return Ok(EventOutcome::Skipped);
        }

        let other = identity.identify_other_party(&event.sender_id, &event.recipient_id)?;
        let (sender_id, recipient_id) =
            identity.normalize_message_ids(&event.sender_id, &other.customer_id);
        let attachments = if event.attachments.is_empty() {
            None
        } else {
            Some(
                serde_json::to_string(&event.attachments)
                    .map_err(|e| BridgeError::Internal(format!("encoding attachments: {e}")))?,
            )
        };

        batch.messages.push(Message {
            id: event.message_id.clone(),
            account_id: account.id.clone(),
            sender_id,
            recipient_id,
            message_text: event.text.clone(),
            attachments,
            timestamp: event
                .timestamp_ms
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .unwrap_or_else(Utc::now),
            direction: identity.detect_direction(&event.sender_id),
            delivery_status: DeliveryStatus::Sent,
            idempotency_key: None,
        });

        let committed = self.commit(batch).await?;
        if committed.inserted > 0 {
            Ok(EventOutcome::Stored)
        } else {
            Ok(EventOutcome::Skipped)
        }
    }

    async fn commit(&self, batch: SyncBatch) -> Result<CommitOutcome, BridgeError> {
        if batch.is_empty() {
            return Ok(CommitOutcome::default());
        }
        let backfill = batch.messaging_channel_id.clone();
        let account_id = batch.account_id.clone();
        let committed = self.storage.commit_sync_batch(batch).await?;
        if let Some(channel_id) = backfill {
            info!(
                account_id = %account_id,
                channel_id = %channel_id,
                "backfilled messaging channel id from webhook"
            );
        }
        Ok(committed)
    }

    /// Tries `entry.id`, then the sender, then the recipient.
    async fn route(&self, event: &WebhookMessageEvent) -> Result<Option<TenantAccount>, BridgeError> {
        for candidate in [&event.channel_id, &event.sender_id, &event.recipient_id] {
            if let Some(account) = self.storage.find_account_by_business_id(candidate).await? {
                return Ok(Some(account));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use instabridge_core::Direction;
    use instabridge_test_utils::TestHarness;
    use serde_json::json;

    fn delivery(entry_id: &str, sender: &str, recipient: &str, mid: &str, is_echo: bool) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "object": "instagram",
            "entry": [{
                "id": entry_id,
                "time": 1767225600,
                "messaging": [{
                    "sender": {"id": sender},
                    "recipient": {"id": recipient},
                    "timestamp": 1767225600000_i64,
                    "message": {"mid": mid, "text": "hello", "is_echo": is_echo}
                }]
            }]
        }))
        .unwrap()
    }

    async fn processor() -> (TestHarness, WebhookProcessor) {
        let harness = TestHarness::builder()
            .with_tenant("acct-1", "100", None)
            .build()
            .await
            .unwrap();
        let processor = WebhookProcessor::new(harness.storage.clone());
        (harness, processor)
    }

    #[tokio::test]
    async fn inbound_message_is_stored_once() {
        let (harness, processor) = processor().await;
        let body = delivery("100", "200", "100", "mid.1", false);

        let first = processor.process(&body).await.unwrap();
        let second = processor.process(&body).await.unwrap();

        assert_eq!(first.stored, 1);
        assert_eq!(second, WebhookOutcome { skipped: 1, ..Default::default() });

        let stored = harness.storage.get_message("mid.1").await.unwrap().unwrap();
        assert_eq!(stored.direction, Direction::Inbound);
        assert_eq!(stored.delivery_status, DeliveryStatus::Sent);
        assert_eq!((stored.sender_id.as_str(), stored.recipient_id.as_str()), ("200", "100"));
        assert_eq!(stored.timestamp, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn echo_is_outbound() {
        let (harness, processor) = processor().await;
        let outcome = processor
            .process(&delivery("100", "100", "200", "mid.2", true))
            .await
            .unwrap();

        assert_eq!(outcome.stored, 1);
        let stored = harness.storage.get_message("mid.2").await.unwrap().unwrap();
        assert_eq!(stored.direction, Direction::Outbound);
        assert_eq!(stored.recipient_id, "200");
    }

    #[tokio::test]
    async fn channel_id_is_backfilled_from_entry() {
        let (harness, processor) = processor().await;
        let outcome = processor
            .process(&delivery("178", "200", "100", "mid.3", false))
            .await
            .unwrap();

        assert_eq!(outcome.stored, 1);
        let tenant = harness.tenant("acct-1").await.unwrap();
        assert_eq!(tenant.messaging_channel_id.as_deref(), Some("178"));
        let stored = harness.storage.get_message("mid.3").await.unwrap().unwrap();
        assert_eq!(stored.recipient_id, "178");

        // Later deliveries route on the learned channel ID directly.
        let next = processor
            .process(&delivery("178", "300", "178", "mid.4", false))
            .await
            .unwrap();
        assert_eq!(next.stored, 1);
    }

    #[tokio::test]
    async fn failed_event_does_not_backfill_channel_id() {
        let (harness, processor) = processor().await;
        // Sender and recipient are both the business once "178" is learned.
        let outcome = processor
            .process(&delivery("178", "178", "100", "mid.7", false))
            .await
            .unwrap();

        assert_eq!(outcome.errors, 1);
        assert!(!harness.storage.message_exists("mid.7").await.unwrap());
        let tenant = harness.tenant("acct-1").await.unwrap();
        assert_eq!(tenant.messaging_channel_id, None);
    }

    #[tokio::test]
    async fn redelivery_still_backfills_channel_id() {
        let (harness, processor) = processor().await;
        processor
            .process(&delivery("100", "200", "100", "mid.8", false))
            .await
            .unwrap();

        let outcome = processor
            .process(&delivery("178", "200", "100", "mid.8", false))
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome { skipped: 1, ..Default::default() });
        let tenant = harness.tenant("acct-1").await.unwrap();
        assert_eq!(tenant.messaging_channel_id.as_deref(), Some("178"));
    }

    #[tokio::test]
    async fn unknown_business_is_unrouted() {
        let (_harness, processor) = processor().await;
        let outcome = processor
            .process(&delivery("555", "1", "2", "mid.5", false))
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome { unrouted: 1, ..Default::default() });
    }

    #[tokio::test]
    async fn self_conversation_counts_as_error() {
        let (harness, processor) = processor().await;
        let outcome = processor
            .process(&delivery("100", "100", "100", "mid.6", false))
            .await
            .unwrap();
        assert_eq!(outcome.errors, 1);
        assert!(!harness.storage.message_exists("mid.6").await.unwrap());
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let (_harness, processor) = processor().await;
        let err = processor.process(b"{\"entry\": 3}").await.unwrap_err();
        assert!(matches!(err, BridgeError::MalformedPayload { .. }));
    }
}
