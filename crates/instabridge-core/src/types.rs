// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Instabridge workspace.
//!
//! Provider shapes (`Conversation`, `ProviderMessage`, `UserProfile`) are
//! produced by the Instagram client after validation; persisted shapes
//! (`TenantAccount`, `Message`) are owned by the storage backend.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Direction of a message relative to the tenant's business account.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Sent by a customer to the business.
    Inbound,
    /// Sent by the business to a customer.
    Outbound,
}

/// How a stored message arrived.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Live arrival through a webhook or an outbound send.
    Sent,
    /// Pulled from conversation history by the sync service.
    Synced,
}

/// A tenant: one Instagram professional account onboarded into the bridge.
#[derive(Debug, Clone)]
pub struct TenantAccount {
    /// Internal primary key.
    pub id: String,
    /// ID returned by the OAuth profile fetch; used for outbound Graph API calls.
    pub instagram_account_id: Option<String>,
    /// ID observed on webhook and conversation traffic, backfilled opportunistically.
    pub messaging_channel_id: Option<String>,
    pub username: Option<String>,
    /// Long-lived OAuth access token.
    pub access_token: SecretString,
    pub created_at: String,
    pub updated_at: String,
}

/// Conversation metadata as listed by the provider. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: String,
    /// Participant IDs in provider order. Empty when the field was absent.
    pub participants: Vec<String>,
    /// Raw provider timestamp; parsed tolerantly by the sync service.
    pub updated_time: Option<String>,
    /// Nested messages, populated only when listed with `include_messages`.
    pub messages: Vec<ProviderMessage>,
}

impl Conversation {
    /// Metadata-only conversation, as returned by the cheap listing call.
    pub fn new(id: impl Into<String>, participants: Vec<String>, updated_time: Option<String>) -> Self {
        Self {
            id: id.into(),
            participants,
            updated_time,
            messages: Vec::new(),
        }
    }
}

/// A media attachment reference on a provider message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A message as returned by the provider's conversation endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMessage {
    pub id: String,
    pub text: Option<String>,
    /// Sender ID. `None` when the provider omitted the `from` object.
    pub from_id: Option<String>,
    pub to_ids: Vec<String>,
    pub created_time: Option<String>,
    pub attachments: Vec<Attachment>,
}

/// Public profile of an Instagram user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: Option<String>,
    pub profile_picture_url: Option<String>,
}

/// Profile of the authenticated business account, fetched during linking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnProfile {
    /// Profile ID used for Graph API calls.
    pub id: String,
    /// Professional account ID, which is what webhooks route on.
    pub user_id: Option<String>,
    pub username: Option<String>,
}

/// Provider acknowledgement of an outbound send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    pub recipient_id: String,
    pub message_id: String,
}

/// A persisted message. The provider ID is the deduplication key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub account_id: String,
    /// Normalized Instagram-side sender ID.
    pub sender_id: String,
    /// Normalized Instagram-side recipient ID.
    pub recipient_id: String,
    pub message_text: Option<String>,
    /// JSON-encoded attachment list, if the message carried any.
    pub attachments: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub delivery_status: DeliveryStatus,
    pub idempotency_key: Option<String>,
}

/// Stored conversation grouped by the customer side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub customer_id: String,
    pub last_message_at: DateTime<Utc>,
    pub last_message_text: Option<String>,
    pub message_count: i64,
}

/// All storage mutations produced by one sync run.
///
/// Committed as a single transaction: the identity correction and the
/// message inserts either land together or not at all.
#[derive(Debug, Clone, Default)]
pub struct SyncBatch {
    pub account_id: String,
    /// Corrected `messaging_channel_id` observed during the run.
    pub messaging_channel_id: Option<String>,
    pub messages: Vec<Message>,
}

impl SyncBatch {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            messaging_channel_id: None,
            messages: Vec::new(),
        }
    }

    /// Returns true if a message with this ID is already staged.
    pub fn contains(&self, message_id: &str) -> bool {
        self.messages.iter().any(|m| m.id == message_id)
    }

    pub fn is_empty(&self) -> bool {
        self.messaging_channel_id.is_none() && self.messages.is_empty()
    }
}

/// Result of committing a [`SyncBatch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Messages written.
    pub inserted: usize,
    /// Messages rejected by the primary key (already stored by a concurrent writer).
    pub duplicates: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn direction_round_trips_through_strings() {
        assert_eq!(Direction::Inbound.to_string(), "inbound");
        assert_eq!(Direction::Outbound.to_string(), "outbound");
        assert_eq!(Direction::from_str("outbound").unwrap(), Direction::Outbound);
        assert!(Direction::from_str("sideways").is_err());
    }

    #[test]
    fn delivery_status_strings() {
        assert_eq!(DeliveryStatus::Sent.to_string(), "sent");
        assert_eq!(DeliveryStatus::Synced.to_string(), "synced");
        let json = serde_json::to_string(&DeliveryStatus::Synced).unwrap();
        assert_eq!(json, "\"synced\"");
    }

    #[test]
    fn sync_batch_tracks_staged_ids() {
        let mut batch = SyncBatch::new("acct-1");
        assert!(batch.is_empty());
        batch.messages.push(Message {
            id: "m1".into(),
            account_id: "acct-1".into(),
            sender_id: "200".into(),
            recipient_id: "100".into(),
            message_text: Some("hi".into()),
            attachments: None,
            timestamp: Utc::now(),
            direction: Direction::Inbound,
            delivery_status: DeliveryStatus::Synced,
            idempotency_key: None,
        });
        assert!(batch.contains("m1"));
        assert!(!batch.contains("m2"));
        assert!(!batch.is_empty());
    }
}
