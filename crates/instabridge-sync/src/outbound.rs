// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound DMs from the business to a customer.

use std::sync::Arc;

use chrono::Utc;
use instabridge_core::{
    BridgeError, DeliveryStatus, Direction, InstagramApi, Message, StorageAdapter, TenantAccount,
};
use tracing::{debug, info};

use crate::identity::AccountIdentity;

pub struct OutboundService {
    storage: Arc<dyn StorageAdapter>,
}

impl OutboundService {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Sends `text` to `recipient_id` and records it.
    ///
    /// A reused `idempotency_key` returns the message stored under it
    /// without sending again. When the webhook echo of the send is stored
    /// first, the echo's row is returned.
    pub async fn send_text(
        &self,
        account: &TenantAccount,
        api: &dyn InstagramApi,
        recipient_id: &str,
        text: &str,
        idempotency_key: Option<&str>,
    ) -> Result<Message, BridgeError> {
        if let Some(key) = idempotency_key
            && let Some(existing) = self.storage.get_message_by_idempotency_key(key).await?
        {
            debug!(idempotency_key = key, message_id = %existing.id, "send already recorded");
            return Ok(existing);
        }

        let identity = AccountIdentity::from_account(account)?;
        let receipt = api
            .send_text_message(recipient_id, text)
            .await?
            .ok_or_else(|| BridgeError::Api {
                message: "send rejected".into(),
                source: None,
            })?;

        let message = Message {
            id: receipt.message_id.clone(),
            account_id: account.id.clone(),
            sender_id: identity.effective_channel_id().to_string(),
            recipient_id: recipient_id.to_string(),
            message_text: Some(text.to_string()),
            attachments: None,
            timestamp: Utc::now(),
            direction: Direction::Outbound,
            delivery_status: DeliveryStatus::Sent,
            idempotency_key: idempotency_key.map(str::to_string),
        };

        match self.storage.insert_message(&message).await {
            Ok(()) => {
                info!(account_id = %account.id, message_id = %message.id, "message sent");
                Ok(message)
            }
            Err(e) if e.is_duplicate() => {
                debug!(message_id = %message.id, "send already stored by webhook echo");
                self.storage
                    .get_message(&message.id)
                    .await?
                    .ok_or_else(|| BridgeError::NotFound {
                        entity: "message".into(),
                        id: message.id.clone(),
                    })
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use instabridge_test_utils::{MockInstagramApi, TestHarness};

    async fn setup(channel: Option<&str>) -> (TestHarness, OutboundService, TenantAccount) {
        let harness = TestHarness::builder()
            .with_tenant("acct-1", "100", channel)
            .build()
            .await
            .unwrap();
        let service = OutboundService::new(harness.storage.clone());
        let tenant = harness.tenant("acct-1").await.unwrap();
        (harness, service, tenant)
    }

    #[tokio::test]
    async fn send_records_outbound_from_channel_id() {
        let (harness, service, tenant) = setup(Some("178")).await;
        let api = MockInstagramApi::new();

        let sent = service
            .send_text(&tenant, &api, "200", "your order shipped", None)
            .await
            .unwrap();

        assert_eq!(sent.id, "mock-mid-1");
        assert_eq!(sent.sender_id, "178");
        assert_eq!(sent.direction, Direction::Outbound);
        assert_eq!(
            api.sent_messages().await,
            vec![("200".to_string(), "your order shipped".to_string())]
        );
        assert!(harness.storage.message_exists("mock-mid-1").await.unwrap());
    }

    #[tokio::test]
    async fn idempotency_key_prevents_double_send() {
        let (_harness, service, tenant) = setup(None).await;
        let api = MockInstagramApi::new();

        let first = service
            .send_text(&tenant, &api, "200", "hi", Some("order-42"))
            .await
            .unwrap();
        let second = service
            .send_text(&tenant, &api, "200", "hi", Some("order-42"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(api.sent_messages().await.len(), 1);
    }

    #[tokio::test]
    async fn echo_stored_first_is_returned() {
        let (harness, service, tenant) = setup(None).await;
        let echo = Message {
            id: "mock-mid-1".into(),
            account_id: "acct-1".into(),
            sender_id: "100".into(),
            recipient_id: "200".into(),
            message_text: Some("hi".into()),
            attachments: None,
            timestamp: Utc::now(),
            direction: Direction::Outbound,
            delivery_status: DeliveryStatus::Sent,
            idempotency_key: None,
        };
        harness.storage.insert_message(&echo).await.unwrap();

        let sent = service
            .send_text(&tenant, &MockInstagramApi::new(), "200", "hi", None)
            .await
            .unwrap();
        assert_eq!(sent.id, echo.id);
        assert_eq!(sent.sender_id, "100");
        assert_eq!(
            harness.storage.list_messages("acct-1", None).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn rejected_send_is_an_api_error() {
        let (harness, service, tenant) = setup(None).await;
        let api = MockInstagramApi::new().rejecting_sends();

        let err = service
            .send_text(&tenant, &api, "200", "hi", None)
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::Api { .. }));
        assert!(harness.storage.list_messages("acct-1", None).await.unwrap().is_empty());
    }
}
