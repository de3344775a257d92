// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted Instagram API for deterministic testing.
//!
//! `MockInstagramApi` implements `InstagramApi` without any network access.
//! Conversation listings are popped from a FIFO queue first and then fall
//! back to a fixed default; every other endpoint answers from maps keyed
//! by ID.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use instabridge_core::{
    BridgeError, Conversation, InstagramApi, OwnProfile, ProviderMessage, SendReceipt,
    UserProfile,
};

type ConversationsResponse = Result<Option<Vec<Conversation>>, BridgeError>;

/// Instagram API double with pre-configured responses.
///
/// Unknown conversations, profiles, and a missing own profile all answer
/// `Ok(None)`, the same way the real client reports a rejected request.
#[derive(Default)]
pub struct MockInstagramApi {
    queued_conversations: Mutex<VecDeque<ConversationsResponse>>,
    default_conversations: Mutex<Option<Vec<Conversation>>>,
    messages: Mutex<HashMap<String, Vec<ProviderMessage>>>,
    profiles: Mutex<HashMap<String, UserProfile>>,
    own_profile: Mutex<Option<OwnProfile>>,
    sent: Mutex<Vec<(String, String)>>,
    reject_sends: bool,
    message_delay: Option<Duration>,
    conversation_calls: AtomicUsize,
    message_calls: AtomicUsize,
    profile_calls: AtomicUsize,
}

impl MockInstagramApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listing returned whenever the queue is empty.
    pub fn with_conversations(mut self, conversations: Vec<Conversation>) -> Self {
        *self.default_conversations.get_mut() = Some(conversations);
        self
    }

    /// Queue a one-shot listing response, used before the default.
    pub fn with_conversations_response(mut self, response: ConversationsResponse) -> Self {
        self.queued_conversations.get_mut().push_back(response);
        self
    }

    pub fn with_messages(mut self, conversation_id: &str, messages: Vec<ProviderMessage>) -> Self {
        self.messages
            .get_mut()
            .insert(conversation_id.to_string(), messages);
        self
    }

    pub fn with_profile(mut self, profile: UserProfile) -> Self {
        self.profiles.get_mut().insert(profile.id.clone(), profile);
        self
    }

    pub fn with_own_profile(mut self, profile: OwnProfile) -> Self {
        *self.own_profile.get_mut() = Some(profile);
        self
    }

    /// Make `send_text_message` answer `Ok(None)`.
    pub fn rejecting_sends(mut self) -> Self {
        self.reject_sends = true;
        self
    }

    /// Delay every conversation-messages call (for timeout tests).
    pub fn with_message_delay(mut self, delay: Duration) -> Self {
        self.message_delay = Some(delay);
        self
    }

    /// Replace the messages of a conversation after construction.
    pub async fn set_messages(&self, conversation_id: &str, messages: Vec<ProviderMessage>) {
        self.messages
            .lock()
            .await
            .insert(conversation_id.to_string(), messages);
    }

    pub fn conversation_calls(&self) -> usize {
        self.conversation_calls.load(Ordering::SeqCst)
    }

    pub fn message_calls(&self) -> usize {
        self.message_calls.load(Ordering::SeqCst)
    }

    pub fn profile_calls(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }

    /// `(recipient_id, text)` of every accepted send, in order.
    pub async fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl InstagramApi for MockInstagramApi {
    async fn get_conversations(
        &self,
        limit: usize,
        _include_messages: bool,
    ) -> Result<Option<Vec<Conversation>>, BridgeError> {
        self.conversation_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(response) = self.queued_conversations.lock().await.pop_front() {
            return response;
        }
        Ok(self
            .default_conversations
            .lock()
            .await
            .clone()
            .map(|list| list.into_iter().take(limit).collect()))
    }

    async fn get_conversation_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Option<Vec<ProviderMessage>>, BridgeError> {
        self.message_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.message_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .messages
            .lock()
            .await
            .get(conversation_id)
            .map(|messages| messages.iter().take(limit).cloned().collect()))
    }

    async fn get_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>, BridgeError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.profiles.lock().await.get(user_id).cloned())
    }

    async fn get_own_profile(&self) -> Result<Option<OwnProfile>, BridgeError> {
        Ok(self.own_profile.lock().await.clone())
    }

    async fn send_text_message(
        &self,
        recipient_id: &str,
        text: &str,
    ) -> Result<Option<SendReceipt>, BridgeError> {
        if self.reject_sends {
            return Ok(None);
        }
        let mut sent = self.sent.lock().await;
        sent.push((recipient_id.to_string(), text.to_string()));
        Ok(Some(SendReceipt {
            recipient_id: recipient_id.to_string(),
            message_id: format!("mock-mid-{}", sent.len()),
        }))
    }
}

/// Metadata-only conversation.
pub fn conversation(id: &str, participants: &[&str], updated_time: Option<&str>) -> Conversation {
    Conversation::new(
        id,
        participants.iter().map(|p| p.to_string()).collect(),
        updated_time.map(str::to_string),
    )
}

/// Text message from `from` (or with no `from` object when `None`).
pub fn provider_message(
    id: &str,
    from: Option<&str>,
    text: &str,
    created_time: Option<&str>,
) -> ProviderMessage {
    ProviderMessage {
        id: id.to_string(),
        text: Some(text.to_string()),
        from_id: from.map(str::to_string),
        to_ids: Vec::new(),
        created_time: created_time.map(str::to_string),
        attachments: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queued_responses_come_before_default() {
        let api = MockInstagramApi::new()
            .with_conversations_response(Ok(None))
            .with_conversations(vec![conversation("c1", &["100", "200"], None)]);

        assert!(api.get_conversations(50, false).await.unwrap().is_none());
        let listed = api.get_conversations(50, false).await.unwrap().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(api.conversation_calls(), 2);
    }

    #[tokio::test]
    async fn unknown_ids_answer_none() {
        let api = MockInstagramApi::new();
        assert!(api.get_conversations(50, false).await.unwrap().is_none());
        assert!(api.get_conversation_messages("c1", 25).await.unwrap().is_none());
        assert!(api.get_user_profile("200").await.unwrap().is_none());
        assert!(api.get_own_profile().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn messages_respect_limit_and_sends_are_recorded() {
        let api = MockInstagramApi::new().with_messages(
            "c1",
            vec![
                provider_message("m2", Some("100"), "b", None),
                provider_message("m1", Some("200"), "a", None),
            ],
        );
        let messages = api.get_conversation_messages("c1", 1).await.unwrap().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "m2");

        let receipt = api.send_text_message("200", "hi").await.unwrap().unwrap();
        assert_eq!(receipt.message_id, "mock-mid-1");
        assert_eq!(api.sent_messages().await, vec![("200".to_string(), "hi".to_string())]);
    }
}
