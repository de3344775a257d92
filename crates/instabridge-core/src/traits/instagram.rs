// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Instagram Graph API adapter trait.

use async_trait::async_trait;

use crate::error::BridgeError;
use crate::types::{Conversation, OwnProfile, ProviderMessage, SendReceipt, UserProfile};

/// Access to one tenant's Instagram messaging data.
///
/// Implementations authenticate with the tenant's own OAuth token. The
/// return contract separates two kinds of failure:
///
/// - `Ok(None)`: the provider answered with an error status (4xx/5xx). The
///   implementation has already logged it; callers degrade gracefully.
/// - `Err(_)`: the request never completed (network failure) or the body did
///   not have the expected shape ([`BridgeError::MalformedPayload`]).
#[async_trait]
pub trait InstagramApi: Send + Sync {
    /// Lists conversations, optionally with nested message bodies.
    async fn get_conversations(
        &self,
        limit: usize,
        include_messages: bool,
    ) -> Result<Option<Vec<Conversation>>, BridgeError>;

    /// Fetches up to `limit` messages of one conversation, newest first.
    async fn get_conversation_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Option<Vec<ProviderMessage>>, BridgeError>;

    /// Fetches the public profile of another user.
    async fn get_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>, BridgeError>;

    /// Fetches the profile of the account the token belongs to.
    async fn get_own_profile(&self) -> Result<Option<OwnProfile>, BridgeError>;

    /// Sends a text DM to `recipient_id`.
    async fn send_text_message(
        &self,
        recipient_id: &str,
        text: &str,
    ) -> Result<Option<SendReceipt>, BridgeError>;
}
