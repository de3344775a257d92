// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Instagram Graph API.
//!
//! Provides [`InstagramClient`], which authenticates with one tenant's
//! access token and maps Graph API responses onto the [`InstagramApi`]
//! contract: rejected requests are logged and surface as `Ok(None)`,
//! transport failures and bad payload shapes surface as errors.

use std::time::Duration;

use async_trait::async_trait;
use instabridge_config::model::InstagramConfig;
use instabridge_core::{
    BridgeError, Conversation, InstagramApi, OwnProfile, ProviderMessage, SendReceipt,
    UserProfile,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::types::{
    ApiErrorResponse, GraphList, RawConversation, RawConversationMessages, RawOwnProfile,
    RawSendResponse, RawUserProfile, Recipient, SendMessageRequest, TextMessage,
};

const CONVERSATION_FIELDS: &str = "id,participants,updated_time";
const MESSAGE_FIELDS: &str = "id,message,from,to,created_time,attachments";

/// Graph API client bound to one tenant's access token.
#[derive(Debug, Clone)]
pub struct InstagramClient {
    client: reqwest::Client,
    /// Graph host plus API version, e.g. `https://graph.instagram.com/v21.0`.
    base_url: Url,
}

impl InstagramClient {
    /// Creates a client for the account that owns `access_token`.
    pub fn new(access_token: &SecretString, config: &InstagramConfig) -> Result<Self, BridgeError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", access_token.expose_secret()))
            .map_err(|e| BridgeError::Config(format!("invalid access token header value: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| BridgeError::Api {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let base_url = Url::parse(config.graph_base_url.trim_end_matches('/'))
            .map_err(|e| BridgeError::Config(format!("invalid graph_base_url: {e}")))?;
        let mut client = Self { client, base_url };
        client.base_url = client.endpoint(&[config.api_version.trim_matches('/')])?;

        Ok(client)
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BridgeError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                BridgeError::Config(format!("graph_base_url {} cannot have a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends a request and decodes a successful body as `T`.
    ///
    /// Non-success statuses are logged and returned as `Ok(None)`.
    async fn execute<T: DeserializeOwned>(
        &self,
        context: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Option<T>, BridgeError> {
        let response = request.send().await.map_err(|e| BridgeError::Api {
            message: format!("{context} request failed: {e}"),
            source: Some(Box::new(e)),
        })?;

        let status = response.status();
        debug!(context, status = %status, "graph api response received");

        let body = response.text().await.map_err(|e| BridgeError::Api {
            message: format!("failed to read {context} response body: {e}"),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            let detail = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => api_err.error.message,
                Err(_) => body,
            };
            warn!(context, status = %status, error = %detail, "graph api request rejected");
            return Ok(None);
        }

        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| BridgeError::MalformedPayload {
                context: context.to_string(),
                message: e.to_string(),
            })
    }
}

fn missing_field(context: &str, field: &str) -> BridgeError {
    BridgeError::MalformedPayload {
        context: context.to_string(),
        message: format!("missing required field `{field}`"),
    }
}

#[async_trait]
impl InstagramApi for InstagramClient {
    async fn get_conversations(
        &self,
        limit: usize,
        include_messages: bool,
    ) -> Result<Option<Vec<Conversation>>, BridgeError> {
        let fields = if include_messages {
            format!("{CONVERSATION_FIELDS},messages{{{MESSAGE_FIELDS}}}")
        } else {
            CONVERSATION_FIELDS.to_string()
        };
        let limit = limit.to_string();
        let request = self.client.get(self.endpoint(&["me", "conversations"])?).query(&[
            ("platform", "instagram"),
            ("fields", fields.as_str()),
            ("limit", limit.as_str()),
        ]);

        let Some(list) = self
            .execute::<GraphList<RawConversation>>("conversations", request)
            .await?
        else {
            return Ok(None);
        };

        let listed = list.data.len();
        let conversations: Vec<Conversation> = list
            .data
            .into_iter()
            .filter_map(RawConversation::into_domain)
            .collect();
        if conversations.len() < listed {
            warn!(
                dropped = listed - conversations.len(),
                "dropped conversations without an id"
            );
        }
        debug!(count = conversations.len(), include_messages, "conversations listed");
        Ok(Some(conversations))
    }

    async fn get_conversation_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Option<Vec<ProviderMessage>>, BridgeError> {
        let fields = format!("messages.limit({limit}){{{MESSAGE_FIELDS}}}");
        let request = self
            .client
            .get(self.endpoint(&[conversation_id])?)
            .query(&[("fields", fields.as_str())]);

        let Some(body) = self
            .execute::<RawConversationMessages>("conversation messages", request)
            .await?
        else {
            return Ok(None);
        };

        let raw = body.messages.map(|list| list.data).unwrap_or_default();
        let listed = raw.len();
        let messages: Vec<ProviderMessage> =
            raw.into_iter().filter_map(|m| m.into_domain()).collect();
        if messages.len() < listed {
            warn!(
                conversation_id,
                dropped = listed - messages.len(),
                "dropped messages without an id"
            );
        }
        Ok(Some(messages))
    }

    async fn get_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>, BridgeError> {
        let request = self
            .client
            .get(self.endpoint(&[user_id])?)
            .query(&[("fields", "id,username,profile_pic")]);
        match self
            .execute::<RawUserProfile>("user profile", request)
            .await?
        {
            Some(raw) => raw
                .into_domain()
                .map(Some)
                .ok_or_else(|| missing_field("user profile", "id")),
            None => Ok(None),
        }
    }

    async fn get_own_profile(&self) -> Result<Option<OwnProfile>, BridgeError> {
        let request = self
            .client
            .get(self.endpoint(&["me"])?)
            .query(&[("fields", "id,user_id,username")]);
        match self
            .execute::<RawOwnProfile>("own profile", request)
            .await?
        {
            Some(raw) => raw
                .into_domain()
                .map(Some)
                .ok_or_else(|| missing_field("own profile", "id")),
            None => Ok(None),
        }
    }

    async fn send_text_message(
        &self,
        recipient_id: &str,
        text: &str,
    ) -> Result<Option<SendReceipt>, BridgeError> {
        let body = SendMessageRequest {
            recipient: Recipient { id: recipient_id },
            message: TextMessage { text },
        };
        let request = self
            .client
            .post(self.endpoint(&["me", "messages"])?)
            .json(&body);
        match self.execute::<RawSendResponse>("send message", request).await? {
            Some(raw) => raw
                .into_domain()
                .map(Some)
                .ok_or_else(|| missing_field("send message", "message_id")),
            None => Ok(None),
        }
    }
}
