// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graph API wire types.
//!
//! Every field is optional on the wire. Conversion into the domain types in
//! `instabridge_core` is where required fields are enforced: an item missing
//! its ID converts to `None` and the caller drops it.

use instabridge_core::{
    Attachment, Conversation, OwnProfile, ProviderMessage, SendReceipt, UserProfile,
};
use serde::{Deserialize, Deserializer, Serialize};

/// A Graph API list envelope (`{"data": [...], "paging": {...}}`).
#[derive(Debug, Clone, Deserialize)]
pub struct GraphList<T> {
    pub data: Vec<T>,
}

/// Participant reference inside `participants`, `from`, or `to`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawParticipant {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawConversation {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub participants: Option<GraphList<RawParticipant>>,
    #[serde(default)]
    pub updated_time: Option<String>,
    #[serde(default)]
    pub messages: Option<GraphList<RawMessage>>,
}

/// Body of `GET /{conversation-id}?fields=messages...`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConversationMessages {
    #[serde(default)]
    pub messages: Option<GraphList<RawMessage>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub from: Option<RawParticipant>,
    #[serde(default)]
    pub to: Option<GraphList<RawParticipant>>,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub attachments: Option<GraphList<RawAttachment>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAttachment {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub image_data: Option<RawMediaData>,
    #[serde(default)]
    pub video_data: Option<RawMediaData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMediaData {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUserProfile {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, alias = "profile_picture_url")]
    pub profile_pic: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawOwnProfile {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// Request body of `POST /me/messages`.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest<'a> {
    pub recipient: Recipient<'a>,
    pub message: TextMessage<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recipient<'a> {
    pub id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextMessage<'a> {
    pub text: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSendResponse {
    #[serde(default, deserialize_with = "string_or_number")]
    pub recipient_id: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
}

/// Graph API error envelope (`{"error": {"message": ..., "code": ...}}`).
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
}

/// Instagram sometimes encodes numeric IDs as JSON numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    }))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl RawConversation {
    /// Participants without an ID are dropped; a conversation without one is rejected.
    pub fn into_domain(self) -> Option<Conversation> {
        let id = non_empty(self.id)?;
        let participants = self
            .participants
            .map(|list| {
                list.data
                    .into_iter()
                    .filter_map(|p| non_empty(p.id))
                    .collect()
            })
            .unwrap_or_default();
        let messages = self
            .messages
            .map(|list| {
                list.data
                    .into_iter()
                    .filter_map(RawMessage::into_domain)
                    .collect()
            })
            .unwrap_or_default();
        Some(Conversation {
            id,
            participants,
            updated_time: self.updated_time,
            messages,
        })
    }
}

impl RawMessage {
    pub fn into_domain(self) -> Option<ProviderMessage> {
        let id = non_empty(self.id)?;
        let to_ids = self
            .to
            .map(|list| list.data.into_iter().filter_map(|p| non_empty(p.id)).collect())
            .unwrap_or_default();
        let attachments = self
            .attachments
            .map(|list| list.data.into_iter().map(RawAttachment::into_domain).collect())
            .unwrap_or_default();
        Some(ProviderMessage {
            id,
            text: self.message,
            from_id: self.from.and_then(|p| non_empty(p.id)),
            to_ids,
            created_time: self.created_time,
            attachments,
        })
    }
}

impl RawAttachment {
    pub fn into_domain(self) -> Attachment {
        let url = self
            .file_url
            .or_else(|| self.image_data.and_then(|d| d.url))
            .or_else(|| self.video_data.and_then(|d| d.url));
        Attachment {
            mime_type: self.mime_type,
            url,
        }
    }
}

impl RawUserProfile {
    pub fn into_domain(self) -> Option<UserProfile> {
        Some(UserProfile {
            id: non_empty(self.id)?,
            username: self.username,
            profile_picture_url: self.profile_pic,
        })
    }
}

impl RawOwnProfile {
    pub fn into_domain(self) -> Option<OwnProfile> {
        Some(OwnProfile {
            id: non_empty(self.id)?,
            user_id: non_empty(self.user_id),
            username: self.username,
        })
    }
}

impl RawSendResponse {
    pub fn into_domain(self) -> Option<SendReceipt> {
        Some(SendReceipt {
            recipient_id: non_empty(self.recipient_id)?,
            message_id: non_empty(self.message_id)?,
        })
    }
}
