// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Instagram webhook payload parsing.
//!
//! Signature verification happens upstream; this module only turns a
//! delivered body into message events. Reads, reactions, postbacks and
//! deletions are ignored.

use instabridge_core::{Attachment, BridgeError};
use serde::Deserialize;
use tracing::{debug, warn};

/// One message delivered through the webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookMessageEvent {
    /// `entry.id`: the business account the delivery was routed to.
    pub channel_id: String,
    pub sender_id: String,
    pub recipient_id: String,
    /// Provider message ID (`mid`), shared with the conversation API.
    pub message_id: String,
    pub text: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: Option<i64>,
    /// True for copies of messages the business itself sent.
    pub is_echo: bool,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    object: String,
    entry: Vec<WebhookEntry>,
}

#[derive(Debug, Deserialize)]
struct WebhookEntry {
    id: String,
    #[serde(default)]
    messaging: Vec<MessagingEvent>,
}

#[derive(Debug, Deserialize)]
struct MessagingEvent {
    #[serde(default)]
    sender: Option<IdRef>,
    #[serde(default)]
    recipient: Option<IdRef>,
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    message: Option<MessageBody>,
}

#[derive(Debug, Deserialize)]
struct IdRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    mid: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    is_echo: bool,
    #[serde(default)]
    is_deleted: bool,
    #[serde(default)]
    attachments: Vec<WebhookAttachment>,
}

#[derive(Debug, Deserialize)]
struct WebhookAttachment {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    payload: Option<AttachmentPayload>,
}

#[derive(Debug, Deserialize)]
struct AttachmentPayload {
    #[serde(default)]
    url: Option<String>,
}

/// Parse a webhook body into message events, in delivery order.
///
/// A body that is not the expected `object`/`entry` envelope is a
/// [`BridgeError::MalformedPayload`]. Individual events missing a sender,
/// recipient, or message ID are dropped with a warning.
pub fn parse_webhook_payload(body: &[u8]) -> Result<Vec<WebhookMessageEvent>, BridgeError> {
    let payload: WebhookPayload =
        serde_json::from_slice(body).map_err(|e| BridgeError::MalformedPayload {
            context: "webhook".into(),
            message: e.to_string(),
        })?;

    if payload.object != "instagram" {
        warn!(object = %payload.object, "ignoring webhook for non-instagram object");
        return Ok(Vec::new());
    }

    let mut events = Vec::new();
    for entry in payload.entry {
        for event in entry.messaging {
            let Some(message) = event.message else {
                debug!(channel_id = %entry.id, "ignoring non-message webhook event");
                continue;
            };
            if message.is_deleted {
                debug!(channel_id = %entry.id, "ignoring message deletion");
                continue;
            }
            let (Some(sender), Some(recipient), Some(mid)) =
                (event.sender, event.recipient, message.mid)
            else {
                warn!(channel_id = %entry.id, "dropping webhook message without sender, recipient, or mid");
                continue;
            };

            events.push(WebhookMessageEvent {
                channel_id: entry.id.clone(),
                sender_id: sender.id,
                recipient_id: recipient.id,
                message_id: mid,
                text: message.text,
                timestamp_ms: event.timestamp,
                is_echo: message.is_echo,
                attachments: message
                    .attachments
                    .into_iter()
                    .map(|a| Attachment {
                        mime_type: a.kind,
                        url: a.payload.and_then(|p| p.url),
                    })
                    .collect(),
            });
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(value: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn parses_inbound_and_echo_messages() {
        let payload = body(serde_json::json!({
            "object": "instagram",
            "entry": [{
                "id": "999",
                "time": 1772366400,
                "messaging": [
                    {
                        "sender": {"id": "200"},
                        "recipient": {"id": "999"},
                        "timestamp": 1772366400000i64,
                        "message": {"mid": "m1", "text": "hello"}
                    },
                    {
                        "sender": {"id": "999"},
                        "recipient": {"id": "200"},
                        "timestamp": 1772366460000i64,
                        "message": {
                            "mid": "m2",
                            "is_echo": true,
                            "attachments": [{"type": "image", "payload": {"url": "https://cdn.example.test/i.jpg"}}]
                        }
                    }
                ]
            }]
        }));

        let events = parse_webhook_payload(&payload).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].channel_id, "999");
        assert_eq!(events[0].sender_id, "200");
        assert_eq!(events[0].text.as_deref(), Some("hello"));
        assert!(!events[0].is_echo);
        assert!(events[1].is_echo);
        assert_eq!(events[1].attachments[0].mime_type.as_deref(), Some("image"));
    }

    #[test]
    fn non_message_events_are_ignored() {
        let payload = body(serde_json::json!({
            "object": "instagram",
            "entry": [{
                "id": "999",
                "messaging": [
                    {"sender": {"id": "200"}, "recipient": {"id": "999"}, "read": {"mid": "m1"}},
                    {"sender": {"id": "200"}, "recipient": {"id": "999"}, "message": {"mid": "m1", "is_deleted": true}},
                    {"recipient": {"id": "999"}, "message": {"mid": "m3", "text": "no sender"}}
                ]
            }]
        }));
        assert!(parse_webhook_payload(&payload).unwrap().is_empty());
    }

    #[test]
    fn other_objects_are_ignored() {
        let payload = body(serde_json::json!({"object": "page", "entry": []}));
        assert!(parse_webhook_payload(&payload).unwrap().is_empty());
    }

    #[test]
    fn wrong_shape_is_malformed() {
        let err = parse_webhook_payload(b"{\"entries\": []}").unwrap_err();
        assert!(matches!(err, BridgeError::MalformedPayload { .. }));
        assert!(parse_webhook_payload(b"not json").is_err());
    }
}
