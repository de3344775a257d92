// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Which participant of a conversation is the customer.
//!
//! Pure decision functions; the sync service does the logging and metrics
//! around them.

use instabridge_core::{Conversation, ProviderMessage};

use crate::identity::AccountIdentity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionConfidence {
    /// One participant is a known business ID.
    Matched,
    /// No participant matched; Instagram lists the business first, so index 0
    /// was taken as the business.
    AssumedFirstParticipant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantResolution {
    Resolved {
        business_id: String,
        customer_id: String,
        confidence: ResolutionConfidence,
    },
    /// Both participants are business IDs.
    Ambiguous,
    /// Not exactly two distinct participants; resolve from messages instead.
    Unresolvable,
}

/// Resolves the customer of a two-party conversation.
pub fn resolve_participants(
    identity: &AccountIdentity,
    conversation: &Conversation,
) -> ParticipantResolution {
    let [first, second] = conversation.participants.as_slice() else {
        return ParticipantResolution::Unresolvable;
    };
    if first == second {
        return ParticipantResolution::Unresolvable;
    }

    let resolved = |business: &str, customer: &str, confidence| ParticipantResolution::Resolved {
        business_id: business.to_string(),
        customer_id: customer.to_string(),
        confidence,
    };

    match (identity.is_business_id(first), identity.is_business_id(second)) {
        (true, false) => resolved(first, second, ResolutionConfidence::Matched),
        (false, true) => resolved(second, first, ResolutionConfidence::Matched),
        (false, false) => resolved(first, second, ResolutionConfidence::AssumedFirstParticipant),
        (true, true) => ParticipantResolution::Ambiguous,
    }
}

/// First non-business sender among `messages`, then first non-business recipient.
pub fn customer_from_messages(
    identity: &AccountIdentity,
    messages: &[ProviderMessage],
) -> Option<String> {
    let not_business = |id: &&String| !identity.is_business_id(id);

    messages
        .iter()
        .filter_map(|m| m.from_id.as_ref())
        .find(not_business)
        .or_else(|| {
            messages
                .iter()
                .flat_map(|m| m.to_ids.iter())
                .find(not_business)
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(participants: &[&str]) -> Conversation {
        Conversation::new(
            "c1",
            participants.iter().map(|p| p.to_string()).collect(),
            None,
        )
    }

    fn message(id: &str, from: Option<&str>, to: &[&str]) -> ProviderMessage {
        ProviderMessage {
            id: id.to_string(),
            text: None,
            from_id: from.map(str::to_string),
            to_ids: to.iter().map(|t| t.to_string()).collect(),
            created_time: None,
            attachments: Vec::new(),
        }
    }

    #[test]
    fn matched_business_in_either_position() {
        let identity = AccountIdentity::new("acct-1", "100", None);
        let expected = ParticipantResolution::Resolved {
            business_id: "100".into(),
            customer_id: "200".into(),
            confidence: ResolutionConfidence::Matched,
        };
        assert_eq!(resolve_participants(&identity, &conversation(&["100", "200"])), expected);
        assert_eq!(resolve_participants(&identity, &conversation(&["200", "100"])), expected);
    }

    #[test]
    fn unknown_pair_assumes_first_participant_is_business() {
        let identity = AccountIdentity::new("acct-1", "100", None);
        assert_eq!(
            resolve_participants(&identity, &conversation(&["A", "B"])),
            ParticipantResolution::Resolved {
                business_id: "A".into(),
                customer_id: "B".into(),
                confidence: ResolutionConfidence::AssumedFirstParticipant,
            }
        );
    }

    #[test]
    fn both_business_is_ambiguous() {
        let identity = AccountIdentity::new("acct-1", "100", Some("999".into()));
        assert_eq!(
            resolve_participants(&identity, &conversation(&["100", "999"])),
            ParticipantResolution::Ambiguous
        );
    }

    #[test]
    fn wrong_participant_count_is_unresolvable() {
        let identity = AccountIdentity::new("acct-1", "100", None);
        for participants in [&[][..], &["100"][..], &["100", "200", "300"][..], &["200", "200"][..]] {
            assert_eq!(
                resolve_participants(&identity, &conversation(participants)),
                ParticipantResolution::Unresolvable
            );
        }
    }

    #[test]
    fn customer_from_first_non_business_sender() {
        let identity = AccountIdentity::new("acct-1", "100", None);
        let messages = vec![
            message("m3", Some("100"), &["200"]),
            message("m2", None, &[]),
            message("m1", Some("300"), &["100"]),
        ];
        assert_eq!(customer_from_messages(&identity, &messages), Some("300".into()));
    }

    #[test]
    fn customer_from_recipients_when_business_only_sent() {
        let identity = AccountIdentity::new("acct-1", "100", None);
        let messages = vec![message("m1", Some("100"), &["200"])];
        assert_eq!(customer_from_messages(&identity, &messages), Some("200".into()));
        assert_eq!(customer_from_messages(&identity, &[]), None);
    }
}
