// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The business identity of one tenant.
//!
//! A tenant is known to Instagram under up to two IDs: the
//! `instagram_account_id` returned at OAuth time and the
//! `messaging_channel_id` seen on webhook and conversation traffic. Every
//! "is this the business?" question in the crate goes through
//! [`AccountIdentity`].

use std::collections::HashSet;

use instabridge_core::{BridgeError, Direction, TenantAccount};
use tracing::warn;

use crate::metrics;

/// How sure [`AccountIdentity::identify_other_party`] is about its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// Exactly one side was a business ID.
    High,
    /// Neither side was a business ID; the sender was assumed to be the customer.
    Low,
}

/// The customer side of a sender/recipient pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtherParty {
    pub customer_id: String,
    pub confidence: Confidence,
}

/// Immutable business identity derived from a tenant record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountIdentity {
    account_id: String,
    instagram_account_id: String,
    messaging_channel_id: Option<String>,
    business_ids: HashSet<String>,
}

impl AccountIdentity {
    /// Builds an identity from explicit IDs. Blank channel IDs are ignored.
    pub fn new(
        account_id: impl Into<String>,
        instagram_account_id: impl Into<String>,
        messaging_channel_id: Option<String>,
    ) -> Self {
        let instagram_account_id = instagram_account_id.into();
        let messaging_channel_id = messaging_channel_id.filter(|id| !id.trim().is_empty());

        let mut business_ids = HashSet::with_capacity(2);
        business_ids.insert(instagram_account_id.clone());
        if let Some(channel) = &messaging_channel_id {
            business_ids.insert(channel.clone());
        }

        Self {
            account_id: account_id.into(),
            instagram_account_id,
            messaging_channel_id,
            business_ids,
        }
    }

    /// Fails when the tenant has no `instagram_account_id`; linking guarantees one.
    pub fn from_account(account: &TenantAccount) -> Result<Self, BridgeError> {
        let instagram_account_id = account
            .instagram_account_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                BridgeError::Identity(format!(
                    "account {} has no instagram_account_id",
                    account.id
                ))
            })?;

        Ok(Self::new(
            account.id.clone(),
            instagram_account_id,
            account.messaging_channel_id.clone(),
        ))
    }

    /// Same tenant with a newly observed channel ID.
    pub fn with_messaging_channel_id(&self, channel_id: impl Into<String>) -> Self {
        Self::new(
            self.account_id.clone(),
            self.instagram_account_id.clone(),
            Some(channel_id.into()),
        )
    }

    /// Switches the channel ID while still recognizing every ID known so far.
    pub fn corrected_to(&self, channel_id: impl Into<String>) -> Self {
        let mut next = self.with_messaging_channel_id(channel_id);
        next.business_ids.extend(self.business_ids.iter().cloned());
        next
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn instagram_account_id(&self) -> &str {
        &self.instagram_account_id
    }

    pub fn messaging_channel_id(&self) -> Option<&str> {
        self.messaging_channel_id.as_deref()
    }

    /// Canonical business-side ID for storage, routing and grouping.
    ///
    /// Never used to authenticate Graph API calls; those always go through
    /// the tenant's own token.
    pub fn effective_channel_id(&self) -> &str {
        self.messaging_channel_id
            .as_deref()
            .unwrap_or(&self.instagram_account_id)
    }

    /// One or two IDs; always contains `instagram_account_id`.
    pub fn business_ids(&self) -> &HashSet<String> {
        &self.business_ids
    }

    pub fn is_business_id(&self, id: &str) -> bool {
        self.business_ids.contains(id)
    }

    /// Outbound iff the business sent it.
    pub fn detect_direction(&self, sender_id: &str) -> Direction {
        if self.is_business_id(sender_id) {
            Direction::Outbound
        } else {
            Direction::Inbound
        }
    }

    /// Returns whichever of the pair is not the business.
    ///
    /// When neither side is a business ID (usually a stale
    /// `messaging_channel_id`) the sender is taken as the customer with
    /// [`Confidence::Low`]. Both sides being business IDs is a
    /// self-conversation and is rejected.
    pub fn identify_other_party(
        &self,
        sender_id: &str,
        recipient_id: &str,
    ) -> Result<OtherParty, BridgeError> {
        match (self.is_business_id(sender_id), self.is_business_id(recipient_id)) {
            (true, false) => Ok(OtherParty {
                customer_id: recipient_id.to_string(),
                confidence: Confidence::High,
            }),
            (false, true) => Ok(OtherParty {
                customer_id: sender_id.to_string(),
                confidence: Confidence::High,
            }),
            (false, false) => {
                warn!(
                    account_id = %self.account_id,
                    sender_id,
                    recipient_id,
                    "neither party is a known business id, treating sender as customer"
                );
                metrics::record_identity_fallback("neither_party");
                Ok(OtherParty {
                    customer_id: sender_id.to_string(),
                    confidence: Confidence::Low,
                })
            }
            (true, true) => Err(BridgeError::Identity(format!(
                "both {sender_id} and {recipient_id} belong to account {}",
                self.account_id
            ))),
        }
    }

    /// Rewrites the business side of a message to [`Self::effective_channel_id`].
    ///
    /// Returns `(sender, recipient)`. The customer ID is never touched.
    pub fn normalize_message_ids(&self, sender_id: &str, customer_id: &str) -> (String, String) {
        let business = self.effective_channel_id().to_string();
        if self.is_business_id(sender_id) {
            (business, customer_id.to_string())
        } else {
            (sender_id.to_string(), business)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn account(ig: Option<&str>, channel: Option<&str>) -> TenantAccount {
        TenantAccount {
            id: "acct-1".into(),
            instagram_account_id: ig.map(str::to_string),
            messaging_channel_id: channel.map(str::to_string),
            username: None,
            access_token: SecretString::from("tok".to_string()),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn requires_instagram_account_id() {
        assert!(matches!(
            AccountIdentity::from_account(&account(None, Some("999"))),
            Err(BridgeError::Identity(_))
        ));
        assert!(AccountIdentity::from_account(&account(Some("  "), None)).is_err());
    }

    #[test]
    fn effective_channel_prefers_messaging_channel() {
        let without = AccountIdentity::from_account(&account(Some("100"), None)).unwrap();
        assert_eq!(without.effective_channel_id(), "100");
        assert_eq!(without.business_ids().len(), 1);

        let with = AccountIdentity::from_account(&account(Some("100"), Some("999"))).unwrap();
        assert_eq!(with.effective_channel_id(), "999");
        assert!(with.is_business_id("100"));
        assert!(with.is_business_id("999"));
        assert_eq!(with.business_ids().len(), 2);
    }

    #[test]
    fn same_ids_collapse_to_one() {
        let identity = AccountIdentity::new("acct-1", "100", Some("100".into()));
        assert_eq!(identity.business_ids().len(), 1);
        assert_eq!(identity.effective_channel_id(), "100");
    }

    #[test]
    fn direction_follows_business_membership() {
        let identity = AccountIdentity::new("acct-1", "100", Some("999".into()));
        for business in ["100", "999"] {
            assert_eq!(identity.detect_direction(business), Direction::Outbound);
        }
        for customer in ["200", "", "1000"] {
            assert_eq!(identity.detect_direction(customer), Direction::Inbound);
        }
    }

    #[test]
    fn other_party_is_the_non_business_side() {
        let identity = AccountIdentity::new("acct-1", "100", None);
        let inbound = identity.identify_other_party("200", "100").unwrap();
        assert_eq!(inbound.customer_id, "200");
        assert_eq!(inbound.confidence, Confidence::High);

        let outbound = identity.identify_other_party("100", "200").unwrap();
        assert_eq!(outbound.customer_id, "200");
    }

    #[test]
    fn neither_party_falls_back_to_sender_with_low_confidence() {
        let identity = AccountIdentity::new("acct-1", "100", None);
        let party = identity.identify_other_party("200", "999").unwrap();
        assert_eq!(party.customer_id, "200");
        assert_eq!(party.confidence, Confidence::Low);
    }

    #[test]
    fn both_parties_business_is_rejected() {
        let identity = AccountIdentity::new("acct-1", "100", Some("999".into()));
        assert!(matches!(
            identity.identify_other_party("100", "999"),
            Err(BridgeError::Identity(_))
        ));
    }

    #[test]
    fn normalization_rewrites_business_side_only() {
        let identity = AccountIdentity::new("acct-1", "100", Some("999".into()));
        assert_eq!(
            identity.normalize_message_ids("200", "200"),
            ("200".to_string(), "999".to_string())
        );
        assert_eq!(
            identity.normalize_message_ids("100", "200"),
            ("999".to_string(), "200".to_string())
        );
    }

    #[test]
    fn correction_extends_business_ids() {
        let identity = AccountIdentity::new("acct-1", "100", None);
        let corrected = identity.with_messaging_channel_id("999");
        assert_eq!(corrected.effective_channel_id(), "999");
        assert!(corrected.is_business_id("100"));
        assert_eq!(corrected.account_id(), "acct-1");
        assert!(!identity.is_business_id("999"));
    }

    #[test]
    fn corrected_identity_remembers_previous_channel() {
        let identity = AccountIdentity::new("acct-1", "100", Some("999".into()));
        let corrected = identity.corrected_to("100");
        assert_eq!(corrected.effective_channel_id(), "100");
        assert!(corrected.is_business_id("999"));

        let replaced = identity.with_messaging_channel_id("178");
        assert!(!replaced.is_business_id("999"));
    }
}
