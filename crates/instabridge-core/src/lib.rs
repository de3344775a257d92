// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Instabridge messaging bridge.
//!
//! This crate provides the error type, the domain types shared by every
//! crate in the workspace, and the adapter traits that the Instagram client
//! and the storage backend implement.

pub mod error;
pub mod traits;
pub mod types;

pub use error::BridgeError;
pub use types::{
    Attachment, CommitOutcome, Conversation, ConversationSummary, DeliveryStatus, Direction,
    Message, OwnProfile, ProviderMessage, SendReceipt, SyncBatch, TenantAccount, UserProfile,
};

pub use traits::{InstagramApi, StorageAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_error_has_all_variants() {
        let _config = BridgeError::Config("test".into());
        let _storage = BridgeError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _dup = BridgeError::DuplicateMessage { id: "m1".into() };
        let _api = BridgeError::Api {
            message: "test".into(),
            source: None,
        };
        let _malformed = BridgeError::MalformedPayload {
            context: "conversations".into(),
            message: "missing id".into(),
        };
        let _identity = BridgeError::Identity("test".into());
        let _not_found = BridgeError::NotFound {
            entity: "account".into(),
            id: "acct-1".into(),
        };
        let _timeout = BridgeError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = BridgeError::Internal("test".into());
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_instagram_api<T: InstagramApi>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
    }
}
