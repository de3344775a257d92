// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Instabridge messaging bridge.

use thiserror::Error;

/// The primary error type used across all Instabridge traits and core operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A message with the same provider ID is already stored.
    #[error("duplicate message: {id}")]
    DuplicateMessage { id: String },

    /// Instagram API transport failures and rejected requests.
    #[error("instagram api error: {message}")]
    Api {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A provider payload did not have the expected shape.
    #[error("malformed {context} payload: {message}")]
    MalformedPayload { context: String, message: String },

    /// Business identity could not be established or is contradictory.
    #[error("identity error: {0}")]
    Identity(String),

    /// A requested entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Returns true when the error is a uniqueness violation on a message ID.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, BridgeError::DuplicateMessage { .. })
    }
}
