// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Instagram Graph API adapter for Instabridge.
//!
//! [`InstagramClient`] implements [`InstagramApi`] over reqwest, validating
//! every provider payload at the boundary: items without an ID are dropped
//! with a warning, bodies of the wrong shape become
//! [`BridgeError::MalformedPayload`]. [`webhook`] parses inbound webhook
//! deliveries into typed message events.
//!
//! [`InstagramApi`]: instabridge_core::InstagramApi
//! [`BridgeError::MalformedPayload`]: instabridge_core::BridgeError::MalformedPayload

pub mod client;
pub mod types;
pub mod webhook;

pub use client::InstagramClient;
pub use webhook::{parse_webhook_payload, WebhookMessageEvent};
