// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account identity resolution and conversation sync for Instabridge.
//!
//! Instagram reports a tenant's own account under more than one ID: the
//! OAuth profile ID, the ID webhooks route on, and the participant ID in
//! conversations. [`AccountIdentity`] reconciles them into one business
//! identity per tenant; [`InstagramSyncService`] uses it to pull recent
//! conversation history, tag direction, deduplicate, and commit each run
//! atomically.
//!
//! The linking, webhook, and outbound services build on the same identity
//! so every stored message uses the tenant's effective channel ID for the
//! business side.

pub mod cache;
pub mod identity;
pub mod linking;
pub mod metrics;
pub mod outbound;
pub mod resolve;
pub mod result;
pub mod retry;
pub mod service;
pub mod timestamps;
pub mod webhook;

pub use cache::ProfileCache;
pub use identity::{AccountIdentity, Confidence, OtherParty};
pub use linking::{AccountLinkingService, LinkOutcome};
pub use outbound::OutboundService;
pub use resolve::{customer_from_messages, resolve_participants, ParticipantResolution, ResolutionConfidence};
pub use result::SyncResult;
pub use retry::RetryPolicy;
pub use service::{InstagramSyncService, SyncOptions};
pub use webhook::{WebhookOutcome, WebhookProcessor};
