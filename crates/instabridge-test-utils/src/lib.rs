// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Instabridge integration tests.
//!
//! Provides a scripted Instagram API and a harness backed by a temp SQLite
//! database, enabling fast, deterministic tests without external services.
//!
//! # Components
//!
//! - [`MockInstagramApi`] - Instagram API with scripted responses and call counters
//! - [`TestHarness`] - Temp-dir SQLite storage with seeded tenant accounts

pub mod harness;
pub mod mock_instagram;

pub use harness::{tenant_account, TestHarness};
pub use mock_instagram::{conversation, provider_message, MockInstagramApi};
