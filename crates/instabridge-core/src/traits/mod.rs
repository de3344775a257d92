// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Both adapters use `#[async_trait]` for dynamic dispatch compatibility so
//! services can hold them as `Arc<dyn ...>` or `&dyn ...`.

pub mod instagram;
pub mod storage;

pub use instagram::InstagramApi;
pub use storage::StorageAdapter;
