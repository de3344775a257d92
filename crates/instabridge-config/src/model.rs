// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Instabridge bridge.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Instabridge configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Instagram Graph API settings.
    #[serde(default)]
    pub instagram: InstagramConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Conversation sync settings.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Profile cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name used in logs.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "instabridge".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Instagram Graph API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InstagramConfig {
    /// Base URL of the Graph API host.
    #[serde(default = "default_graph_base_url")]
    pub graph_base_url: String,

    /// Graph API version path segment.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for InstagramConfig {
    fn default() -> Self {
        Self {
            graph_base_url: default_graph_base_url(),
            api_version: default_api_version(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_graph_base_url() -> String {
    "https://graph.instagram.com".to_string()
}

fn default_api_version() -> String {
    "v21.0".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("instabridge").join("instabridge.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("instabridge.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Conversation sync configuration.
///
/// Controls the recency window, per-conversation fetch size, and the
/// bounded retry around the conversation listing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Only conversations updated within this many hours are synced.
    /// Matches the provider's 24-hour messaging window by default.
    #[serde(default = "default_hours_back")]
    pub hours_back: u32,

    /// Maximum messages fetched per conversation.
    #[serde(default = "default_max_messages_per_conversation")]
    pub max_messages_per_conversation: usize,

    /// Maximum conversations listed in phase one.
    #[serde(default = "default_conversation_limit")]
    pub conversation_limit: usize,

    /// Cache customer profiles while syncing.
    #[serde(default = "default_cache_profiles")]
    pub cache_profiles: bool,

    /// Retries after the first failed conversation listing.
    #[serde(default = "default_list_retries")]
    pub list_retries: u32,

    /// Base delay between listing attempts; attempt `n` waits `n * base`.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Wall-clock cap for one sync run. `None` disables the cap.
    #[serde(default = "default_sync_timeout_secs")]
    pub timeout_secs: Option<u64>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            hours_back: default_hours_back(),
            max_messages_per_conversation: default_max_messages_per_conversation(),
            conversation_limit: default_conversation_limit(),
            cache_profiles: default_cache_profiles(),
            list_retries: default_list_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            timeout_secs: default_sync_timeout_secs(),
        }
    }
}

fn default_hours_back() -> u32 {
    24
}

fn default_max_messages_per_conversation() -> usize {
    25
}

fn default_conversation_limit() -> usize {
    50
}

fn default_cache_profiles() -> bool {
    true
}

fn default_list_retries() -> u32 {
    2
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_sync_timeout_secs() -> Option<u64> {
    Some(120)
}

/// Profile cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Maximum number of cached profiles before least-recently-used eviction.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Seconds a cached profile stays valid.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_cache_capacity() -> usize {
    1000
}

fn default_cache_ttl_secs() -> u64 {
    3600 // 1 hour
}
