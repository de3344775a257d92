// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express. All violations are
//! collected before returning so the operator sees every problem at once.

use crate::diagnostic::ConfigError;
use crate::model::BridgeConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// One year.
const MAX_HOURS_BACK: u32 = 24 * 365;
/// Thirty days.
const MAX_CACHE_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut invalid = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        invalid(format!(
            "service.log_level `{}` must be one of {}",
            config.service.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    let base = config.instagram.graph_base_url.trim();
    if !(base.starts_with("https://") || base.starts_with("http://")) {
        invalid(format!(
            "instagram.graph_base_url `{base}` must be an http(s) URL"
        ));
    }

    if config.instagram.api_version.trim().is_empty() {
        invalid("instagram.api_version must not be empty".to_string());
    }

    if config.instagram.request_timeout_secs == 0 {
        invalid("instagram.request_timeout_secs must be at least 1".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        invalid("storage.database_path must not be empty".to_string());
    }

    if config.sync.hours_back == 0 {
        invalid("sync.hours_back must be at least 1".to_string());
    } else if config.sync.hours_back > MAX_HOURS_BACK {
        invalid(format!(
            "sync.hours_back {} must be at most {MAX_HOURS_BACK}",
            config.sync.hours_back
        ));
    }

    if config.sync.max_messages_per_conversation == 0 {
        invalid("sync.max_messages_per_conversation must be at least 1".to_string());
    }

    if config.sync.conversation_limit == 0 {
        invalid("sync.conversation_limit must be at least 1".to_string());
    }

    if config.sync.timeout_secs == Some(0) {
        invalid("sync.timeout_secs must be at least 1 when set".to_string());
    }

    if config.cache.capacity == 0 {
        invalid("cache.capacity must be at least 1".to_string());
    }

    if config.cache.ttl_secs > MAX_CACHE_TTL_SECS {
        invalid(format!(
            "cache.ttl_secs {} must be at most {MAX_CACHE_TTL_SECS}",
            config.cache.ttl_secs
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &BridgeConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&BridgeConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = BridgeConfig::default();
        config.storage.database_path = "  ".to_string();
        assert!(messages(&config).iter().any(|m| m.contains("database_path")));
    }

    #[test]
    fn zero_sync_window_fails_validation() {
        let mut config = BridgeConfig::default();
        config.sync.hours_back = 0;
        assert!(messages(&config).iter().any(|m| m.contains("sync.hours_back")));
    }

    #[test]
    fn oversized_windows_fail_validation() {
        let mut config = BridgeConfig::default();
        config.sync.hours_back = u32::MAX;
        config.cache.ttl_secs = u64::MAX;
        let messages = messages(&config);
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("sync.hours_back"));
        assert!(messages[1].contains("cache.ttl_secs"));

        config.sync.hours_back = MAX_HOURS_BACK;
        config.cache.ttl_secs = MAX_CACHE_TTL_SECS;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = BridgeConfig::default();
        config.service.log_level = "loud".to_string();
        config.instagram.graph_base_url = "graph.instagram.com".to_string();
        config.cache.capacity = 0;
        config.sync.timeout_secs = Some(0);
        assert_eq!(messages(&config).len(), 4);
    }

    #[test]
    fn disabled_timeout_is_valid() {
        let mut config = BridgeConfig::default();
        config.sync.timeout_secs = None;
        assert!(validate_config(&config).is_ok());
    }
}
