// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded retry for list calls that degrade to an empty result.

use std::future::Future;
use std::time::Duration;

use instabridge_config::model::SyncConfig;
use instabridge_core::BridgeError;
use tracing::{debug, warn};

/// Fixed-attempt retry with linearly growing delay.
///
/// Attempt `n` (1-based) after the first waits `base_delay * n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            max_retries: config.list_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }

    /// Runs `fetch` until it yields a non-empty list.
    ///
    /// `Ok(None)`, an empty list and `Err` are all retried. After the last
    /// attempt the result is an empty list, never an error.
    pub async fn list_with_retry<T, F, Fut>(&self, operation: &str, mut fetch: F) -> Vec<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<Vec<T>>, BridgeError>>,
    {
        let attempts = self.max_retries + 1;
        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.base_delay * attempt;
                debug!(operation, attempt, delay_ms = delay.as_millis() as u64, "retrying");
                tokio::time::sleep(delay).await;
            }

            match fetch().await {
                Ok(Some(items)) if !items.is_empty() => return items,
                Ok(Some(_)) => debug!(operation, attempt, "empty result"),
                Ok(None) => warn!(operation, attempt, "provider returned no data"),
                Err(e) => warn!(operation, attempt, error = %e, "request failed"),
            }
        }

        warn!(operation, attempts, "giving up after all attempts");
        Vec::new()
    }
}
