// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded profile cache with per-entry expiry.
//!
//! Constructed explicitly and handed to the services that need it. Expired
//! entries are dropped when read; when full, expired entries go first and
//! then the least recently used one.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use instabridge_config::model::CacheConfig;
use instabridge_core::UserProfile;
use tokio::time::Instant;
use tracing::trace;

struct CacheEntry {
    profile: UserProfile,
    /// `None` when the TTL reaches past what the clock can represent.
    expires_at: Option<Instant>,
    last_used: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    /// Monotonic use counter; higher means more recently used.
    tick: u64,
}

impl CacheState {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn evict_lru(&mut self) {
        if let Some(key) = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone())
        {
            trace!(user_id = %key, "evicting least recently used profile");
            self.entries.remove(&key);
        }
    }
}

/// TTL + LRU cache of customer profiles, keyed by Instagram user ID.
pub struct ProfileCache {
    state: Mutex<CacheState>,
    capacity: usize,
    ttl: Duration,
}

impl ProfileCache {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, Duration::from_secs(config.ttl_secs))
    }

    // The state holds no invariants a panicking holder could break.
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns a live entry and marks it as recently used.
    pub fn get(&self, user_id: &str) -> Option<UserProfile> {
        let mut state = self.lock();
        let now = Instant::now();

        let expired = match state.entries.get(user_id) {
            None => return None,
            Some(entry) => entry.is_expired(now),
        };
        if expired {
            state.entries.remove(user_id);
            return None;
        }

        let tick = state.next_tick();
        state.entries.get_mut(user_id).map(|entry| {
            entry.last_used = tick;
            entry.profile.clone()
        })
    }

    pub fn set(&self, user_id: impl Into<String>, profile: UserProfile) {
        let user_id = user_id.into();
        let mut state = self.lock();
        let now = Instant::now();

        if !state.entries.contains_key(&user_id) && state.entries.len() >= self.capacity {
            state.entries.retain(|_, entry| !entry.is_expired(now));
            if state.entries.len() >= self.capacity {
                state.evict_lru();
            }
        }

        let tick = state.next_tick();
        state.entries.insert(
            user_id,
            CacheEntry {
                profile,
                expires_at: now.checked_add(self.ttl),
                last_used: tick,
            },
        );
    }

    /// Entries currently held, including expired ones not yet dropped.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
