//! In-process counter store.
//!
//! Mirrors the semantics of the Redis admission script for tests and
//! single-node deployments. State is process-local, so it cannot enforce
//! a quota across multiple instances.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::Result;

use super::{QuotaStore, StoreDecision};

struct Entry {
    value: u64,
    /// None for the lifetime total, which never expires.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(at) if now >= at)
    }

    /// Remaining expiry in whole seconds, rounded up. -1 when the entry
    /// has no expiry, matching Redis TTL semantics.
    fn ttl_seconds(&self, now: Instant) -> i64 {
        match self.expires_at {
            None => -1,
            Some(at) => {
                let remaining = at.saturating_duration_since(now);
                let mut secs = remaining.as_secs() as i64;
                if remaining.subsec_nanos() > 0 {
                    secs += 1;
                }
                secs
            }
        }
    }
}

/// In-memory counter store.
///
/// A single mutex guards the whole map, so the check-and-increment
/// sequence is indivisible here for the same reason the Lua script is
/// indivisible in Redis: no other caller can run between its steps.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of live entries.
    ///
    /// This is primarily useful for testing.
    pub fn entry_count(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock();
        entries.values().filter(|e| !e.is_expired(now)).count()
    }
}

#[async_trait]
impl QuotaStore for MemoryStore {
    async fn check_and_increment(
        &self,
        window_key: &str,
        total_key: &str,
        limit: u64,
        expiry_seconds: u64,
    ) -> Result<StoreDecision> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        if entries
            .get(window_key)
            .map(|e| e.is_expired(now))
            .unwrap_or(false)
        {
            entries.remove(window_key);
        }

        let (current, ttl_seconds) = {
            let counter = entries.entry(window_key.to_string()).or_insert_with(|| Entry {
                value: 0,
                expires_at: Some(now + Duration::from_secs(expiry_seconds)),
            });
            counter.value += 1;
            (counter.value, counter.ttl_seconds(now))
        };

        if current > limit {
            return Ok(StoreDecision {
                admitted: false,
                ttl_seconds,
                current,
                total: 0,
            });
        }

        let total_entry = entries.entry(total_key.to_string()).or_insert(Entry {
            value: 0,
            expires_at: None,
        });
        total_entry.value += 1;

        Ok(StoreDecision {
            admitted: true,
            ttl_seconds,
            current,
            total: total_entry.value,
        })
    }

    async fn get_total(&self, total_key: &str) -> Result<u64> {
        let now = Instant::now();
        let entries = self.entries.lock();
        Ok(entries
            .get(total_key)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.value)
            .unwrap_or(0))
    }
}
