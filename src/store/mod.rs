//! Shared counter store abstractions.

mod memory;
mod redis;

pub use memory::MemoryStore;
pub use self::redis::RedisStore;

use async_trait::async_trait;

use crate::error::Result;

/// Raw outcome of the atomic admission operation.
///
/// `ttl_seconds` is reported by the store and may be non-positive under
/// some store semantics (e.g. read immediately after creation); callers
/// are expected to substitute the configured window length in that case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreDecision {
    /// Whether the attempt was admitted
    pub admitted: bool,
    /// Remaining expiry of the window counter, in seconds
    pub ttl_seconds: i64,
    /// Window counter value after this attempt's increment
    pub current: u64,
    /// New lifetime total; zero when the attempt was not admitted
    pub total: u64,
}

/// Trait for shared counter store implementations.
///
/// This trait abstracts over the production [`RedisStore`] and the
/// in-process [`MemoryStore`] so the limiter can work with either.
///
/// The admission operation is deliberately exposed as one capability
/// rather than as separate get/set/increment calls: the at-most-`limit`
/// guarantee holds only because the whole check-and-increment sequence
/// executes indivisibly at the store.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Atomically evaluate one purchase attempt.
    ///
    /// Creates the window counter with `expiry_seconds` if absent (the
    /// expiry is attached at creation and never refreshed), increments
    /// it, and increments the lifetime total only when the
    /// post-increment count is within `limit`.
    async fn check_and_increment(
        &self,
        window_key: &str,
        total_key: &str,
        limit: u64,
        expiry_seconds: u64,
    ) -> Result<StoreDecision>;

    /// Read the lifetime total for a client; zero when absent.
    async fn get_total(&self, total_key: &str) -> Result<u64>;
}
