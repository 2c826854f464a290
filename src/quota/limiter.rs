//! Core quota limiter implementation.

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::config::QuotaConfig;
use crate::error::Result;
use crate::store::QuotaStore;

use super::decision::{Admission, Decision, Denial, DenyReason};
use super::keys;

/// The core limiter that evaluates purchase attempts against the shared
/// store.
///
/// The limiter holds no mutable state of its own: every call derives its
/// keys, runs one atomic store operation, and maps the raw result to a
/// [`Decision`]. Instances of this service can therefore be replicated
/// freely; the store serializes concurrent attempts for the same client.
pub struct QuotaLimiter<S> {
    /// The shared counter store
    store: S,
    /// Immutable quota configuration
    config: QuotaConfig,
}

impl<S: QuotaStore> QuotaLimiter<S> {
    /// Create a new limiter over the given store.
    pub fn new(store: S, config: QuotaConfig) -> Self {
        Self { store, config }
    }

    /// Get the quota configuration.
    pub fn config(&self) -> &QuotaConfig {
        &self.config
    }

    /// Attempt to purchase one unit for the given client.
    pub async fn try_buy(&self, client_id: &str) -> Result<Decision> {
        self.try_buy_at(client_id, Utc::now()).await
    }

    /// Attempt a purchase at an explicit point in time.
    ///
    /// `try_buy` delegates here with the wall clock; taking the
    /// timestamp as an argument keeps window selection deterministic for
    /// testing.
    pub async fn try_buy_at(&self, client_id: &str, now: DateTime<Utc>) -> Result<Decision> {
        let client_id = client_id.trim();
        // The transport layer validates identifiers before they reach
        // this point; an empty one is still rejected here so a
        // misbehaving caller cannot write under a blank key.
        if client_id.is_empty() {
            return Ok(Decision::Denied(Denial {
                reason: DenyReason::Validation,
                message: "client_id is required".to_string(),
                retry_after_seconds: None,
            }));
        }

        let window_key = keys::window_key(client_id, now);
        let total_key = keys::total_key(client_id);

        trace!(
            client_id = %client_id,
            window_key = %window_key,
            "Evaluating purchase attempt"
        );

        let decision = self
            .store
            .check_and_increment(
                &window_key,
                &total_key,
                self.config.limit,
                self.config.expiry_seconds(),
            )
            .await?;

        if !decision.admitted {
            debug!(
                client_id = %client_id,
                current = decision.current,
                limit = self.config.limit,
                "Purchase quota exceeded"
            );
            return Ok(Decision::Denied(Denial {
                reason: DenyReason::RateLimited,
                message: format!(
                    "rate limit exceeded: {} purchase(s) per {}s window",
                    self.config.limit, self.config.window_seconds
                ),
                retry_after_seconds: Some(self.effective_ttl(decision.ttl_seconds)),
            }));
        }

        Ok(Decision::Admitted(Admission {
            total: decision.total,
            current: decision.current,
            limit: self.config.limit,
            ttl_seconds: self.effective_ttl(decision.ttl_seconds),
        }))
    }

    /// Read the lifetime total of admitted purchases for a client.
    ///
    /// Returns zero for a client that has never purchased.
    pub async fn total(&self, client_id: &str) -> Result<u64> {
        self.store.get_total(&keys::total_key(client_id.trim())).await
    }

    /// The ttl to surface to callers.
    ///
    /// A ttl can legitimately read as unset immediately after key
    /// creation under some store semantics; fall back to the window
    /// length rather than surfacing a non-positive hint.
    fn effective_ttl(&self, ttl_seconds: i64) -> u64 {
        if ttl_seconds > 0 {
            ttl_seconds as u64
        } else {
            self.config.window_seconds
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreDecision};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn test_config(limit: u64) -> QuotaConfig {
        QuotaConfig {
            limit,
            window_seconds: 60,
            ttl_margin_seconds: 10,
        }
    }

    fn test_limiter(limit: u64) -> QuotaLimiter<MemoryStore> {
        QuotaLimiter::new(MemoryStore::new(), test_config(limit))
    }

    fn at_minute(minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, second).unwrap()
    }

    #[tokio::test]
    async fn test_first_buy_is_admitted() {
        let limiter = test_limiter(1);

        let decision = limiter.try_buy_at("alice", at_minute(0, 0)).await.unwrap();

        match decision {
            Decision::Admitted(admission) => {
                assert_eq!(admission.current, 1);
                assert_eq!(admission.total, 1);
                assert_eq!(admission.limit, 1);
                assert!(admission.ttl_seconds > 0);
            }
            Decision::Denied(denial) => panic!("expected admission, got {:?}", denial),
        }
    }

    #[tokio::test]
    async fn test_second_buy_in_same_window_is_denied() {
        let limiter = test_limiter(1);

        limiter.try_buy_at("alice", at_minute(0, 1)).await.unwrap();
        let decision = limiter.try_buy_at("alice", at_minute(0, 59)).await.unwrap();

        match decision {
            Decision::Denied(denial) => {
                assert_eq!(denial.reason, DenyReason::RateLimited);
                assert!(denial.retry_after_seconds.unwrap() > 0);
                assert!(denial.message.contains("rate limit exceeded"));
            }
            Decision::Admitted(admission) => panic!("expected denial, got {:?}", admission),
        }
    }

    #[tokio::test]
    async fn test_buy_in_next_window_is_admitted_and_total_accumulates() {
        let limiter = test_limiter(1);

        limiter.try_buy_at("alice", at_minute(0, 59)).await.unwrap();
        let decision = limiter.try_buy_at("alice", at_minute(1, 0)).await.unwrap();

        match decision {
            Decision::Admitted(admission) => {
                assert_eq!(admission.current, 1);
                assert_eq!(admission.total, 2);
            }
            Decision::Denied(denial) => panic!("expected admission, got {:?}", denial),
        }
    }

    #[tokio::test]
    async fn test_clients_do_not_interfere() {
        let limiter = test_limiter(1);

        limiter.try_buy_at("alice", at_minute(0, 0)).await.unwrap();
        let decision = limiter.try_buy_at("bob", at_minute(0, 0)).await.unwrap();

        assert!(matches!(decision, Decision::Admitted(_)));
    }

    #[tokio::test]
    async fn test_blank_client_id_is_rejected_without_store_access() {
        let store = MemoryStore::new();
        let limiter = QuotaLimiter::new(store, test_config(1));

        let decision = limiter.try_buy_at("   ", at_minute(0, 0)).await.unwrap();

        match decision {
            Decision::Denied(denial) => {
                assert_eq!(denial.reason, DenyReason::Validation);
                assert_eq!(denial.retry_after_seconds, None);
            }
            Decision::Admitted(admission) => panic!("expected denial, got {:?}", admission),
        }
        // No key was ever written.
        assert_eq!(limiter.store.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_client_id_is_trimmed_before_key_derivation() {
        let limiter = test_limiter(1);

        limiter.try_buy_at("  alice  ", at_minute(0, 0)).await.unwrap();
        let decision = limiter.try_buy_at("alice", at_minute(0, 30)).await.unwrap();

        assert!(matches!(decision, Decision::Denied(_)));
        assert_eq!(limiter.total("alice").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_total_defaults_to_zero() {
        let limiter = test_limiter(1);

        assert_eq!(limiter.total("nobody").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_total_after_one_purchase() {
        let limiter = test_limiter(1);

        limiter.try_buy_at("alice", at_minute(0, 0)).await.unwrap();

        assert_eq!(limiter.total("alice").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_attempts_admit_exactly_limit() {
        let limiter = Arc::new(QuotaLimiter::new(MemoryStore::new(), test_config(3)));
        let now = at_minute(0, 0);

        let attempts = (0..10).map(|_| {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.try_buy_at("alice", now).await.unwrap() })
        });

        let decisions = futures::future::join_all(attempts).await;
        let admitted = decisions
            .iter()
            .filter(|d| matches!(d.as_ref().unwrap(), Decision::Admitted(_)))
            .count();

        assert_eq!(admitted, 3);
        assert_eq!(limiter.total("alice").await.unwrap(), 3);
    }

    /// Store stub that reports an unset ttl, as a freshly created key can
    /// under some store semantics.
    struct UnsetTtlStore;

    #[async_trait]
    impl QuotaStore for UnsetTtlStore {
        async fn check_and_increment(
            &self,
            _window_key: &str,
            _total_key: &str,
            _limit: u64,
            _expiry_seconds: u64,
        ) -> crate::error::Result<StoreDecision> {
            Ok(StoreDecision {
                admitted: false,
                ttl_seconds: -1,
                current: 2,
                total: 0,
            })
        }

        async fn get_total(&self, _total_key: &str) -> crate::error::Result<u64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_denial_ttl_falls_back_to_window_length() {
        let limiter = QuotaLimiter::new(UnsetTtlStore, test_config(1));

        let decision = limiter.try_buy_at("alice", at_minute(0, 0)).await.unwrap();

        match decision {
            Decision::Denied(denial) => {
                assert_eq!(denial.retry_after_seconds, Some(60));
            }
            Decision::Admitted(admission) => panic!("expected denial, got {:?}", admission),
        }
    }
}
