//! Redis-backed shared counter store.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use tracing::{debug, info};

use crate::error::Result;

use super::{QuotaStore, StoreDecision};

/// The admission decision as a single Redis script.
///
/// KEYS[1] = window counter key, KEYS[2] = lifetime total key,
/// ARGV[1] = limit, ARGV[2] = expiry seconds.
///
/// The counter is created with its expiry in one step; a separate
/// set-then-expire pair would leave the key immortal if the process died
/// between the two calls. The expiry is never touched again, so a
/// counter's lifetime is fixed at creation no matter how many increments
/// land in its window.
const DECIDE_SCRIPT: &str = r#"
redis.call('SET', KEYS[1], 0, 'NX', 'EX', ARGV[2])
local current = redis.call('INCR', KEYS[1])
local ttl = redis.call('TTL', KEYS[1])
if current > tonumber(ARGV[1]) then
    return {0, ttl, current, 0}
end
local total = redis.call('INCR', KEYS[2])
return {1, ttl, current, total}
"#;

/// Shared counter store backed by Redis.
///
/// All mutation discipline is delegated to Redis script execution, which
/// runs [`DECIDE_SCRIPT`] as one indivisible unit across all callers.
pub struct RedisStore {
    connection: ConnectionManager,
    script: Script,
}

impl RedisStore {
    /// Connect to Redis.
    ///
    /// url: "redis://127.0.0.1:6379"
    pub async fn connect(url: &str) -> Result<Self> {
        info!(url = %url, "Connecting to Redis");
        let client = redis::Client::open(url)?;
        let connection = client.get_connection_manager().await?;

        Ok(Self {
            connection,
            script: Script::new(DECIDE_SCRIPT),
        })
    }
}

#[async_trait]
impl QuotaStore for RedisStore {
    async fn check_and_increment(
        &self,
        window_key: &str,
        total_key: &str,
        limit: u64,
        expiry_seconds: u64,
    ) -> Result<StoreDecision> {
        let mut connection = self.connection.clone();

        let (admitted, ttl_seconds, current, total): (i64, i64, i64, i64) = self
            .script
            .key(window_key)
            .key(total_key)
            .arg(limit)
            .arg(expiry_seconds)
            .invoke_async(&mut connection)
            .await?;

        debug!(
            window_key = %window_key,
            admitted = admitted == 1,
            current = current,
            ttl = ttl_seconds,
            "Admission script executed"
        );

        Ok(StoreDecision {
            admitted: admitted == 1,
            ttl_seconds,
            current: current.max(0) as u64,
            total: total.max(0) as u64,
        })
    }

    async fn get_total(&self, total_key: &str) -> Result<u64> {
        let mut connection = self.connection.clone();
        let total: Option<u64> = connection.get(total_key).await?;
        Ok(total.unwrap_or(0))
    }
}
