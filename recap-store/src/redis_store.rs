//! Redis implementation of the store backend.
//!
//! Uses a tokio connection manager so a dropped connection is re-established
//! transparently; while the store is genuinely unreachable, operations
//! surface `StoreError::Unavailable` and the callers' fail-open/fail-silent
//! policies take over.

use crate::backend::StoreBackend;
use async_trait::async_trait;
use recap_core::StoreError;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

/// Shared-store backend over Redis.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Connect to the store at `url`, e.g. `redis://127.0.0.1:6379`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(|e| StoreError::Unavailable {
            reason: format!("invalid store url: {}", e),
        })?;
        let manager =
            client
                .get_connection_manager()
                .await
                .map_err(|e| StoreError::Unavailable {
                    reason: format!("failed to connect: {}", e),
                })?;
        Ok(Self { manager })
    }

    fn map_err(op: &str, key: &str, err: redis::RedisError) -> StoreError {
        if err.is_io_error() || err.is_timeout() || err.is_connection_refusal() {
            StoreError::Unavailable {
                reason: err.to_string(),
            }
        } else {
            StoreError::OperationFailed {
                op: op.to_string(),
                key: key.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl StoreBackend for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.manager.clone();
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| Self::map_err("GET", key, e))
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(|e| Self::map_err("SETEX", key, e))
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.manager.clone();
        conn.incr::<_, _, i64>(key, 1)
            .await
            .map_err(|e| Self::map_err("INCR", key, e))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        conn.expire::<_, ()>(key, ttl.as_secs().max(1) as i64)
            .await
            .map_err(|e| Self::map_err("EXPIRE", key, e))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| Self::map_err("DEL", key, e))
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError> {
        let mut conn = self.manager.clone();
        let pattern = format!("{}*", prefix);

        let keys: Vec<String> = {
            let mut iter = conn
                .scan_match::<_, String>(&pattern)
                .await
                .map_err(|e| Self::map_err("SCAN", prefix, e))?;
            let mut keys = Vec::new();
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
            keys
        };

        let mut pairs = Vec::with_capacity(keys.len());
        for key in keys {
            // A key can expire between the scan and the read; skip it.
            if let Some(value) = conn
                .get::<_, Option<String>>(&key)
                .await
                .map_err(|e| Self::map_err("GET", &key, e))?
            {
                pairs.push((key, value));
            }
        }
        Ok(pairs)
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}
