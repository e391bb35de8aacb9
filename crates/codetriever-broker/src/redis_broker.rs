//! Redis-backed [`QueueBroker`], matching the original platform's direct
//! `redis-py` usage in `extraction_manager.py`/`extraction.py`/`chunking.py`/
//! `embedding.py`: `RPUSH`/`BRPOP` for the three job queues, `SET NX EX` for
//! the claim-lock namespace.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

use crate::error::{BrokerError, BrokerResult};
use crate::traits::QueueBroker;

/// Connects once at startup and reconnects transparently on transient
/// outages via `redis`'s `ConnectionManager`.
pub struct RedisBroker {
    manager: ConnectionManager,
}

impl RedisBroker {
    /// Connect to `redis_url` (e.g. `redis://127.0.0.1:6379`).
    ///
    /// # Errors
    /// Returns a [`BrokerError`] if the connection cannot be established.
    pub async fn connect(redis_url: &str) -> BrokerResult<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| BrokerError::Connection(e.to_string()))?;
        let manager = client.get_connection_manager().await?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl QueueBroker for RedisBroker {
    async fn push(&self, queue: &str, payload: &str) -> BrokerResult<()> {
        let mut conn = self.manager.clone();
        let _: i64 = conn.rpush(queue, payload).await?;
        Ok(())
    }

    async fn blocking_pop(&self, queue: &str, timeout: Duration) -> BrokerResult<Option<String>> {
        let mut conn = self.manager.clone();
        let result: Option<(String, String)> = conn
            .brpop(queue, timeout.as_secs_f64())
            .await?;
        Ok(result.map(|(_, payload)| payload))
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> BrokerResult<bool> {
        let mut conn = self.manager.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn exists(&self, key: &str) -> BrokerResult<bool> {
        let mut conn = self.manager.clone();
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn delete(&self, key: &str) -> BrokerResult<()> {
        let mut conn = self.manager.clone();
        let _: i64 = conn.del(key).await?;
        Ok(())
    }
}
