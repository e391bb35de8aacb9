//! In-memory fake broker for unit and integration tests, mirroring
//! `codetriever-vector-data::storage::mock` and `codetriever-status::mock`'s
//! role as a stand-in for an external backend.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::error::BrokerResult;
use crate::traits::QueueBroker;

struct LockEntry {
    value: String,
    expires_at: Instant,
}

/// A single-process, in-memory [`QueueBroker`]. FIFO per queue, locks expire
/// on TTL the same way Redis keys do.
#[derive(Default)]
pub struct FakeBroker {
    queues: Mutex<HashMap<String, VecDeque<String>>>,
    locks: Mutex<HashMap<String, LockEntry>>,
}

impl FakeBroker {
    /// Construct an empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn try_pop(&self, queue: &str) -> Option<String> {
        let mut queues = self.queues.lock().await;
        queues.get_mut(queue).and_then(VecDeque::pop_front)
    }

    async fn evict_expired(&self, key: &str) {
        let mut locks = self.locks.lock().await;
        if let Some(entry) = locks.get(key) {
            if entry.expires_at <= Instant::now() {
                locks.remove(key);
            }
        }
    }
}

#[async_trait]
impl QueueBroker for FakeBroker {
    async fn push(&self, queue: &str, payload: &str) -> BrokerResult<()> {
        let mut queues = self.queues.lock().await;
        queues
            .entry(queue.to_string())
            .or_default()
            .push_back(payload.to_string());
        Ok(())
    }

    async fn blocking_pop(&self, queue: &str, timeout: Duration) -> BrokerResult<Option<String>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(item) = self.try_pop(queue).await {
                return Ok(Some(item));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(Duration::from_millis(10)).await;
        }
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> BrokerResult<bool> {
        self.evict_expired(key).await;
        let mut locks = self.locks.lock().await;
        if locks.contains_key(key) {
            return Ok(false);
        }
        locks.insert(
            key.to_string(),
            LockEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(true)
    }

    async fn exists(&self, key: &str) -> BrokerResult<bool> {
        self.evict_expired(key).await;
        Ok(self.locks.lock().await.contains_key(key))
    }

    async fn delete(&self, key: &str) -> BrokerResult<()> {
        self.locks.lock().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn push_then_pop_is_fifo() {
        let broker = FakeBroker::new();
        broker.push("q", "a").await.unwrap();
        broker.push("q", "b").await.unwrap();
        assert_eq!(
            broker.blocking_pop("q", Duration::from_millis(50)).await.unwrap(),
            Some("a".to_string())
        );
        assert_eq!(
            broker.blocking_pop("q", Duration::from_millis(50)).await.unwrap(),
            Some("b".to_string())
        );
    }

    #[tokio::test]
    async fn pop_times_out_on_empty_queue() {
        let broker = FakeBroker::new();
        let result = broker.blocking_pop("empty", Duration::from_millis(20)).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn set_if_absent_is_atomic_create_or_fail() {
        let broker = FakeBroker::new();
        assert!(
            broker
                .set_if_absent("lock:extraction:a.pdf", "manager-1", Duration::from_secs(300))
                .await
                .unwrap()
        );
        assert!(
            !broker
                .set_if_absent("lock:extraction:a.pdf", "manager-2", Duration::from_secs(300))
                .await
                .unwrap()
        );
        assert!(broker.exists("lock:extraction:a.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn lock_expires_after_ttl() {
        let broker = FakeBroker::new();
        broker
            .set_if_absent("lock:extraction:a.pdf", "manager-1", Duration::from_millis(10))
            .await
            .unwrap();
        sleep(Duration::from_millis(30)).await;
        assert!(!broker.exists("lock:extraction:a.pdf").await.unwrap());
        assert!(
            broker
                .set_if_absent("lock:extraction:a.pdf", "manager-2", Duration::from_secs(60))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn delete_releases_lock() {
        let broker = FakeBroker::new();
        broker
            .set_if_absent("lock:extraction:a.pdf", "manager-1", Duration::from_secs(60))
            .await
            .unwrap();
        broker.delete("lock:extraction:a.pdf").await.unwrap();
        assert!(!broker.exists("lock:extraction:a.pdf").await.unwrap());
    }
}
