//! The [`QueueBroker`] contract: three named FIFO queues and a keyed lock
//! namespace with expiry (SPEC_FULL.md §4.7).
//!
//! No transactional multi-key operations are required — every coordination
//! need in the ingestion fabric reduces to these five primitives.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::BrokerResult;

/// Broker contract consumed by the manager and every stage worker.
///
/// Implementations must guarantee that exactly one consumer receives each
/// pushed item (`blocking_pop`), and that `set_nx_ex` is atomic create-or-fail
/// so two claimers racing on the same key never both succeed.
#[async_trait]
pub trait QueueBroker: Send + Sync {
    /// Append `payload` to the tail of `queue`. Never blocks.
    ///
    /// # Errors
    /// Returns a [`crate::BrokerError`] if the push fails.
    async fn push(&self, queue: &str, payload: &str) -> BrokerResult<()>;

    /// Atomically pop one item from the head of `queue`, blocking up to
    /// `timeout` if the queue is empty. Returns `None` on timeout.
    ///
    /// # Errors
    /// Returns a [`crate::BrokerError`] if the pop fails.
    async fn blocking_pop(&self, queue: &str, timeout: Duration) -> BrokerResult<Option<String>>;

    /// Atomically create `key` with `value` and the given TTL, failing if the
    /// key already exists. Returns `true` if this call created the key.
    ///
    /// # Errors
    /// Returns a [`crate::BrokerError`] if the command fails.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> BrokerResult<bool>;

    /// Returns whether `key` currently exists.
    ///
    /// # Errors
    /// Returns a [`crate::BrokerError`] if the command fails.
    async fn exists(&self, key: &str) -> BrokerResult<bool>;

    /// Deletes `key`, if present.
    ///
    /// # Errors
    /// Returns a [`crate::BrokerError`] if the command fails.
    async fn delete(&self, key: &str) -> BrokerResult<()>;
}

/// Builds the claim-lock key for a given filename (SPEC_FULL.md §6).
#[must_use]
pub fn extraction_lock_key(filename: &str) -> String {
    format!("lock:extraction:{filename}")
}
