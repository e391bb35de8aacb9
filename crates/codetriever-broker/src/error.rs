//! Queue broker error types

use thiserror::Error;

/// Errors surfaced by a [`crate::QueueBroker`] implementation.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The underlying connection could not be established or was dropped.
    #[error("broker connection error: {0}")]
    Connection(String),

    /// A command against the broker failed.
    #[error("broker command error: {0}")]
    Command(String),

    /// A payload could not be serialized or deserialized.
    #[error("broker payload error: {0}")]
    Payload(String),
}

impl From<redis::RedisError> for BrokerError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_connection_refusal() || e.is_io_error() {
            Self::Connection(e.to_string())
        } else {
            Self::Command(e.to_string())
        }
    }
}

/// Result type for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;
