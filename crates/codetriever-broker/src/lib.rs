//! Queue broker abstraction for the ingestion fabric: three named FIFO
//! queues (extract/chunk/embed) and a keyed lock namespace with expiry.
//!
//! The concrete backend is Redis (`BRPOP`/`RPUSH`/`SET NX EX`/`EXISTS`/`DEL`),
//! wrapped behind the [`QueueBroker`] trait so callers can swap in
//! [`FakeBroker`] for tests.

pub mod error;
pub mod fake;
pub mod redis_broker;
pub mod traits;

pub use error::{BrokerError, BrokerResult};
pub use fake::FakeBroker;
pub use redis_broker::RedisBroker;
pub use traits::{QueueBroker, extraction_lock_key};
