//! The blocking-pop worker loop shared by every stage
//! (`extraction.py`/`chunking.py`/`embedding.py`'s `process_*_queue()`
//! functions all follow this same shape: `BRPOP` with a timeout, process
//! what comes back, back off on error, poll a shutdown flag each pass).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use codetriever_broker::QueueBroker;
use tracing::{error, warn};

/// Pops from `queue` until `shutdown` is set, handing each payload to
/// `handle`. Errors from `handle` are logged and back off for
/// `error_backoff`; a payload that fails to process is not retried
/// automatically (SPEC_FULL.md §7: failures are terminal per-job, not
/// requeued by the worker itself).
pub async fn run<F, Fut>(
    broker: Arc<dyn QueueBroker>,
    queue: &str,
    pop_timeout: Duration,
    error_backoff: Duration,
    shutdown: Arc<AtomicBool>,
    mut handle: F,
) where
    F: FnMut(String) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    while !shutdown.load(Ordering::Relaxed) {
        match broker.blocking_pop(queue, pop_timeout).await {
            Ok(Some(payload)) => handle(payload).await,
            Ok(None) => {}
            Err(e) => {
                warn!(queue, error = %e, "queue pop failed, backing off");
                tokio::time::sleep(error_backoff).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codetriever_broker::FakeBroker;
    use std::sync::Mutex;

    #[tokio::test]
    async fn stops_promptly_once_shutdown_is_set() {
        let broker: Arc<dyn QueueBroker> = Arc::new(FakeBroker::new());
        let shutdown = Arc::new(AtomicBool::new(true));
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        run(broker, "q", Duration::from_millis(5), Duration::from_millis(5), shutdown, move |p| {
            let seen = seen_clone.clone();
            async move {
                seen.lock().expect("lock").push(p);
            }
        })
        .await;

        assert!(seen.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn processes_queued_payload_before_shutdown_observed() {
        let broker = Arc::new(FakeBroker::new());
        broker.push("q", "hello").await.expect("push");
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        run(broker, "q", Duration::from_millis(5), Duration::from_millis(5), shutdown, move |p| {
            let seen = seen_clone.clone();
            let shutdown = shutdown_clone.clone();
            async move {
                seen.lock().expect("lock").push(p);
                shutdown.store(true, Ordering::Relaxed);
            }
        })
        .await;

        assert_eq!(seen.lock().expect("lock").as_slice(), ["hello"]);
    }
}
