//! Auto-refreshing cast feed.
//!
//! Ticks are fixed-delay from the start of each fetch. A tick that fires while
//! the previous fetch is still in flight is skipped, so at most one request is
//! outstanding at a time.

use super::{FeedError, FeedFetcher, FeedItem, FetchOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_BATCH_SIZE: usize = 25;

const MIN_INTERVAL: Duration = Duration::from_millis(100);

pub struct FeedPoller {
    fetcher: Arc<dyn FeedFetcher>,
    fetch_timeout: Option<Duration>,
}

/// Outcome channel shared by the loop and its handle. `None` once stopped.
type SharedSink = Arc<Mutex<Option<UnboundedSender<FetchOutcome>>>>;

/// Cancellation handle for a running poll loop. Dropping it stops the loop.
#[derive(Debug)]
pub struct PollHandle {
    sink: SharedSink,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Stop scheduling fetches. A fetch already in flight runs to completion
    /// but its outcome is never published, even if it finished concurrently
    /// with this call.
    pub fn stop(&self) {
        let released = self.sink.lock().map(|mut sink| sink.take()).unwrap_or(None);
        if released.is_some() {
            self.task.abort();
            tracing::debug!("feed poller stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.sink.lock().map(|sink| sink.is_none()).unwrap_or(true)
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl FeedPoller {
    pub fn new(fetcher: Arc<dyn FeedFetcher>) -> Self {
        Self {
            fetcher,
            fetch_timeout: None,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Fetch immediately, then every `interval` until the returned handle is
    /// stopped. Every attempt publishes exactly one outcome to `sink`.
    pub fn start(
        &self,
        interval: Duration,
        batch_size: usize,
        sink: UnboundedSender<FetchOutcome>,
    ) -> PollHandle {
        let interval = interval.max(MIN_INTERVAL);
        let sink: SharedSink = Arc::new(Mutex::new(Some(sink)));
        let in_flight = Arc::new(AtomicBool::new(false));
        let fetcher = Arc::clone(&self.fetcher);
        let fetch_timeout = self.fetch_timeout;

        tracing::info!(
            interval_ms = interval.as_millis() as u64,
            batch_size,
            "starting feed poller"
        );

        let task = tokio::spawn({
            let sink = Arc::clone(&sink);
            async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

                loop {
                    ticker.tick().await;
                    if sink.lock().map(|sink| sink.is_none()).unwrap_or(true) {
                        break;
                    }
                    if in_flight.swap(true, Ordering::SeqCst) {
                        tracing::debug!("previous fetch still in flight, skipping tick");
                        continue;
                    }

                    let fetcher = Arc::clone(&fetcher);
                    let sink = Arc::clone(&sink);
                    let in_flight = Arc::clone(&in_flight);

                    tokio::spawn(async move {
                        let result = fetch_once(fetcher.as_ref(), batch_size, fetch_timeout).await;
                        in_flight.store(false, Ordering::SeqCst);

                        let outcome = FetchOutcome::from_result(result);
                        match &outcome {
                            FetchOutcome::Success(snapshot) => {
                                tracing::debug!(count = snapshot.len(), "fetched recent casts")
                            }
                            FetchOutcome::Failure(message) => {
                                tracing::warn!(error = %message, "failed to fetch recent casts")
                            }
                        }

                        publish(&sink, outcome);
                    });
                }
            }
        });

        PollHandle { sink, task }
    }
}

/// Send `outcome` unless the poller was stopped. The lock is held across the
/// send so `stop` cannot return while a publish is underway.
fn publish(sink: &Mutex<Option<UnboundedSender<FetchOutcome>>>, outcome: FetchOutcome) {
    let Ok(mut guard) = sink.lock() else {
        return;
    };
    let delivered = match guard.as_ref() {
        Some(tx) => tx.send(outcome).is_ok(),
        None => {
            tracing::debug!("poller stopped during fetch, discarding result");
            return;
        }
    };
    if !delivered {
        tracing::debug!("feed receiver dropped, stopping poller");
        *guard = None;
    }
}

async fn fetch_once(
    fetcher: &dyn FeedFetcher,
    batch_size: usize,
    fetch_timeout: Option<Duration>,
) -> Result<Vec<FeedItem>, FeedError> {
    match fetch_timeout {
        Some(limit) => tokio::time::timeout(limit, fetcher.fetch_recent(batch_size))
            .await
            .unwrap_or(Err(FeedError::Timeout(limit))),
        None => fetcher.fetch_recent(batch_size).await,
    }
}
