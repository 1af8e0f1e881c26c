//! Periodic metrics refresh for every known function.

use crate::{ConsoleStore, FunctionBackend};
use chrono::Utc;
use fncore::ConsoleEvent;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outcome counts of one poll tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Metrics requests issued, one per cached function
    pub requested: usize,
    /// Histories replaced with a fresh snapshot
    pub refreshed: usize,
    /// Requests that failed; their histories were left as they were
    pub failed: usize,
    /// Successful fetches dropped because the function vanished or polling stopped
    pub discarded: usize,
}

/// Fetches metrics for every cached function on a fixed interval.
pub struct MetricsPoller {
    backend: Arc<dyn FunctionBackend>,
    store: Arc<ConsoleStore>,
    interval: Duration,
}

impl MetricsPoller {
    pub fn new(backend: Arc<dyn FunctionBackend>, store: Arc<ConsoleStore>, interval: Duration) -> Self {
        Self { backend, store, interval }
    }

    /// Run a single tick outside of any schedule.
    pub async fn poll_once(&self) -> TickReport {
        self.tick(&CancellationToken::new()).await
    }

    /// Spawn the polling loop. The first tick fires immediately.
    ///
    /// Polling lasts as long as the returned handle: stopping or dropping it
    /// cancels the timer and any fetch still in flight.
    pub fn start(self) -> PollerHandle {
        let token = CancellationToken::new();
        let child = token.clone();
        let join = tokio::spawn(async move { self.run(child).await });

        PollerHandle { token, join: Some(join) }
    }

    async fn run(self, token: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Metrics poller started ({}s interval)", self.interval.as_secs_f64());

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {}
            }

            tokio::select! {
                _ = token.cancelled() => break,
                report = self.tick(&token) => {
                    debug!(
                        requested = report.requested,
                        refreshed = report.refreshed,
                        failed = report.failed,
                        "Metrics tick finished"
                    );
                }
            }
        }

        info!("Metrics poller cancelled");
    }

    async fn tick(&self, token: &CancellationToken) -> TickReport {
        let ids = self.store.read().await.function_ids();
        let mut report = TickReport { requested: ids.len(), ..TickReport::default() };

        // Fetches are polled in place rather than spawned so that dropping
        // the tick drops every request still in flight.
        let mut running: FuturesUnordered<_> = ids
            .into_iter()
            .map(|function_id| {
                let backend = self.backend.clone();
                async move { (function_id, backend.function_metrics(function_id).await) }
            })
            .collect();

        while let Some((function_id, outcome)) = running.next().await {
            match outcome {
                Ok(samples) => {
                    let event = ConsoleEvent::MetricsRefreshed {
                        function_id,
                        samples,
                        timestamp: Utc::now(),
                    };
                    if self.store.dispatch_unless_cancelled(event, token).await {
                        report.refreshed += 1;
                    } else {
                        report.discarded += 1;
                    }
                }
                Err(e) => {
                    warn!(function_id, "Metrics fetch failed: {}", e);
                    report.failed += 1;

                    let event = ConsoleEvent::MetricsFetchFailed {
                        function_id,
                        error: e,
                        timestamp: Utc::now(),
                    };
                    self.store.dispatch_unless_cancelled(event, token).await;
                }
            }
        }

        report
    }
}

/// Scope handle of a running poller
pub struct PollerHandle {
    token: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Request cancellation without waiting for the loop to exit.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancel and wait for the loop to exit. No state is written after this returns.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                warn!("Metrics poller task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
