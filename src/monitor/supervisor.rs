//! Stream supervisor
//!
//! Owns one worker task per subscription group (plus the statistics worker
//! when enabled). A refresh signal tears every worker down, and the next
//! generation is started from the new universe.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::universe::{SymbolUniverse, UniverseHandle};
use crate::common::channels::RefreshSignal;
use crate::common::traits::{FeedSink, MarketFeed};
use crate::common::types::Subscription;
use crate::config::types::SupervisorConfig;

/// Lifecycle of a single feed worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Connecting,
    Streaming,
    Reconnecting,
    Closing,
}

/// Why a generation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GenerationEnd {
    Refresh(RefreshSignal),
    Shutdown,
}

/// Runs and restarts the feed workers for the current universe
pub struct StreamSupervisor {
    feed: Arc<dyn MarketFeed>,
    sink: Arc<dyn FeedSink>,
    universe: UniverseHandle,
    config: SupervisorConfig,
    market_stats: bool,
}

impl StreamSupervisor {
    pub fn new(
        feed: Arc<dyn MarketFeed>,
        sink: Arc<dyn FeedSink>,
        universe: UniverseHandle,
        config: SupervisorConfig,
    ) -> Self {
        Self {
            feed,
            sink,
            universe,
            config,
            market_stats: false,
        }
    }

    /// Also run a worker on the all-market statistics stream
    pub fn with_market_stats(mut self, enabled: bool) -> Self {
        self.market_stats = enabled;
        self
    }

    /// Subscriptions for one generation
    pub fn subscriptions(&self, universe: &SymbolUniverse) -> Vec<(String, Subscription)> {
        let mut subscriptions: Vec<(String, Subscription)> = universe
            .groups
            .iter()
            .enumerate()
            .map(|(index, group)| {
                (
                    format!("klines-{}", index),
                    Subscription::Klines(group.clone()),
                )
            })
            .collect();
        if self.market_stats {
            subscriptions.push(("market-stats".to_string(), Subscription::AllMarketStats));
        }
        subscriptions
    }

    /// Supervise generations until `shutdown` fires
    pub async fn run(
        &self,
        mut refresh_rx: mpsc::Receiver<RefreshSignal>,
        shutdown: CancellationToken,
    ) {
        let mut refresh_open = true;

        loop {
            let universe = self.universe.current();
            let stop = shutdown.child_token();
            let mut workers = JoinSet::new();

            let subscriptions = self.subscriptions(&universe);
            info!(
                generation = universe.generation,
                workers = subscriptions.len(),
                symbols = universe.symbols.len(),
                "Starting stream generation"
            );

            for (index, (name, subscription)) in subscriptions.into_iter().enumerate() {
                if index > 0 {
                    tokio::select! {
                        _ = sleep(self.config.connect_stagger()) => {}
                        _ = stop.cancelled() => break,
                    }
                }
                workers.spawn(run_worker(
                    name,
                    self.feed.clone(),
                    self.sink.clone(),
                    subscription,
                    stop.clone(),
                    self.config.reconnect_delay(),
                ));
            }

            let end = tokio::select! {
                _ = shutdown.cancelled() => GenerationEnd::Shutdown,
                signal = refresh_rx.recv(), if refresh_open => match signal {
                    Some(signal) => GenerationEnd::Refresh(signal),
                    None => {
                        refresh_open = false;
                        shutdown.cancelled().await;
                        GenerationEnd::Shutdown
                    }
                },
            };

            info!(generation = universe.generation, reason = ?end, "Stopping stream generation");
            stop.cancel();
            self.drain(&mut workers).await;

            match end {
                GenerationEnd::Shutdown => break,
                GenerationEnd::Refresh(signal) => {
                    debug!(next = signal.generation, "Restarting streams for refreshed universe");
                }
            }
        }

        info!("Stream supervisor stopped");
    }

    /// Wait up to the drain delay for workers to close, then abort the rest
    async fn drain(&self, workers: &mut JoinSet<()>) {
        let joined = timeout(self.config.drain_delay(), async {
            while let Some(result) = workers.join_next().await {
                log_worker_exit(result);
            }
        })
        .await;

        if joined.is_err() {
            warn!(remaining = workers.len(), "Workers did not close in time, aborting");
            workers.abort_all();
            while let Some(result) = workers.join_next().await {
                log_worker_exit(result);
            }
        }
    }
}

fn log_worker_exit(result: std::result::Result<(), tokio::task::JoinError>) {
    match result {
        Ok(()) => {}
        Err(e) if e.is_panic() => error!("Feed worker panicked"),
        Err(_) => debug!("Feed worker aborted"),
    }
}

/// Keep one subscription alive until `stop` fires
async fn run_worker(
    name: String,
    feed: Arc<dyn MarketFeed>,
    sink: Arc<dyn FeedSink>,
    subscription: Subscription,
    stop: CancellationToken,
    reconnect_delay: Duration,
) {
    let mut attempt: u64 = 0;

    loop {
        attempt += 1;
        debug!(worker = %name, state = ?WorkerState::Connecting, attempt, "Subscribing");

        let subscribed = tokio::select! {
            result = feed.subscribe(&subscription, sink.clone()) => result,
            _ = stop.cancelled() => break,
        };

        match subscribed {
            Ok(mut handle) => {
                info!(
                    worker = %name,
                    state = ?WorkerState::Streaming,
                    feed = feed.feed_name(),
                    streams = subscription.stream_count(),
                    "Streaming"
                );

                let ended = tokio::select! {
                    end = handle.done() => Some(end),
                    _ = stop.cancelled() => None,
                };

                match ended {
                    Some(end) => {
                        warn!(worker = %name, ?end, "Stream ended, reconnecting");
                    }
                    None => {
                        debug!(worker = %name, state = ?WorkerState::Closing, "Stopping stream");
                        handle.stop();
                        let end = handle.done().await;
                        debug!(worker = %name, ?end, "Stream closed");
                        break;
                    }
                }
            }
            Err(e) => {
                error!(worker = %name, error = %e, "Subscribe failed");
            }
        }

        debug!(
            worker = %name,
            state = ?WorkerState::Reconnecting,
            delay_ms = reconnect_delay.as_millis() as u64,
            "Waiting before reconnect"
        );
        tokio::select! {
            _ = sleep(reconnect_delay) => {}
            _ = stop.cancelled() => break,
        }
    }

    debug!(worker = %name, "Worker exited");
}
