//! Trait definitions for the external capabilities the monitor depends on

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use super::errors::{MonitorError, Result};
use super::types::{
    CandleInterval, FeedEvent, Kline, StreamEnd, Subscription, SymbolInfo, SymbolTags,
};

/// Live market-data feed
///
/// A successful `subscribe` spawns the connection in the background and
/// returns a [`FeedHandle`]. Events are pushed into the sink in arrival
/// order; the next event is not read until the sink returns.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// Open a connection for the given subscription
    async fn subscribe(
        &self,
        subscription: &Subscription,
        sink: Arc<dyn FeedSink>,
    ) -> Result<FeedHandle>;

    /// Name of the feed, for logging
    fn feed_name(&self) -> &'static str;
}

/// Receiver of feed events
#[async_trait]
pub trait FeedSink: Send + Sync {
    /// Handle one inbound event
    async fn on_event(&self, event: FeedEvent);

    /// Called when the feed hits an error; the connection may be unusable
    fn on_error(&self, error: &MonitorError);
}

/// Done/stop signal pair for a running feed connection
#[derive(Debug)]
pub struct FeedHandle {
    done: oneshot::Receiver<StreamEnd>,
    stop: CancellationToken,
}

impl FeedHandle {
    pub fn new(done: oneshot::Receiver<StreamEnd>, stop: CancellationToken) -> Self {
        Self { done, stop }
    }

    /// Ask the connection to close
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Wait for the connection to finish
    ///
    /// A connection task that went away without reporting counts as failed.
    pub async fn done(&mut self) -> StreamEnd {
        match (&mut self.done).await {
            Ok(end) => end,
            Err(_) => StreamEnd::Failed("feed task dropped without reporting".to_string()),
        }
    }
}

/// Source of the exchange's tradable symbols
#[async_trait]
pub trait SymbolSource: Send + Sync {
    async fn fetch_symbols(&self) -> Result<Vec<SymbolInfo>>;
}

/// Source of the asset → tags lookup
#[async_trait]
pub trait TagSource: Send + Sync {
    async fn fetch_tags(&self) -> Result<SymbolTags>;
}

/// Source of historical candles
#[async_trait]
pub trait KlineSource: Send + Sync {
    /// Most recent `limit` candles for a symbol, oldest first
    async fn fetch_klines(
        &self,
        symbol: &str,
        interval: CandleInterval,
        limit: u16,
    ) -> Result<Vec<Kline>>;
}

/// Outbound notification channel
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a text message to a channel
    async fn send(&self, channel: &str, text: &str) -> Result<()>;

    /// Name of the notifier, for logging
    fn notifier_name(&self) -> &'static str;
}
