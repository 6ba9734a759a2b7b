//! Common test utilities and fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use binance_market_monitor::common::errors::{MonitorError, Result};
use binance_market_monitor::common::traits::{
    FeedHandle, FeedSink, KlineSource, MarketFeed, Notifier, SymbolSource, TagSource,
};
use binance_market_monitor::common::types::{
    CandleEvent, CandleInterval, FeedEvent, Kline, MarketStatEvent, StreamEnd, Subscription,
    SymbolInfo, SymbolTags,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

pub const CHANNEL: &str = "@market_alerts";
pub const TRADE_URL: &str = "https://www.binance.com/en/trade";

/// Create a sample candle event
pub fn sample_candle(
    symbol: &str,
    interval: CandleInterval,
    open: &str,
    close: &str,
) -> CandleEvent {
    CandleEvent {
        symbol: symbol.to_string(),
        interval,
        open: open.to_string(),
        high: open.to_string(),
        low: close.to_string(),
        close: close.to_string(),
        volume: "1500".to_string(),
        start_time: 1_700_000_100_000,
        end_time: 1_700_000_399_999,
        event_time: 1_700_000_400_000,
        is_closed: true,
    }
}

/// Create a sample 24h statistics event
pub fn sample_stat(symbol: &str, price: &str, pct: &str, time: i64) -> MarketStatEvent {
    MarketStatEvent {
        symbol: symbol.to_string(),
        last_price: price.to_string(),
        price_change_percent: pct.to_string(),
        close_qty: "1.5".to_string(),
        base_volume: "250000".to_string(),
        quote_volume: "125000".to_string(),
        time,
    }
}

/// Create a closed 5 minute kline at position `index`
pub fn sample_kline(index: i64, open: f64, close: f64) -> Kline {
    Kline {
        open_time: index * 300_000,
        open: open.to_string(),
        high: open.max(close).to_string(),
        low: open.min(close).to_string(),
        close: close.to_string(),
        volume: "10".to_string(),
        close_time: (index + 1) * 300_000 - 1,
    }
}

/// Create a tradable symbol listing
pub fn symbol_info(symbol: &str, base: &str, quote: &str) -> SymbolInfo {
    SymbolInfo {
        symbol: symbol.to_string(),
        base_asset: base.to_string(),
        quote_asset: quote.to_string(),
        trading: true,
    }
}

/// Notifier that records every message
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let notifier = Self::default();
        notifier.fail.store(true, Ordering::SeqCst);
        Arc::new(notifier)
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.messages.lock().iter().map(|(_, text)| text.clone()).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, channel: &str, text: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MonitorError::Notification("channel unavailable".to_string()));
        }
        self.messages.lock().push((channel.to_string(), text.to_string()));
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "Recording"
    }
}

/// Symbol source returning a configurable listing
#[derive(Default)]
pub struct ScriptedSymbols {
    symbols: Mutex<Vec<SymbolInfo>>,
    fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl ScriptedSymbols {
    pub fn new(symbols: Vec<SymbolInfo>) -> Arc<Self> {
        Arc::new(Self {
            symbols: Mutex::new(symbols),
            ..Self::default()
        })
    }

    pub fn set(&self, symbols: Vec<SymbolInfo>) {
        *self.symbols.lock() = symbols;
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SymbolSource for ScriptedSymbols {
    async fn fetch_symbols(&self) -> Result<Vec<SymbolInfo>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(MonitorError::InvalidResponse("exchange info unavailable".to_string()));
        }
        Ok(self.symbols.lock().clone())
    }
}

/// Tag source returning a configurable lookup
#[derive(Default)]
pub struct ScriptedTags {
    tags: Mutex<SymbolTags>,
    fail: AtomicBool,
}

impl ScriptedTags {
    /// `pairs` maps an asset code to its comma-separated tags
    pub fn new(pairs: &[(&str, &str)]) -> Arc<Self> {
        let tags = Self::default();
        tags.set(pairs);
        Arc::new(tags)
    }

    pub fn set(&self, pairs: &[(&str, &str)]) {
        *self.tags.lock() = pairs
            .iter()
            .map(|(asset, tags)| {
                (
                    asset.to_string(),
                    tags.split(',').map(|tag| tag.trim().to_string()).collect(),
                )
            })
            .collect();
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TagSource for ScriptedTags {
    async fn fetch_tags(&self) -> Result<SymbolTags> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MonitorError::InvalidResponse("asset listing unavailable".to_string()));
        }
        Ok(self.tags.lock().clone())
    }
}

/// Kline source with per-symbol candles and failures
#[derive(Default)]
pub struct ScriptedKlines {
    klines: Mutex<HashMap<String, Vec<Kline>>>,
    failing: Mutex<HashSet<String>>,
    pub requests: Mutex<Vec<(String, CandleInterval, u16)>>,
}

impl ScriptedKlines {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, symbol: &str, klines: Vec<Kline>) {
        self.klines.lock().insert(symbol.to_string(), klines);
    }

    pub fn fail_for(&self, symbol: &str) {
        self.failing.lock().insert(symbol.to_string());
    }
}

#[async_trait]
impl KlineSource for ScriptedKlines {
    async fn fetch_klines(
        &self,
        symbol: &str,
        interval: CandleInterval,
        limit: u16,
    ) -> Result<Vec<Kline>> {
        self.requests.lock().push((symbol.to_string(), interval, limit));
        if self.failing.lock().contains(symbol) {
            return Err(MonitorError::InvalidResponse(format!("no klines for {}", symbol)));
        }
        Ok(self.klines.lock().get(symbol).cloned().unwrap_or_default())
    }
}

/// One connection opened through [`ScriptedFeed`]
#[derive(Clone)]
pub struct FeedConnection {
    pub subscription: Subscription,
    pub stop: CancellationToken,
    remote_close: CancellationToken,
    sink: Arc<dyn FeedSink>,
}

impl FeedConnection {
    /// Simulate the server closing the connection
    pub fn close(&self) {
        self.remote_close.cancel();
    }

    /// Push an event into the sink as the feed would
    pub async fn push(&self, event: FeedEvent) {
        self.sink.on_event(event).await;
    }

    pub fn is_open(&self) -> bool {
        !self.stop.is_cancelled() && !self.remote_close.is_cancelled()
    }
}

/// Feed that records subscriptions and lets tests end connections
#[derive(Default)]
pub struct ScriptedFeed {
    connections: Mutex<Vec<FeedConnection>>,
    failures_left: AtomicUsize,
    pub attempts: AtomicUsize,
}

impl ScriptedFeed {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next `count` subscribe calls fail
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn connections(&self) -> Vec<FeedConnection> {
        self.connections.lock().clone()
    }

    pub fn open_connections(&self) -> Vec<FeedConnection> {
        self.connections().into_iter().filter(FeedConnection::is_open).collect()
    }
}

#[async_trait]
impl MarketFeed for ScriptedFeed {
    async fn subscribe(
        &self,
        subscription: &Subscription,
        sink: Arc<dyn FeedSink>,
    ) -> Result<FeedHandle> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(MonitorError::WebSocketConnection("connection refused".to_string()));
        }

        let (done_tx, done_rx) = oneshot::channel();
        let stop = CancellationToken::new();
        let remote_close = CancellationToken::new();

        let stop_task = stop.clone();
        let close_task = remote_close.clone();
        tokio::spawn(async move {
            let end = tokio::select! {
                _ = stop_task.cancelled() => StreamEnd::Stopped,
                _ = close_task.cancelled() => StreamEnd::Closed(Some("server restart".to_string())),
            };
            let _ = done_tx.send(end);
        });

        self.connections.lock().push(FeedConnection {
            subscription: subscription.clone(),
            stop: stop.clone(),
            remote_close,
            sink,
        });
        Ok(FeedHandle::new(done_rx, stop))
    }

    fn feed_name(&self) -> &'static str {
        "Scripted"
    }
}

/// Sink that records events
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<FeedEvent>>,
    pub errors: Mutex<Vec<String>>,
}

#[async_trait]
impl FeedSink for RecordingSink {
    async fn on_event(&self, event: FeedEvent) {
        self.events.lock().push(event);
    }

    fn on_error(&self, error: &MonitorError) {
        self.errors.lock().push(error.to_string());
    }
}

/// Sample WebSocket messages for testing parsing
pub mod ws_messages {
    /// Combined-stream candle frame
    pub const KLINE: &str = concat!(
        r#"{"stream":"ethusdt@kline_5m","data":{"e":"kline","E":1700000400000,"s":"ETHUSDT","#,
        r#""k":{"t":1700000100000,"T":1700000399999,"s":"ETHUSDT","i":"5m","o":"100.00","#,
        r#""c":"97.00","h":"100.50","l":"96.80","v":"1500","x":true}}}"#,
    );

    /// All-market statistics frame
    pub const TICKER_ARRAY: &str = concat!(
        r#"[{"e":"24hrTicker","E":1700000000000,"s":"BTCUSDT","P":"1.50","c":"50000.00","#,
        r#""Q":"0.01","v":"1000","q":"50000000"},"#,
        r#"{"e":"24hrTicker","E":1700000000000,"s":"XUSDT","P":"-2.00","c":"0.50","#,
        r#""Q":"100","v":"9000","q":"4500"}]"#,
    );

    /// Frame without market data
    pub const SUBSCRIBE_ACK: &str = r#"{"result":null,"id":1}"#;
}
