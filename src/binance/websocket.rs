//! WebSocket feed for Binance candle and 24h statistics streams

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::{interval_at, Instant};
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::messages::*;
use crate::common::errors::{MonitorError, Result};
use crate::common::traits::{FeedHandle, FeedSink, MarketFeed};
use crate::common::types::{FeedEvent, MarketStatEvent, StreamEnd, Subscription};
use crate::config::types::BinanceConfig;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const MIN_KEEPALIVE: Duration = Duration::from_secs(1);

/// WebSocket feed for Binance market streams
#[derive(Debug, Clone)]
pub struct BinanceWebSocketFeed {
    /// Futures stream base URL (candles)
    futures_url: String,
    /// Spot stream base URL (24h statistics)
    spot_url: String,
    /// Keepalive ping interval
    keepalive_interval: Duration,
}

impl BinanceWebSocketFeed {
    /// Create a new feed
    pub fn new(futures_url: &str, spot_url: &str) -> Self {
        Self {
            futures_url: futures_url.trim_end_matches('/').to_string(),
            spot_url: spot_url.trim_end_matches('/').to_string(),
            keepalive_interval: Duration::from_secs(30),
        }
    }

    /// Create a feed from configuration
    pub fn from_config(config: &BinanceConfig) -> Self {
        Self::new(&config.futures_ws_url, &config.spot_ws_url)
            .with_keepalive_interval(config.keepalive_interval())
    }

    /// Set the keepalive ping interval
    pub fn with_keepalive_interval(mut self, keepalive: Duration) -> Self {
        self.keepalive_interval = keepalive.max(MIN_KEEPALIVE);
        self
    }

    /// Build the stream URL for a subscription
    pub fn stream_url(&self, subscription: &Subscription) -> Result<String> {
        match subscription {
            Subscription::Klines(group) => {
                if group.is_empty() {
                    return Err(MonitorError::Configuration(
                        "Cannot subscribe to an empty symbol group".to_string(),
                    ));
                }
                let streams = group
                    .iter()
                    .map(|(symbol, interval)| {
                        format!("{}@kline_{}", symbol.to_lowercase(), interval)
                    })
                    .collect::<Vec<_>>()
                    .join("/");
                Ok(format!("{}/stream?streams={}", self.futures_url, streams))
            }
            Subscription::AllMarketStats => Ok(format!("{}/ws/!ticker@arr", self.spot_url)),
        }
    }

    /// Parse an incoming text frame into a feed event
    ///
    /// Returns `Ok(None)` for frames that carry no market data
    /// (subscription acks and the like).
    pub fn parse_message(text: &str) -> Result<Option<FeedEvent>> {
        let value: serde_json::Value = serde_json::from_str(text)?;

        let payload = if value.get("stream").is_some() && value.get("data").is_some() {
            serde_json::from_value::<WsCombinedMessage<serde_json::Value>>(value)?.data
        } else {
            value
        };

        if payload.is_array() {
            let stats: Vec<WsMarketStat> = serde_json::from_value(payload)?;
            return Ok(Some(FeedEvent::MarketStats(
                stats.into_iter().map(MarketStatEvent::from).collect(),
            )));
        }

        match payload.get("e").and_then(|v| v.as_str()) {
            Some("kline") => {
                let event: WsKlineEvent = serde_json::from_value(payload)?;
                Ok(Some(FeedEvent::Candle(event.into_candle()?)))
            }
            Some("24hrTicker") => {
                let stat: WsMarketStat = serde_json::from_value(payload)?;
                Ok(Some(FeedEvent::MarketStats(vec![stat.into()])))
            }
            _ => Ok(None),
        }
    }

    /// Drive one connection until it stops, closes, or fails
    async fn run_connection(
        ws_stream: WsStream,
        sink: Arc<dyn FeedSink>,
        stop: CancellationToken,
        keepalive: Duration,
    ) -> StreamEnd {
        let (mut write, mut read) = ws_stream.split();
        let mut ping_interval = interval_at(Instant::now() + keepalive, keepalive);

        loop {
            tokio::select! {
                _ = stop.cancelled() => {
                    debug!("Stop requested, closing WebSocket");
                    let _ = write.send(Message::Close(None)).await;
                    return StreamEnd::Stopped;
                }
                _ = ping_interval.tick() => {
                    if let Err(e) = write.send(Message::Ping(Vec::new())).await {
                        let err = MonitorError::from(e);
                        sink.on_error(&err);
                        return StreamEnd::Failed(err.to_string());
                    }
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => match Self::parse_message(&text) {
                            Ok(Some(event)) => sink.on_event(event).await,
                            Ok(None) => debug!("Ignoring non-data message: {}", text),
                            Err(e) => {
                                warn!("Failed to parse message: {} - {}", e, text);
                                sink.on_error(&e);
                            }
                        },
                        Some(Ok(Message::Ping(_))) => {
                            // Pong is sent automatically by tungstenite
                            debug!("Received Ping");
                        }
                        Some(Ok(Message::Pong(_))) => {
                            debug!("Received Pong");
                        }
                        Some(Ok(Message::Close(frame))) => {
                            info!("WebSocket closed: {:?}", frame);
                            return StreamEnd::Closed(frame.map(|f| f.reason.to_string()));
                        }
                        Some(Err(e)) => {
                            let err = MonitorError::from(e);
                            sink.on_error(&err);
                            return StreamEnd::Failed(err.to_string());
                        }
                        None => {
                            info!("WebSocket stream ended");
                            return StreamEnd::Closed(None);
                        }
                        _ => {}
                    }
                }
            }
        }
    }
}

#[async_trait]
impl MarketFeed for BinanceWebSocketFeed {
    #[instrument(skip(self, sink), fields(streams = subscription.stream_count()))]
    async fn subscribe(
        &self,
        subscription: &Subscription,
        sink: Arc<dyn FeedSink>,
    ) -> Result<FeedHandle> {
        let url = self.stream_url(subscription)?;
        info!("Connecting to Binance WebSocket");

        let (ws_stream, _response) = connect_async(&url)
            .await
            .map_err(|e| MonitorError::WebSocketConnection(e.to_string()))?;

        info!("WebSocket connection established");

        let (done_tx, done_rx) = oneshot::channel();
        let stop = CancellationToken::new();
        let stop_task = stop.clone();
        let keepalive = self.keepalive_interval;

        tokio::spawn(async move {
            let end = Self::run_connection(ws_stream, sink, stop_task, keepalive).await;
            let _ = done_tx.send(end);
        });

        Ok(FeedHandle::new(done_rx, stop))
    }

    fn feed_name(&self) -> &'static str {
        "Binance"
    }
}
