//! Binance WebSocket feed against a local WebSocket server

mod common;

use binance_market_monitor::binance::BinanceWebSocketFeed;
use binance_market_monitor::common::errors::MonitorError;
use binance_market_monitor::common::traits::MarketFeed;
use binance_market_monitor::common::types::{
    CandleInterval, FeedEvent, StreamEnd, Subscription, SubscriptionGroup,
};
use common::{ws_messages, RecordingSink};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Message};
use tokio_tungstenite::accept_async;

fn kline_subscription() -> Subscription {
    let mut group = SubscriptionGroup::new();
    group.insert("ETHUSDT".to_string(), CandleInterval::FiveMinutes);
    Subscription::Klines(group)
}

fn feed(listener: &TcpListener) -> BinanceWebSocketFeed {
    let url = format!("ws://{}", listener.local_addr().unwrap());
    BinanceWebSocketFeed::new(&url, &url)
}

/// Accept one client, send `frames`, then close with "bye"
fn serve_and_close(listener: TcpListener, frames: Vec<&'static str>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        for frame in frames {
            ws.send(Message::Text(frame.to_string())).await.unwrap();
        }
        ws.send(Message::Close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "bye".into(),
        })))
        .await
        .unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    })
}

#[tokio::test]
async fn test_frames_reach_sink_until_server_closes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let feed = feed(&listener);
    let server = serve_and_close(
        listener,
        vec![
            ws_messages::SUBSCRIBE_ACK,
            ws_messages::KLINE,
            "not json",
            ws_messages::TICKER_ARRAY,
        ],
    );

    let sink = Arc::new(RecordingSink::default());
    let mut handle = feed.subscribe(&kline_subscription(), sink.clone()).await.unwrap();

    let end = tokio::time::timeout(Duration::from_secs(5), handle.done())
        .await
        .unwrap();
    assert_eq!(end, StreamEnd::Closed(Some("bye".to_string())));

    let events = sink.events.lock().clone();
    assert_eq!(events.len(), 2);
    match &events[0] {
        FeedEvent::Candle(candle) => {
            assert_eq!(candle.symbol, "ETHUSDT");
            assert_eq!(candle.interval, CandleInterval::FiveMinutes);
            assert_eq!(candle.close, "97.00");
            assert!(candle.is_closed);
        }
        other => panic!("Expected candle, got {:?}", other),
    }
    match &events[1] {
        FeedEvent::MarketStats(stats) => assert_eq!(stats.len(), 2),
        other => panic!("Expected market stats, got {:?}", other),
    }

    // the unparseable frame is reported without ending the stream
    assert_eq!(sink.errors.lock().len(), 1);
    server.await.unwrap();
}

#[tokio::test]
async fn test_stop_closes_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let feed = feed(&listener);
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let mut saw_close = false;
        while let Some(Ok(message)) = ws.next().await {
            if message.is_close() {
                saw_close = true;
            }
        }
        saw_close
    });

    let sink = Arc::new(RecordingSink::default());
    let mut handle = feed
        .subscribe(&Subscription::AllMarketStats, sink)
        .await
        .unwrap();
    handle.stop();

    let end = tokio::time::timeout(Duration::from_secs(5), handle.done())
        .await
        .unwrap();
    assert_eq!(end, StreamEnd::Stopped);
    assert!(server.await.unwrap());
}

#[tokio::test]
async fn test_connect_failure_is_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let feed = feed(&listener);
    drop(listener);

    let sink = Arc::new(RecordingSink::default());
    let result = feed.subscribe(&kline_subscription(), sink).await;
    assert!(matches!(result, Err(MonitorError::WebSocketConnection(_))));
}
