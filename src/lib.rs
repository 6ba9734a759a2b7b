//! Binance Market Monitor Library
//!
//! Watches Binance market data streams, detects unusual price moves and
//! posts alerts to a Telegram channel.

pub mod alert;
pub mod binance;
pub mod common;
pub mod config;
pub mod monitor;
pub mod telegram;

// Re-export commonly used types
pub use alert::{AlertKind, AlertModeConfig, MessageComposer, NotificationGate};
pub use binance::{BinanceRestClient, BinanceWebSocketFeed};
pub use common::errors::{MonitorError, Result};
pub use common::traits::{
    FeedHandle, FeedSink, KlineSource, MarketFeed, Notifier, SymbolSource, TagSource,
};
pub use common::types::{
    CandleEvent, CandleInterval, Direction, FeedEvent, Kline, MarketStatEvent, StreamEnd,
    Subscription, SymbolInfo,
};
pub use config::types::AppConfig;
pub use monitor::{AlertPipeline, MonitorRuntime, StreamSupervisor, UniverseResolver};
pub use telegram::TelegramNotifier;
