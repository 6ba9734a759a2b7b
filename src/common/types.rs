//! Unified types shared by the feed adapters and the alert pipeline

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::numeric::signal_value;

/// Candle interval as named by the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CandleInterval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "3m")]
    ThreeMinutes,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
}

impl CandleInterval {
    /// Exchange code for the interval (`5m`, `15m`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            CandleInterval::OneMinute => "1m",
            CandleInterval::ThreeMinutes => "3m",
            CandleInterval::FiveMinutes => "5m",
            CandleInterval::FifteenMinutes => "15m",
            CandleInterval::ThirtyMinutes => "30m",
            CandleInterval::OneHour => "1h",
            CandleInterval::FourHours => "4h",
            CandleInterval::OneDay => "1d",
        }
    }

    /// Human-readable label used in alert text
    pub fn label(&self) -> &'static str {
        match self {
            CandleInterval::OneMinute => "1 minute",
            CandleInterval::ThreeMinutes => "3 minute",
            CandleInterval::FiveMinutes => "5 minute",
            CandleInterval::FifteenMinutes => "15 minute",
            CandleInterval::ThirtyMinutes => "30 minute",
            CandleInterval::OneHour => "1 hour",
            CandleInterval::FourHours => "4 hour",
            CandleInterval::OneDay => "1 day",
        }
    }

    /// Parse an exchange interval code
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "1m" => Some(CandleInterval::OneMinute),
            "3m" => Some(CandleInterval::ThreeMinutes),
            "5m" => Some(CandleInterval::FiveMinutes),
            "15m" => Some(CandleInterval::FifteenMinutes),
            "30m" => Some(CandleInterval::ThirtyMinutes),
            "1h" => Some(CandleInterval::OneHour),
            "4h" => Some(CandleInterval::FourHours),
            "1d" => Some(CandleInterval::OneDay),
            _ => None,
        }
    }
}

impl std::fmt::Display for CandleInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a price move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Strictly positive deltas are up, everything else is down
    pub fn of(delta: f64) -> Self {
        if delta > 0.0 {
            Direction::Up
        } else {
            Direction::Down
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            Direction::Up => "🔺",
            Direction::Down => "🔻",
        }
    }
}

/// One closed or in-progress candle for a symbol/interval
///
/// Prices stay as the exchange's decimal strings; use [`CandleEvent::open_value`]
/// and [`CandleEvent::close_value`] for comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleEvent {
    pub symbol: String,
    pub interval: CandleInterval,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
    /// Candle start time (ms since epoch)
    pub start_time: i64,
    /// Candle end time (ms since epoch)
    pub end_time: i64,
    /// Event timestamp (ms since epoch)
    pub event_time: i64,
    /// Whether the candle has closed
    pub is_closed: bool,
}

impl CandleEvent {
    pub fn open_value(&self) -> f64 {
        signal_value("open", &self.open)
    }

    pub fn close_value(&self) -> f64 {
        signal_value("close", &self.close)
    }
}

/// 24h rolling statistics for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStatEvent {
    pub symbol: String,
    pub last_price: String,
    pub price_change_percent: String,
    /// Quantity traded at the last price
    pub close_qty: String,
    pub base_volume: String,
    pub quote_volume: String,
    /// Event timestamp (ms since epoch)
    pub time: i64,
}

impl MarketStatEvent {
    pub fn last_price_value(&self) -> f64 {
        signal_value("last_price", &self.last_price)
    }

    pub fn price_change_percent_value(&self) -> f64 {
        signal_value("price_change_percent", &self.price_change_percent)
    }

    pub fn close_qty_value(&self) -> f64 {
        signal_value("close_qty", &self.close_qty)
    }
}

/// Historical candle returned by the REST API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    pub open_time: i64,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
    pub close_time: i64,
}

impl Kline {
    pub fn open_value(&self) -> f64 {
        signal_value("open", &self.open)
    }

    pub fn close_value(&self) -> f64 {
        signal_value("close", &self.close)
    }
}

/// Tradable symbol as listed by the exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub trading: bool,
}

/// Base asset code → classification tags
pub type SymbolTags = HashMap<String, Vec<String>>;

/// Symbols (and their interval) served by one feed connection
pub type SubscriptionGroup = BTreeMap<String, CandleInterval>;

/// What a feed connection subscribes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subscription {
    /// Candle streams for one connection group
    Klines(SubscriptionGroup),
    /// The all-market 24h statistics stream
    AllMarketStats,
}

impl Subscription {
    /// Number of streams carried by this subscription
    pub fn stream_count(&self) -> usize {
        match self {
            Subscription::Klines(group) => group.len(),
            Subscription::AllMarketStats => 1,
        }
    }
}

/// Typed event delivered by a feed
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Candle(CandleEvent),
    MarketStats(Vec<MarketStatEvent>),
}

/// Why a feed connection finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// Stopped through its stop-signal
    Stopped,
    /// Closed by the remote side (with optional reason)
    Closed(Option<String>),
    /// Terminated by a transport or protocol error
    Failed(String),
}

/// Convert exchange milliseconds to a UTC timestamp
pub fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_default()
}
