//! Binance-specific wire message types

use serde::{Deserialize, Serialize};

use crate::common::errors::{MonitorError, Result};
use crate::common::types::{CandleEvent, CandleInterval, Kline, MarketStatEvent, SymbolInfo};

/// Envelope used by combined streams (`/stream?streams=a/b/c`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsCombinedMessage<T> {
    pub stream: String,
    pub data: T,
}

/// Candle stream payload (`<symbol>@kline_<interval>`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsKlineEvent {
    #[serde(rename = "e")]
    pub event_type: String,
    #[serde(rename = "E")]
    pub event_time: i64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "k")]
    pub kline: WsKline,
}

/// Candle body inside a [`WsKlineEvent`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsKline {
    #[serde(rename = "t")]
    pub start_time: i64,
    #[serde(rename = "T")]
    pub end_time: i64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "i")]
    pub interval: String,
    #[serde(rename = "o")]
    pub open: String,
    #[serde(rename = "c")]
    pub close: String,
    #[serde(rename = "h")]
    pub high: String,
    #[serde(rename = "l")]
    pub low: String,
    #[serde(rename = "v")]
    pub volume: String,
    #[serde(rename = "x")]
    pub is_final: bool,
}

impl WsKlineEvent {
    /// Convert into the unified candle type
    pub fn into_candle(self) -> Result<CandleEvent> {
        let interval = CandleInterval::from_code(&self.kline.interval).ok_or_else(|| {
            MonitorError::InvalidResponse(format!(
                "Unknown kline interval: {}",
                self.kline.interval
            ))
        })?;
        Ok(CandleEvent {
            symbol: self.symbol,
            interval,
            open: self.kline.open,
            high: self.kline.high,
            low: self.kline.low,
            close: self.kline.close,
            volume: self.kline.volume,
            start_time: self.kline.start_time,
            end_time: self.kline.end_time,
            event_time: self.event_time,
            is_closed: self.kline.is_final,
        })
    }
}

/// 24h rolling statistics entry from the `!ticker@arr` stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMarketStat {
    #[serde(rename = "E")]
    pub event_time: i64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "P")]
    pub price_change_percent: String,
    #[serde(rename = "c")]
    pub last_price: String,
    #[serde(rename = "Q")]
    pub close_qty: String,
    #[serde(rename = "v")]
    pub base_volume: String,
    #[serde(rename = "q")]
    pub quote_volume: String,
}

impl From<WsMarketStat> for MarketStatEvent {
    fn from(stat: WsMarketStat) -> Self {
        MarketStatEvent {
            symbol: stat.symbol,
            last_price: stat.last_price,
            price_change_percent: stat.price_change_percent,
            close_qty: stat.close_qty,
            base_volume: stat.base_volume,
            quote_volume: stat.quote_volume,
            time: stat.event_time,
        }
    }
}

/// Response of `GET /fapi/v1/exchangeInfo` (fields we use)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeInfoResponse {
    pub symbols: Vec<ExchangeSymbol>,
}

/// One symbol listed in the exchange info
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeSymbol {
    pub symbol: String,
    #[serde(default)]
    pub pair: Option<String>,
    #[serde(default)]
    pub contract_type: Option<String>,
    pub status: String,
    pub base_asset: String,
    pub quote_asset: String,
}

impl ExchangeSymbol {
    /// Perpetual contracts, or spot-style entries without a contract type
    pub fn is_perpetual(&self) -> bool {
        self.contract_type
            .as_deref()
            .map_or(true, |kind| kind == "PERPETUAL")
    }
}

impl From<ExchangeSymbol> for SymbolInfo {
    fn from(symbol: ExchangeSymbol) -> Self {
        SymbolInfo {
            trading: symbol.status == "TRADING",
            symbol: symbol.symbol,
            base_asset: symbol.base_asset,
            quote_asset: symbol.quote_asset,
        }
    }
}

/// Envelope of Binance's public `bapi` endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BapiResponse<T> {
    pub code: String,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<serde_json::Value>,
    #[serde(default)]
    pub message_detail: Option<serde_json::Value>,
    pub success: bool,
}

/// Asset entry of the asset listing (fields we use)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BapiAsset {
    pub asset_code: String,
    #[serde(default)]
    pub asset_name: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Parse one row of `GET /fapi/v1/klines`
///
/// Rows are positional arrays:
/// `[openTime, open, high, low, close, volume, closeTime, ...]`.
pub fn parse_kline_row(row: &[serde_json::Value]) -> Result<Kline> {
    if row.len() < 7 {
        return Err(MonitorError::InvalidResponse(format!(
            "Kline row has {} fields, expected at least 7",
            row.len()
        )));
    }

    let int_at = |idx: usize| {
        row[idx].as_i64().ok_or_else(|| {
            MonitorError::InvalidResponse(format!("Kline field {} is not an integer", idx))
        })
    };
    let str_at = |idx: usize| {
        row[idx]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                MonitorError::InvalidResponse(format!("Kline field {} is not a string", idx))
            })
    };

    Ok(Kline {
        open_time: int_at(0)?,
        open: str_at(1)?,
        high: str_at(2)?,
        low: str_at(3)?,
        close: str_at(4)?,
        volume: str_at(5)?,
        close_time: int_at(6)?,
    })
}
