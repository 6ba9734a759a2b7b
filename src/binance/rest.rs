//! REST API client for Binance public endpoints

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

use super::messages::*;
use crate::common::errors::{MonitorError, Result};
use crate::common::traits::{KlineSource, SymbolSource, TagSource};
use crate::common::types::{CandleInterval, Kline, SymbolInfo, SymbolTags};
use crate::config::types::BinanceConfig;

/// REST API client for Binance
#[derive(Debug, Clone)]
pub struct BinanceRestClient {
    /// HTTP client
    client: Client,
    /// Base URL for the USD-M futures API
    futures_url: String,
    /// Full URL of the asset listing
    tags_url: String,
}

impl BinanceRestClient {
    /// Create a new REST client
    pub fn new(futures_url: &str, tags_url: &str) -> Result<Self> {
        Self::with_timeout(futures_url, tags_url, Duration::from_secs(30))
    }

    /// Create a new REST client with custom timeout
    pub fn with_timeout(futures_url: &str, tags_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MonitorError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            futures_url: futures_url.trim_end_matches('/').to_string(),
            tags_url: tags_url.to_string(),
        })
    }

    /// Create a REST client from configuration
    pub fn from_config(config: &BinanceConfig) -> Result<Self> {
        Self::with_timeout(
            &config.futures_rest_url,
            &config.tags_url,
            config.request_timeout(),
        )
    }

    /// Get exchange info
    #[instrument(skip(self))]
    pub async fn get_exchange_info(&self) -> Result<ExchangeInfoResponse> {
        let url = format!("{}/fapi/v1/exchangeInfo", self.futures_url);
        debug!("Fetching exchange info from: {}", url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MonitorError::InvalidResponse(format!(
                "Server returned status {}: {}",
                status, body
            )));
        }

        let info: ExchangeInfoResponse = response.json().await?;
        Ok(info)
    }

    /// Get the asset listing
    #[instrument(skip(self))]
    pub async fn get_assets(&self) -> Result<Vec<BapiAsset>> {
        debug!("Fetching asset listing from: {}", self.tags_url);

        let response = self.client.get(&self.tags_url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MonitorError::InvalidResponse(format!(
                "Asset listing returned status {}: {}",
                status, body
            )));
        }

        let listing: BapiResponse<Vec<BapiAsset>> = response.json().await?;
        if !listing.success {
            return Err(MonitorError::InvalidResponse(format!(
                "Asset listing failed with code {}: {:?}",
                listing.code, listing.message
            )));
        }

        listing
            .data
            .ok_or_else(|| MonitorError::InvalidResponse("Asset listing has no data".to_string()))
    }

    /// Get the most recent candles for a symbol
    #[instrument(skip(self))]
    pub async fn get_klines(
        &self,
        symbol: &str,
        interval: CandleInterval,
        limit: u16,
    ) -> Result<Vec<Kline>> {
        let url = format!(
            "{}/fapi/v1/klines?symbol={}&interval={}&limit={}",
            self.futures_url, symbol, interval, limit
        );
        debug!("Fetching klines from: {}", url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MonitorError::InvalidResponse(format!(
                "Server returned status {}: {}",
                status, body
            )));
        }

        let rows: Vec<Vec<serde_json::Value>> = response.json().await?;
        rows.iter().map(|row| parse_kline_row(row)).collect()
    }
}

#[async_trait]
impl SymbolSource for BinanceRestClient {
    async fn fetch_symbols(&self) -> Result<Vec<SymbolInfo>> {
        let info = self.get_exchange_info().await?;
        Ok(info
            .symbols
            .into_iter()
            .filter(ExchangeSymbol::is_perpetual)
            .map(SymbolInfo::from)
            .collect())
    }
}

#[async_trait]
impl TagSource for BinanceRestClient {
    async fn fetch_tags(&self) -> Result<SymbolTags> {
        let assets = self.get_assets().await?;
        Ok(assets
            .into_iter()
            .map(|asset| (asset.asset_code, asset.tags.unwrap_or_default()))
            .collect())
    }
}

#[async_trait]
impl KlineSource for BinanceRestClient {
    async fn fetch_klines(
        &self,
        symbol: &str,
        interval: CandleInterval,
        limit: u16,
    ) -> Result<Vec<Kline>> {
        self.get_klines(symbol, interval, limit).await
    }
}
