//! Configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::alert::types::AlertModeConfig;
use crate::common::errors::{MonitorError, Result};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// General monitor settings
    #[serde(default)]
    pub monitor: MonitorSettings,
    /// Binance endpoints
    #[serde(default)]
    pub binance: BinanceConfig,
    /// Telegram delivery
    #[serde(default)]
    pub telegram: TelegramConfig,
    /// Symbol universe partitioning
    #[serde(default)]
    pub universe: UniverseConfig,
    /// Stream supervisor timing
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    /// Alert modes
    #[serde(default)]
    pub alerts: AlertsConfig,
}

impl AppConfig {
    /// Check the settings that have no usable default
    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.as_deref().map_or(true, str::is_empty) {
            return Err(MonitorError::Configuration(
                "TELEGRAM_BOT_TOKEN is required".to_string(),
            ));
        }
        if self.telegram.channel().is_none() {
            return Err(MonitorError::Configuration(
                "TELEGRAM_CHANNEL_USERNAME is required".to_string(),
            ));
        }
        if self.monitor.quote_asset.trim().is_empty() {
            return Err(MonitorError::Configuration(
                "quote asset must not be empty".to_string(),
            ));
        }
        if self.universe.group_count == 0 {
            return Err(MonitorError::Configuration(
                "universe.group_count must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("binance.futures_rest_url", &self.binance.futures_rest_url),
            ("binance.futures_ws_url", &self.binance.futures_ws_url),
            ("binance.spot_ws_url", &self.binance.spot_ws_url),
            ("binance.tags_url", &self.binance.tags_url),
            ("binance.trade_url", &self.binance.trade_url),
            ("telegram.api_url", &self.telegram.api_url),
        ] {
            Url::parse(value).map_err(|e| {
                MonitorError::Configuration(format!("{} is not a valid URL: {}", name, e))
            })?;
        }
        if let Some(sweep) = &self.alerts.momentum.sweep {
            if sweep.group_size == 0 || sweep.lookback < 3 {
                return Err(MonitorError::Configuration(
                    "momentum sweep needs group_size >= 1 and lookback >= 3".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Quote asset in exchange casing
    pub fn quote_asset(&self) -> String {
        self.monitor.quote_asset.trim().to_uppercase()
    }
}

/// Deployment environment, selects log format and verbosity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    #[serde(alias = "prod")]
    Production,
    #[default]
    #[serde(alias = "dev")]
    Development,
}

impl AppEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, AppEnvironment::Production)
    }
}

/// General monitor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Quote asset symbols must be priced in
    #[serde(default = "default_quote_asset")]
    pub quote_asset: String,
    /// Production or development
    #[serde(default)]
    pub environment: AppEnvironment,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            quote_asset: default_quote_asset(),
            environment: AppEnvironment::default(),
        }
    }
}

fn default_quote_asset() -> String {
    "USDT".to_string()
}

/// Binance endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinanceConfig {
    /// USD-M futures REST API
    #[serde(default = "default_futures_rest_url")]
    pub futures_rest_url: String,
    /// USD-M futures websocket streams (candles)
    #[serde(default = "default_futures_ws_url")]
    pub futures_ws_url: String,
    /// Spot websocket streams (24h statistics)
    #[serde(default = "default_spot_ws_url")]
    pub spot_ws_url: String,
    /// Public asset listing with tags
    #[serde(default = "default_tags_url")]
    pub tags_url: String,
    /// Trade page used for deep links
    #[serde(default = "default_trade_url")]
    pub trade_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Websocket keepalive ping interval in seconds
    #[serde(default = "default_keepalive_interval")]
    pub keepalive_interval_seconds: u64,
}

impl BinanceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_seconds)
    }
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            futures_rest_url: default_futures_rest_url(),
            futures_ws_url: default_futures_ws_url(),
            spot_ws_url: default_spot_ws_url(),
            tags_url: default_tags_url(),
            trade_url: default_trade_url(),
            request_timeout_seconds: default_request_timeout(),
            keepalive_interval_seconds: default_keepalive_interval(),
        }
    }
}

fn default_futures_rest_url() -> String {
    "https://fapi.binance.com".to_string()
}

fn default_futures_ws_url() -> String {
    "wss://fstream.binance.com".to_string()
}

fn default_spot_ws_url() -> String {
    "wss://stream.binance.com:9443".to_string()
}

fn default_tags_url() -> String {
    "https://www.binance.com/bapi/asset/v2/public/asset/asset/get-all-asset".to_string()
}

fn default_trade_url() -> String {
    "https://www.binance.com/en/trade".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_keepalive_interval() -> u64 {
    30
}

/// Telegram delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token
    #[serde(default)]
    pub bot_token: Option<String>,
    /// Target channel username, with or without the leading `@`
    #[serde(default)]
    pub channel_username: Option<String>,
    /// Bot API base URL
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,
}

impl TelegramConfig {
    /// Channel handle normalized to start with `@`
    pub fn channel(&self) -> Option<String> {
        let raw = self.channel_username.as_deref()?.trim();
        if raw.is_empty() || raw == "@" {
            return None;
        }
        if raw.starts_with('@') {
            Some(raw.to_string())
        } else {
            Some(format!("@{}", raw))
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            channel_username: None,
            api_url: default_telegram_api_url(),
        }
    }
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

/// Symbol universe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniverseConfig {
    /// Number of feed connections symbols are spread across
    #[serde(default = "default_group_count")]
    pub group_count: usize,
    /// Time between universe refreshes in seconds
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,
}

impl UniverseConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds)
    }
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            group_count: default_group_count(),
            refresh_interval_seconds: default_refresh_interval(),
        }
    }
}

fn default_group_count() -> usize {
    3
}

fn default_refresh_interval() -> u64 {
    4 * 60 * 60
}

/// Stream supervisor timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Delay before re-subscribing after a disconnect, in milliseconds
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
    /// Time workers get to close during a refresh, in milliseconds
    #[serde(default = "default_drain_delay")]
    pub drain_delay_ms: u64,
    /// Pause between starting consecutive workers, in milliseconds
    #[serde(default = "default_connect_stagger")]
    pub connect_stagger_ms: u64,
}

impl SupervisorConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn drain_delay(&self) -> Duration {
        Duration::from_millis(self.drain_delay_ms)
    }

    pub fn connect_stagger(&self) -> Duration {
        Duration::from_millis(self.connect_stagger_ms)
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay(),
            drain_delay_ms: default_drain_delay(),
            connect_stagger_ms: default_connect_stagger(),
        }
    }
}

fn default_reconnect_delay() -> u64 {
    5000
}

fn default_drain_delay() -> u64 {
    3000
}

fn default_connect_stagger() -> u64 {
    1000
}

/// One configuration block per alert mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    #[serde(default = "AlertModeConfig::stat_deviation")]
    pub stat_deviation: AlertModeConfig,
    #[serde(default = "AlertModeConfig::candle_move")]
    pub candle_move: AlertModeConfig,
    #[serde(default = "AlertModeConfig::momentum")]
    pub momentum: AlertModeConfig,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            stat_deviation: AlertModeConfig::stat_deviation(),
            candle_move: AlertModeConfig::candle_move(),
            momentum: AlertModeConfig::momentum(),
        }
    }
}
