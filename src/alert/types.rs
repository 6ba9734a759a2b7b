use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::common::types::{CandleEvent, CandleInterval, Direction, Kline, MarketStatEvent};

/// The three alert modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// 24h statistics deviation against a sliding baseline
    StatDeviation,
    /// Open-to-close move inside one candle
    CandleMove,
    /// Move across the last closed candles
    Momentum,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertKind::StatDeviation => write!(f, "stat_deviation"),
            AlertKind::CandleMove => write!(f, "candle_move"),
            AlertKind::Momentum => write!(f, "momentum"),
        }
    }
}

/// Price filter: a price passes when it is at or below `low` or at or above `high`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBand {
    pub low: f64,
    pub high: f64,
}

impl PriceBand {
    pub fn contains(&self, price: f64) -> bool {
        price <= self.low || price >= self.high
    }
}

impl Default for PriceBand {
    fn default() -> Self {
        Self {
            low: 1.0,
            high: 300.0,
        }
    }
}

/// What happens to the stored baseline when an alert fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselinePolicy {
    /// Replace the baseline with the event that fired
    Sliding,
    /// Keep comparing against the first observation
    Fixed,
}

/// Pacing for timer-driven sweeps over the symbol list
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Time between sweeps in seconds
    pub interval_seconds: u64,
    /// Symbols fetched concurrently per group
    pub group_size: usize,
    /// Pause between groups in milliseconds
    pub pacing_ms: u64,
    /// Closed candles examined per symbol
    pub lookback: usize,
}

impl SweepConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 300,
            group_size: 10,
            pacing_ms: 1000,
            lookback: 3,
        }
    }
}

/// Parameters for one alert mode
///
/// Every mode is described by the same struct; the engine reads only the
/// fields its mode uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertModeConfig {
    pub enabled: bool,
    /// Threshold in percent units (3.0 means 3%)
    pub threshold_percent: f64,
    /// Minimum time between the baseline and a firing event, in seconds
    pub baseline_window_seconds: u64,
    /// Minimum time between delivered notifications per symbol, in seconds
    pub notify_cooldown_seconds: u64,
    #[serde(default)]
    pub price_band: Option<PriceBand>,
    pub baseline_policy: BaselinePolicy,
    pub interval: CandleInterval,
    #[serde(default)]
    pub sweep: Option<SweepConfig>,
}

impl AlertModeConfig {
    /// 24h statistics deviation: 3% over at least 10 minutes, outside mid prices
    pub fn stat_deviation() -> Self {
        Self {
            enabled: true,
            threshold_percent: 3.0,
            baseline_window_seconds: 600,
            notify_cooldown_seconds: 0,
            price_band: Some(PriceBand::default()),
            baseline_policy: BaselinePolicy::Sliding,
            interval: CandleInterval::OneDay,
            sweep: None,
        }
    }

    /// 3% open-to-close move in a 5 minute candle
    pub fn candle_move() -> Self {
        Self {
            enabled: true,
            threshold_percent: 3.0,
            baseline_window_seconds: 0,
            notify_cooldown_seconds: 20,
            price_band: None,
            baseline_policy: BaselinePolicy::Sliding,
            interval: CandleInterval::FiveMinutes,
            sweep: None,
        }
    }

    /// 3% open-to-close move in a 15 minute candle
    pub fn candle_move_quarter_hour() -> Self {
        Self {
            interval: CandleInterval::FifteenMinutes,
            ..Self::candle_move()
        }
    }

    /// 2.5% open-to-close move in a 5 minute candle
    pub fn candle_move_fast() -> Self {
        Self {
            threshold_percent: 2.5,
            ..Self::candle_move()
        }
    }

    /// Momentum over the last three closed 5 minute candles
    pub fn momentum() -> Self {
        Self {
            enabled: false,
            threshold_percent: 1.0,
            baseline_window_seconds: 0,
            notify_cooldown_seconds: 60,
            price_band: None,
            baseline_policy: BaselinePolicy::Sliding,
            interval: CandleInterval::FiveMinutes,
            sweep: Some(SweepConfig::default()),
        }
    }

    pub fn baseline_window(&self) -> Duration {
        Duration::from_secs(self.baseline_window_seconds)
    }

    pub fn notify_cooldown(&self) -> Duration {
        Duration::from_secs(self.notify_cooldown_seconds)
    }

    pub fn sweep_or_default(&self) -> SweepConfig {
        self.sweep.unwrap_or_default()
    }
}

/// Percent threshold for the cumulative momentum move
pub const MOMENTUM_SURGE_PERCENT: f64 = 4.0;

/// Which momentum condition fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MomentumSignal {
    /// Several of the candles individually moved up past the threshold
    Streak,
    /// Cumulative move from first open to last close
    Surge,
}

impl MomentumSignal {
    /// Mode label shown in the alert text
    pub fn label(&self) -> &'static str {
        match self {
            MomentumSignal::Streak => "-",
            MomentumSignal::Surge => "+",
        }
    }
}

/// Per-candle figures used by the momentum evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct CandleChange {
    pub kline: Kline,
    pub percent: f64,
    pub direction: Direction,
}

/// A 24h statistics alert with the baseline it was measured against
#[derive(Debug, Clone, PartialEq)]
pub struct StatAlert {
    pub current: MarketStatEvent,
    pub baseline: MarketStatEvent,
}

/// An intra-candle move alert
#[derive(Debug, Clone, PartialEq)]
pub struct CandleAlert {
    pub event: CandleEvent,
    pub percent: f64,
    pub direction: Direction,
}

/// A momentum alert over recent closed candles
#[derive(Debug, Clone, PartialEq)]
pub struct MomentumAlert {
    pub symbol: String,
    pub signal: MomentumSignal,
    pub candles: Vec<CandleChange>,
    pub cumulative_percent: f64,
}
