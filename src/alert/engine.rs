//! Decision engines for the three alert modes
//!
//! Engines only decide. Formatting and delivery happen in the composer and
//! the pipeline, and the notification gate is consulted after an engine has
//! already updated its own state.

use tracing::debug;

use super::state::{AlertStateStore, StateChange, SymbolAlertState};
use super::types::{
    AlertModeConfig, BaselinePolicy, CandleAlert, CandleChange, MomentumAlert, MomentumSignal,
    StatAlert, MOMENTUM_SURGE_PERCENT,
};
use crate::common::types::{CandleEvent, Direction, Kline, MarketStatEvent};

/// Percent change from `open` to `close`, `None` when `open` is not positive
pub fn percent_change(open: f64, close: f64) -> Option<f64> {
    if open <= 0.0 {
        return None;
    }
    Some((close - open) * 100.0 / open)
}

/// Mode A: 24h statistics deviation against a per-symbol baseline
#[derive(Debug)]
pub struct StatDeviationEngine {
    config: AlertModeConfig,
    quote_asset: String,
    state: AlertStateStore<MarketStatEvent>,
}

impl StatDeviationEngine {
    pub fn new(config: AlertModeConfig, quote_asset: &str) -> Self {
        Self {
            config,
            quote_asset: quote_asset.to_uppercase(),
            state: AlertStateStore::new(),
        }
    }

    /// Whether events for `symbol` are evaluated at all
    pub fn is_tracked(&self, symbol: &str) -> bool {
        symbol.ends_with(&self.quote_asset)
    }

    /// Symbols with a stored baseline
    pub fn tracked_symbols(&self) -> usize {
        self.state.len()
    }

    pub fn baseline(&self, symbol: &str) -> Option<SymbolAlertState<MarketStatEvent>> {
        self.state.get(symbol)
    }

    /// Evaluate one statistics event
    ///
    /// The first event for a symbol only seeds the baseline. Later events fire
    /// when enough time has passed since the baseline, the 24h change moved by
    /// at least the threshold, and the price sits inside the configured band.
    pub fn evaluate(&self, event: &MarketStatEvent) -> Option<StatAlert> {
        if !self.is_tracked(&event.symbol) {
            return None;
        }

        self.state.transact(&event.symbol, |stored| {
            let Some(stored) = stored else {
                debug!(symbol = %event.symbol, "Seeding baseline");
                return (
                    StateChange::Store {
                        snapshot: event.clone(),
                        stored_at: event.time,
                    },
                    None,
                );
            };

            if !self.qualifies(&stored.snapshot, event) {
                return (StateChange::Keep, None);
            }

            let alert = StatAlert {
                current: event.clone(),
                baseline: stored.snapshot.clone(),
            };
            let change = match self.config.baseline_policy {
                BaselinePolicy::Sliding => StateChange::Store {
                    snapshot: event.clone(),
                    stored_at: event.time,
                },
                BaselinePolicy::Fixed => StateChange::Keep,
            };
            (change, Some(alert))
        })
    }

    fn qualifies(&self, baseline: &MarketStatEvent, event: &MarketStatEvent) -> bool {
        let window_ms = (self.config.baseline_window_seconds as i64).saturating_mul(1000);
        if event.time - baseline.time < window_ms {
            return false;
        }

        let moved = (event.price_change_percent_value() - baseline.price_change_percent_value())
            .abs();
        if moved < self.config.threshold_percent {
            return false;
        }

        match self.config.price_band {
            Some(band) => band.contains(event.last_price_value()),
            None => true,
        }
    }
}

/// Mode B: open-to-close move inside a single candle
#[derive(Debug, Clone)]
pub struct CandleMoveEngine {
    config: AlertModeConfig,
}

impl CandleMoveEngine {
    pub fn new(config: AlertModeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AlertModeConfig {
        &self.config
    }

    pub fn evaluate(&self, event: &CandleEvent) -> Option<CandleAlert> {
        if event.interval != self.config.interval {
            debug!(
                symbol = %event.symbol,
                interval = %event.interval,
                "Ignoring candle for unexpected interval"
            );
            return None;
        }

        let percent = percent_change(event.open_value(), event.close_value())?;
        if percent.abs() < self.config.threshold_percent {
            return None;
        }

        Some(CandleAlert {
            event: event.clone(),
            percent,
            direction: Direction::of(percent),
        })
    }
}

/// Mode C: momentum over the most recent closed candles
#[derive(Debug, Clone)]
pub struct MomentumEvaluator {
    config: AlertModeConfig,
}

impl MomentumEvaluator {
    pub fn new(config: AlertModeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AlertModeConfig {
        &self.config
    }

    /// Evaluate `klines` (oldest first) as of `now_ms`
    ///
    /// Candles whose close time is not yet past are dropped. Each signal is
    /// reported on its own, so one call may return both.
    pub fn evaluate(&self, symbol: &str, klines: &[Kline], now_ms: i64) -> Vec<MomentumAlert> {
        let lookback = self.config.sweep_or_default().lookback;
        let closed: Vec<&Kline> = klines.iter().filter(|k| k.close_time < now_ms).collect();
        if lookback == 0 || closed.len() < lookback {
            debug!(symbol, closed = closed.len(), "Not enough closed candles");
            return Vec::new();
        }
        let window = &closed[closed.len() - lookback..];

        let candles: Vec<CandleChange> = window
            .iter()
            .map(|kline| {
                let percent =
                    percent_change(kline.open_value(), kline.close_value()).unwrap_or(0.0);
                CandleChange {
                    kline: (*kline).clone(),
                    percent,
                    direction: Direction::of(percent),
                }
            })
            .collect();

        let cumulative_percent = percent_change(
            window[0].open_value(),
            window[window.len() - 1].close_value(),
        )
        .unwrap_or(0.0);

        let threshold = self.config.threshold_percent;
        let over = candles.iter().filter(|c| c.percent > threshold).count();
        let all_up = candles.iter().all(|c| c.direction == Direction::Up);

        let mut signals = Vec::new();
        if over >= 2 || (all_up && over >= 1) {
            signals.push(MomentumSignal::Streak);
        }
        if cumulative_percent > MOMENTUM_SURGE_PERCENT {
            signals.push(MomentumSignal::Surge);
        }

        signals
            .into_iter()
            .map(|signal| MomentumAlert {
                symbol: symbol.to_string(),
                signal,
                candles: candles.clone(),
                cumulative_percent,
            })
            .collect()
    }
}
