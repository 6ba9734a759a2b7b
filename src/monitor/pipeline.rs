//! Alert pipeline: feed events in, notifications out

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use super::universe::UniverseHandle;
use crate::alert::{
    AlertKind, CandleMoveEngine, MessageComposer, NotificationGate, StatDeviationEngine,
};
use crate::common::errors::MonitorError;
use crate::common::numeric::{pretty_decimal, DISPLAY_DECIMALS};
use crate::common::traits::{FeedSink, Notifier};
use crate::common::types::{CandleEvent, FeedEvent, MarketStatEvent};

/// Counters for delivered and dropped notifications
#[derive(Debug, Default)]
pub struct DispatchStats {
    sent: AtomicU64,
    suppressed: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSnapshot {
    pub sent: u64,
    pub suppressed: u64,
    pub failed: u64,
}

impl DispatchStats {
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            sent: self.sent.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_suppressed(&self) {
        self.suppressed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Sends composed text to the configured channel
///
/// Delivery failures are logged and counted; the message is dropped.
#[derive(Clone)]
pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
    channel: String,
    stats: Arc<DispatchStats>,
}

impl Dispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, channel: &str) -> Self {
        Self {
            notifier,
            channel: channel.to_string(),
            stats: Arc::new(DispatchStats::default()),
        }
    }

    pub fn stats(&self) -> DispatchSnapshot {
        self.stats.snapshot()
    }

    pub(crate) fn counters(&self) -> &DispatchStats {
        &self.stats
    }

    /// Deliver `text`, returning whether it went out
    #[instrument(skip(self, text), fields(notifier = self.notifier.notifier_name()))]
    pub async fn dispatch(&self, kind: AlertKind, symbol: &str, text: &str) -> bool {
        match self.notifier.send(&self.channel, text).await {
            Ok(()) => {
                self.stats.sent.fetch_add(1, Ordering::Relaxed);
                info!("Alert sent");
                true
            }
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(error = %e, "Post message to channel failed");
                false
            }
        }
    }
}

/// Routes feed events through the decision engines to the notifier
pub struct AlertPipeline {
    stat_engine: Option<StatDeviationEngine>,
    stat_gate: NotificationGate,
    candle_engine: Option<CandleMoveEngine>,
    candle_gate: NotificationGate,
    composer: MessageComposer,
    universe: UniverseHandle,
    dispatcher: Dispatcher,
}

impl AlertPipeline {
    pub fn new(
        composer: MessageComposer,
        universe: UniverseHandle,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            stat_engine: None,
            stat_gate: NotificationGate::new(Duration::ZERO),
            candle_engine: None,
            candle_gate: NotificationGate::new(Duration::ZERO),
            composer,
            universe,
            dispatcher,
        }
    }

    /// Enable the 24h statistics mode
    pub fn with_stat_deviation(
        mut self,
        engine: StatDeviationEngine,
        gate: NotificationGate,
    ) -> Self {
        self.stat_engine = Some(engine);
        self.stat_gate = gate;
        self
    }

    /// Enable the intra-candle move mode
    pub fn with_candle_move(mut self, engine: CandleMoveEngine, gate: NotificationGate) -> Self {
        self.candle_engine = Some(engine);
        self.candle_gate = gate;
        self
    }

    pub fn stats(&self) -> DispatchSnapshot {
        self.dispatcher.stats()
    }

    /// Mode B for one candle
    pub async fn handle_candle(&self, event: &CandleEvent) {
        let Some(engine) = &self.candle_engine else {
            return;
        };
        let Some(alert) = engine.evaluate(event) else {
            return;
        };

        let universe = self.universe.current();
        let text = self.composer.candle_alert_text(
            &alert,
            engine.config().threshold_percent,
            universe.tags_for(&event.symbol),
        );

        if self.candle_gate.allow(&event.symbol, true) {
            self.dispatcher
                .dispatch(AlertKind::CandleMove, &event.symbol, &text)
                .await;
        } else {
            self.dispatcher.counters().record_suppressed();
            debug!(
                symbol = %event.symbol,
                percent = alert.percent,
                cooldown_secs = self.candle_gate.window().as_secs(),
                "Candle alert suppressed by cooldown"
            );
        }
    }

    /// Mode A for one statistics batch: every alert goes into one message
    pub async fn handle_market_stats(&self, events: &[MarketStatEvent]) {
        let Some(engine) = &self.stat_engine else {
            return;
        };
        info!(
            symbols_tracked = engine.tracked_symbols(),
            events_received = events.len(),
            "Stats"
        );

        let mut text = String::new();
        let mut alerted = Vec::new();
        for event in events {
            if !engine.is_tracked(&event.symbol) {
                continue;
            }
            debug!(
                symbol = %event.symbol,
                last_price = %pretty_decimal(&event.last_price, DISPLAY_DECIMALS),
                price_change_percent = %event.price_change_percent,
                close_qty = %pretty_decimal(&event.close_qty, DISPLAY_DECIMALS),
                time = event.time,
                "Received Event"
            );

            let Some(alert) = engine.evaluate(event) else {
                continue;
            };
            if self.stat_gate.allow(&event.symbol, true) {
                text.push_str(&self.composer.stat_alert_text(&alert));
                alerted.push(event.symbol.as_str());
            } else {
                self.dispatcher.counters().record_suppressed();
                debug!(
                    symbol = %event.symbol,
                    cooldown_secs = self.stat_gate.window().as_secs(),
                    "Stat alert suppressed by cooldown"
                );
            }
        }

        if alerted.is_empty() {
            return;
        }
        text.push_str(&self.composer.batch_footer(Utc::now()));
        self.dispatcher
            .dispatch(AlertKind::StatDeviation, &alerted.join(","), &text)
            .await;
    }
}

#[async_trait]
impl FeedSink for AlertPipeline {
    async fn on_event(&self, event: FeedEvent) {
        match event {
            FeedEvent::Candle(candle) => self.handle_candle(&candle).await,
            FeedEvent::MarketStats(events) => self.handle_market_stats(&events).await,
        }
    }

    fn on_error(&self, error: &MonitorError) {
        warn!(error = %error, "Feed error");
    }
}
