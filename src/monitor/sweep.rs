//! Timer-driven momentum sweep over the watched symbols

use chrono::Utc;
use futures_util::future::join_all;
use std::sync::Arc;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::pipeline::Dispatcher;
use super::universe::UniverseHandle;
use crate::alert::{AlertKind, MessageComposer, MomentumEvaluator, NotificationGate};
use crate::common::errors::Result;
use crate::common::traits::KlineSource;

/// Fetches recent candles for every symbol in paced groups and reports momentum
pub struct MomentumSweep {
    evaluator: MomentumEvaluator,
    klines: Arc<dyn KlineSource>,
    universe: UniverseHandle,
    gate: NotificationGate,
    composer: MessageComposer,
    dispatcher: Dispatcher,
}

impl MomentumSweep {
    pub fn new(
        evaluator: MomentumEvaluator,
        klines: Arc<dyn KlineSource>,
        universe: UniverseHandle,
        gate: NotificationGate,
        composer: MessageComposer,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            evaluator,
            klines,
            universe,
            gate,
            composer,
            dispatcher,
        }
    }

    /// One pass over the current universe as of `now_ms`
    ///
    /// The first failed fetch abandons the pass; alerts from groups already
    /// processed have been sent. Returns the number of symbols alerted.
    #[instrument(skip(self))]
    pub async fn sweep_once(&self, now_ms: i64) -> Result<usize> {
        let universe = self.universe.current();
        let config = self.evaluator.config();
        let sweep = config.sweep_or_default();
        let interval = config.interval;
        // one extra candle so the forming one can be dropped
        let limit = u16::try_from(sweep.lookback + 1).unwrap_or(u16::MAX);

        let mut alerted = 0;
        for (index, group) in universe.symbols.chunks(sweep.group_size.max(1)).enumerate() {
            if index > 0 {
                sleep(sweep.pacing()).await;
            }

            let fetches = group
                .iter()
                .map(|symbol| self.klines.fetch_klines(symbol, interval, limit));
            let results = join_all(fetches).await;

            for (symbol, result) in group.iter().zip(results) {
                let klines = result?;
                let alerts = self.evaluator.evaluate(symbol, &klines, now_ms);
                if alerts.is_empty() {
                    continue;
                }

                if !self.gate.allow(symbol, true) {
                    self.dispatcher.counters().record_suppressed();
                    debug!(
                        symbol = %symbol,
                        cooldown_secs = self.gate.window().as_secs(),
                        "Momentum alert suppressed by cooldown"
                    );
                    continue;
                }
                let text = self.composer.momentum_text(&alerts, universe.tags_for(symbol));
                if self.dispatcher.dispatch(AlertKind::Momentum, symbol, &text).await {
                    alerted += 1;
                }
            }
        }

        Ok(alerted)
    }

    /// Sweep on the configured interval until `shutdown` fires
    ///
    /// Each pass runs in its own task so a panic inside it is contained.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let period = self.evaluator.config().sweep_or_default().interval();
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(period_secs = period.as_secs(), "Momentum sweep started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Momentum sweep stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let sweep = self.clone();
                    let mut pass = tokio::spawn(async move {
                        sweep.sweep_once(Utc::now().timestamp_millis()).await
                    });
                    let finished = tokio::select! {
                        finished = &mut pass => finished,
                        _ = shutdown.cancelled() => {
                            pass.abort();
                            info!("Momentum sweep stopping mid-pass");
                            break;
                        }
                    };
                    match finished {
                        Ok(Ok(alerted)) => debug!(alerted, "Momentum sweep finished"),
                        Ok(Err(e)) => warn!(error = %e, "Momentum sweep abandoned"),
                        Err(e) if e.is_panic() => error!("Momentum sweep panicked"),
                        Err(e) => warn!(error = %e, "Momentum sweep task cancelled"),
                    }
                }
            }
        }
    }
}
