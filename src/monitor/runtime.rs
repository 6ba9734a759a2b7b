//! Wires adapters, engines and tasks into a running monitor

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::pipeline::{AlertPipeline, Dispatcher};
use super::supervisor::StreamSupervisor;
use super::sweep::MomentumSweep;
use super::universe::UniverseResolver;
use crate::alert::{
    CandleMoveEngine, MessageComposer, MomentumEvaluator, NotificationGate, StatDeviationEngine,
};
use crate::binance::{BinanceRestClient, BinanceWebSocketFeed};
use crate::common::channels::create_refresh_channel;
use crate::common::errors::{MonitorError, Result};
use crate::common::traits::{KlineSource, MarketFeed, Notifier, SymbolSource, TagSource};
use crate::config::types::AppConfig;
use crate::telegram::TelegramNotifier;

/// External capabilities the monitor runs against
#[derive(Clone)]
pub struct MonitorAdapters {
    pub feed: Arc<dyn MarketFeed>,
    pub symbols: Arc<dyn SymbolSource>,
    pub tags: Arc<dyn TagSource>,
    pub klines: Arc<dyn KlineSource>,
    pub notifier: Arc<dyn Notifier>,
}

impl MonitorAdapters {
    /// Binance market data and Telegram delivery
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let rest = Arc::new(BinanceRestClient::from_config(&config.binance)?);
        Ok(Self {
            feed: Arc::new(BinanceWebSocketFeed::from_config(&config.binance)),
            symbols: rest.clone(),
            tags: rest.clone(),
            klines: rest,
            notifier: Arc::new(TelegramNotifier::from_config(&config.telegram)?),
        })
    }
}

/// The assembled monitor
pub struct MonitorRuntime {
    config: AppConfig,
    adapters: MonitorAdapters,
}

impl MonitorRuntime {
    pub fn new(config: AppConfig, adapters: MonitorAdapters) -> Self {
        Self { config, adapters }
    }

    pub fn from_config(config: AppConfig) -> Result<Self> {
        let adapters = MonitorAdapters::from_config(&config)?;
        Ok(Self::new(config, adapters))
    }

    /// Resolve the universe, then run every task until `shutdown` fires
    ///
    /// Fails only when the first universe cannot be resolved.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let config = &self.config;
        let alerts = &config.alerts;
        let quote_asset = config.quote_asset();
        let channel = config
            .telegram
            .channel()
            .ok_or_else(|| MonitorError::Configuration("Telegram channel missing".to_string()))?;

        let (refresh_tx, refresh_rx) = create_refresh_channel();
        let resolver = Arc::new(UniverseResolver::new(
            self.adapters.symbols.clone(),
            self.adapters.tags.clone(),
            &quote_asset,
            config.universe.group_count,
            alerts.candle_move.interval,
            refresh_tx,
        ));
        resolver.bootstrap().await?;
        let universe = resolver.handle();

        let composer = MessageComposer::new(&quote_asset, &config.binance.trade_url);
        let dispatcher = Dispatcher::new(self.adapters.notifier.clone(), &channel);

        let mut pipeline =
            AlertPipeline::new(composer.clone(), universe.clone(), dispatcher.clone());
        if alerts.stat_deviation.enabled {
            pipeline = pipeline.with_stat_deviation(
                StatDeviationEngine::new(alerts.stat_deviation.clone(), &quote_asset),
                NotificationGate::new(alerts.stat_deviation.notify_cooldown()),
            );
        }
        if alerts.candle_move.enabled {
            pipeline = pipeline.with_candle_move(
                CandleMoveEngine::new(alerts.candle_move.clone()),
                NotificationGate::new(alerts.candle_move.notify_cooldown()),
            );
        } else {
            warn!("Candle move alerts disabled, kline streams are still supervised");
        }

        let mut tasks = tokio::task::JoinSet::new();
        tasks.spawn(
            resolver
                .clone()
                .run(config.universe.refresh_interval(), shutdown.clone()),
        );

        if alerts.momentum.enabled {
            let sweep = Arc::new(MomentumSweep::new(
                MomentumEvaluator::new(alerts.momentum.clone()),
                self.adapters.klines.clone(),
                universe.clone(),
                NotificationGate::new(alerts.momentum.notify_cooldown()),
                composer,
                dispatcher.clone(),
            ));
            tasks.spawn(sweep.run(shutdown.clone()));
        }

        let supervisor = StreamSupervisor::new(
            self.adapters.feed.clone(),
            Arc::new(pipeline),
            universe,
            config.supervisor.clone(),
        )
        .with_market_stats(alerts.stat_deviation.enabled);

        info!(
            quote_asset = %quote_asset,
            channel = %channel,
            stat_deviation = alerts.stat_deviation.enabled,
            candle_move = alerts.candle_move.enabled,
            momentum = alerts.momentum.enabled,
            "Monitor running"
        );
        supervisor.run(refresh_rx, shutdown.clone()).await;

        while tasks.join_next().await.is_some() {}
        let stats = dispatcher.stats();
        info!(
            sent = stats.sent,
            suppressed = stats.suppressed,
            failed = stats.failed,
            "Monitor stopped"
        );
        Ok(())
    }
}
