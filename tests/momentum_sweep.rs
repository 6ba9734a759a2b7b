//! Integration tests for the momentum sweep

mod common;

use binance_market_monitor::alert::types::SweepConfig;
use binance_market_monitor::alert::{
    AlertModeConfig, MessageComposer, MomentumEvaluator, NotificationGate,
};
use binance_market_monitor::common::types::{CandleInterval, Kline, SymbolTags};
use binance_market_monitor::monitor::pipeline::Dispatcher;
use binance_market_monitor::monitor::sweep::MomentumSweep;
use binance_market_monitor::monitor::universe::{SymbolUniverse, UniverseHandle};
use common::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const NOW_MS: i64 = 10_000_000;

/// Four closed candles whose last three form an upward streak
fn streak_klines() -> Vec<Kline> {
    vec![
        sample_kline(0, 100.0, 100.0),
        sample_kline(1, 100.0, 101.2),
        sample_kline(2, 100.0, 100.5),
        sample_kline(3, 100.0, 101.3),
    ]
}

fn universe(symbols: &[&str]) -> UniverseHandle {
    let listing: Vec<_> = symbols
        .iter()
        .map(|symbol| symbol_info(symbol, symbol.trim_end_matches("USDT"), "USDT"))
        .collect();
    let mut tags = SymbolTags::new();
    tags.insert("BTC".to_string(), vec!["pow".to_string()]);
    UniverseHandle::new(SymbolUniverse::partition(
        1,
        &listing,
        "USDT",
        1,
        CandleInterval::FiveMinutes,
        tags,
    ))
}

fn config(group_size: usize) -> AlertModeConfig {
    AlertModeConfig {
        enabled: true,
        sweep: Some(SweepConfig {
            group_size,
            ..SweepConfig::default()
        }),
        ..AlertModeConfig::momentum()
    }
}

fn sweep(
    config: AlertModeConfig,
    klines: Arc<ScriptedKlines>,
    universe: UniverseHandle,
    dispatcher: Dispatcher,
) -> MomentumSweep {
    MomentumSweep::new(
        MomentumEvaluator::new(config.clone()),
        klines,
        universe,
        NotificationGate::new(config.notify_cooldown()),
        MessageComposer::new("USDT", TRADE_URL),
        dispatcher,
    )
}

#[tokio::test]
async fn test_streak_is_sent_with_tags_and_link() {
    let notifier = RecordingNotifier::new();
    let klines = ScriptedKlines::new();
    klines.set("BTCUSDT", streak_klines());
    let sweep = sweep(
        config(10),
        klines.clone(),
        universe(&["BTCUSDT", "ETHUSDT"]),
        Dispatcher::new(notifier.clone(), CHANNEL),
    );

    let alerted = sweep.sweep_once(NOW_MS).await.unwrap();
    assert_eq!(alerted, 1);

    let texts = notifier.texts();
    assert_eq!(texts.len(), 1);
    let text = &texts[0];
    assert!(text.contains("*Momentum*: BTC/USDT"));
    assert!(text.contains("*Mode*: \\-"));
    assert!(!text.contains("*Mode*: \\+"));
    assert!(text.contains("*Candles*: 🔺1\\.20% 🔺0\\.50% 🔺1\\.30%"));
    assert!(text.contains("*Tags*: pow"));
    assert!(text.contains("(https://www.binance.com/en/trade/BTC_USDT?theme=dark&type=spot)"));

    // one extra candle is requested so the forming one can be dropped
    let requests = klines.requests.lock().clone();
    assert_eq!(
        requests,
        vec![
            ("BTCUSDT".to_string(), CandleInterval::FiveMinutes, 4),
            ("ETHUSDT".to_string(), CandleInterval::FiveMinutes, 4),
        ]
    );
}

#[tokio::test]
async fn test_surge_and_streak_share_one_message() {
    let notifier = RecordingNotifier::new();
    let klines = ScriptedKlines::new();
    klines.set(
        "ETHUSDT",
        vec![
            sample_kline(0, 100.0, 102.0),
            sample_kline(1, 102.0, 103.5),
            sample_kline(2, 103.5, 105.0),
        ],
    );
    let sweep = sweep(
        config(10),
        klines,
        universe(&["ETHUSDT"]),
        Dispatcher::new(notifier.clone(), CHANNEL),
    );

    assert_eq!(sweep.sweep_once(NOW_MS).await.unwrap(), 1);
    let texts = notifier.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("*Mode*: \\-"));
    assert!(texts[0].contains("*Mode*: \\+"));
    assert!(texts[0].contains("*Cumulative*: 🔺5\\.00%"));
}

#[tokio::test]
async fn test_repeat_sweep_is_suppressed_by_cooldown() {
    let notifier = RecordingNotifier::new();
    let klines = ScriptedKlines::new();
    klines.set("BTCUSDT", streak_klines());
    let dispatcher = Dispatcher::new(notifier.clone(), CHANNEL);
    let sweep = sweep(config(10), klines, universe(&["BTCUSDT"]), dispatcher.clone());

    assert_eq!(sweep.sweep_once(NOW_MS).await.unwrap(), 1);
    assert_eq!(sweep.sweep_once(NOW_MS).await.unwrap(), 0);

    assert_eq!(notifier.messages().len(), 1);
    let stats = dispatcher.stats();
    assert_eq!(stats.sent, 1);
    assert_eq!(stats.suppressed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_error_abandons_pass() {
    let notifier = RecordingNotifier::new();
    let klines = ScriptedKlines::new();
    klines.set("BTCUSDT", streak_klines());
    klines.set("SOLUSDT", streak_klines());
    klines.fail_for("ETHUSDT");
    let sweep = sweep(
        config(1),
        klines.clone(),
        universe(&["BTCUSDT", "ETHUSDT", "SOLUSDT"]),
        Dispatcher::new(notifier.clone(), CHANNEL),
    );

    assert!(sweep.sweep_once(NOW_MS).await.is_err());

    // the group before the failure was still delivered
    let texts = notifier.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("BTC/USDT"));

    let requested: Vec<String> = klines
        .requests
        .lock()
        .iter()
        .map(|(symbol, _, _)| symbol.clone())
        .collect();
    assert_eq!(requested, vec!["BTCUSDT", "ETHUSDT"]);
}

#[tokio::test(start_paused = true)]
async fn test_groups_are_paced() {
    let notifier = RecordingNotifier::new();
    let sweep = sweep(
        config(2),
        ScriptedKlines::new(),
        universe(&["AUSDT", "BUSDT", "CUSDT", "DUSDT", "EUSDT"]),
        Dispatcher::new(notifier.clone(), CHANNEL),
    );

    let started = Instant::now();
    assert_eq!(sweep.sweep_once(NOW_MS).await.unwrap(), 0);
    let elapsed = started.elapsed();

    // three groups, two pauses
    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < Duration::from_secs(3));
    assert!(notifier.messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_run_sweeps_until_shutdown() {
    let notifier = RecordingNotifier::new();
    let klines = ScriptedKlines::new();
    klines.set("BTCUSDT", streak_klines());
    let sweep = Arc::new(sweep(
        config(10),
        klines.clone(),
        universe(&["BTCUSDT"]),
        Dispatcher::new(notifier.clone(), CHANNEL),
    ));

    let shutdown = CancellationToken::new();
    let task = tokio::spawn(sweep.run(shutdown.clone()));

    // first pass runs immediately, the second one period later
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(klines.requests.lock().len(), 1);
    assert_eq!(notifier.messages().len(), 1);

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(klines.requests.lock().len(), 2);

    shutdown.cancel();
    task.await.unwrap();
}
