//! Pure MarkdownV2 rendering of alerts
//!
//! Nothing here reads the clock; every timestamp comes from the events or is
//! passed in by the caller, so the same input always renders the same text.

use chrono::{DateTime, SecondsFormat, Utc};

use super::types::{CandleAlert, MomentumAlert, StatAlert};
use crate::common::numeric::{fixed, pretty_decimal, DISPLAY_DECIMALS};
use crate::common::types::{millis_to_datetime, Direction};
use crate::telegram::escape_markdown_v2;

const MOMENTUM_DECIMALS: usize = 2;
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Renders alert messages for one quote asset
#[derive(Debug, Clone)]
pub struct MessageComposer {
    quote_asset: String,
    trade_url: String,
}

impl MessageComposer {
    pub fn new(quote_asset: &str, trade_url: &str) -> Self {
        Self {
            quote_asset: quote_asset.to_uppercase(),
            trade_url: trade_url.trim_end_matches('/').to_string(),
        }
    }

    /// `BTCUSDT` → `BTC{separator}USDT`; symbols in other quotes are returned as-is
    pub fn pretty_symbol(&self, symbol: &str, separator: &str) -> String {
        match symbol.strip_suffix(&self.quote_asset) {
            Some(base) if !base.is_empty() => {
                format!("{}{}{}", base, separator, self.quote_asset)
            }
            _ => symbol.to_string(),
        }
    }

    /// Deep link to the trade page for `symbol`
    pub fn trade_link(&self, symbol: &str) -> String {
        format!(
            "{}/{}?theme=dark&type=spot",
            self.trade_url,
            self.pretty_symbol(symbol, "_")
        )
    }

    /// Mode A: current statistics against the previous alert's
    pub fn stat_alert_text(&self, alert: &StatAlert) -> String {
        let current = &alert.current;
        let baseline = &alert.baseline;

        let price = format!(
            "${} {}",
            pretty_decimal(&current.last_price, DISPLAY_DECIMALS),
            difference(current.last_price_value(), baseline.last_price_value(), "")
        );
        let percent = format!(
            "{}% {}",
            pretty_decimal(&current.price_change_percent, DISPLAY_DECIMALS),
            difference(
                current.price_change_percent_value(),
                baseline.price_change_percent_value(),
                "%"
            )
        );
        let quantity = format!(
            "{} {}",
            pretty_decimal(&current.close_qty, DISPLAY_DECIMALS),
            difference(current.close_qty_value(), baseline.close_qty_value(), "")
        );

        let mut lines = MessageLines::default();
        lines
            .blank()
            .field("Pair", &self.pretty_symbol(&current.symbol, "/"))
            .blank()
            .line("_Latest alert_")
            .blank()
            .field("Last price", &price)
            .field("24h change", &percent)
            .field("Last quantity", &quantity)
            .field(
                "24h volume",
                &pretty_decimal(&current.base_volume, DISPLAY_DECIMALS),
            )
            .field(
                "24h quote volume",
                &pretty_decimal(&current.quote_volume, DISPLAY_DECIMALS),
            )
            .blank()
            .line("_Previous alert_")
            .blank()
            .field(
                "Last price",
                &format!("${}", pretty_decimal(&baseline.last_price, DISPLAY_DECIMALS)),
            )
            .field(
                "24h change",
                &format!(
                    "{}%",
                    pretty_decimal(&baseline.price_change_percent, DISPLAY_DECIMALS)
                ),
            )
            .field(
                "Last quantity",
                &pretty_decimal(&baseline.close_qty, DISPLAY_DECIMALS),
            )
            .blank()
            .line(&format!(
                "Time since previous alert: {}",
                escape_markdown_v2(&format_elapsed(baseline.time, current.time))
            ))
            .blank()
            .link(&self.trade_link(&current.symbol));
        lines.finish()
    }

    /// Mode B: a single candle moved past the threshold
    pub fn candle_alert_text(
        &self,
        alert: &CandleAlert,
        threshold: f64,
        tags: &[String],
    ) -> String {
        let event = &alert.event;
        let kind = format!("{} move over {}%", event.interval.label(), threshold);

        let mut lines = MessageLines::default();
        lines
            .blank()
            .field("Event time", &timestamp(event.event_time))
            .field("Type", &kind)
            .field("Pair", &self.pretty_symbol(&event.symbol, "/"))
            .field("Open", &pretty_decimal(&event.open, DISPLAY_DECIMALS))
            .field("Close", &pretty_decimal(&event.close, DISPLAY_DECIMALS))
            .field(
                "Close \\- open",
                &difference(event.close_value(), event.open_value(), ""),
            )
            .field(
                "Change",
                &signed_percent(alert.percent, DISPLAY_DECIMALS as usize),
            )
            .field("Start", &timestamp(event.start_time))
            .field("End", &timestamp(event.end_time))
            .tags(tags)
            .link(&self.trade_link(&event.symbol));
        lines.finish()
    }

    /// Mode C: every signal that fired for one symbol in one sweep
    pub fn momentum_text(&self, alerts: &[MomentumAlert], tags: &[String]) -> String {
        let Some(first) = alerts.first() else {
            return String::new();
        };

        let mut lines = MessageLines::default();
        lines
            .blank()
            .field("Momentum", &self.pretty_symbol(&first.symbol, "/"));
        for alert in alerts {
            lines.field("Mode", alert.signal.label());
        }

        let candles = first
            .candles
            .iter()
            .map(|c| signed_percent(c.percent, MOMENTUM_DECIMALS))
            .collect::<Vec<_>>()
            .join(" ");
        lines.field("Candles", &candles).field(
            "Cumulative",
            &signed_percent(first.cumulative_percent, MOMENTUM_DECIMALS),
        );
        if let (Some(oldest), Some(newest)) = (first.candles.first(), first.candles.last()) {
            let window = format!(
                "{} to {}",
                timestamp(oldest.kline.open_time),
                timestamp(newest.kline.close_time)
            );
            lines.field("Window", &window);
        }
        lines.tags(tags).link(&self.trade_link(&first.symbol));
        lines.finish()
    }

    /// Footer appended to a batch of statistics alerts
    pub fn batch_footer(&self, at: DateTime<Utc>) -> String {
        format!(
            "\n\n{}",
            escape_markdown_v2(&format!(
                "({})",
                at.to_rfc3339_opts(SecondsFormat::Secs, true)
            ))
        )
    }
}

/// `(🔺0.000100)` style delta between two values
fn difference(new_value: f64, old_value: f64, suffix: &str) -> String {
    let delta = new_value - old_value;
    format!(
        "({}{}{})",
        Direction::of(delta).glyph(),
        fixed(delta.abs(), DISPLAY_DECIMALS as usize),
        suffix
    )
}

/// `🔻3.000000%` style percent with its direction glyph
fn signed_percent(percent: f64, decimals: usize) -> String {
    format!(
        "{}{}%",
        Direction::of(percent).glyph(),
        fixed(percent.abs(), decimals)
    )
}

fn timestamp(millis: i64) -> String {
    millis_to_datetime(millis).format(TIME_FORMAT).to_string()
}

/// Line-by-line message builder
#[derive(Default)]
struct MessageLines {
    text: String,
}

impl MessageLines {
    fn blank(&mut self) -> &mut Self {
        self.text.push('\n');
        self
    }

    /// A line already in MarkdownV2
    fn line(&mut self, line: &str) -> &mut Self {
        self.text.push_str(line);
        self.blank()
    }

    /// `*label*: value`, escaping the value
    fn field(&mut self, label: &str, value: &str) -> &mut Self {
        self.line(&format!("*{}*: {}", label, escape_markdown_v2(value)))
    }

    fn tags(&mut self, tags: &[String]) -> &mut Self {
        if tags.is_empty() {
            return self;
        }
        self.field("Tags", &tags.join(", "))
    }

    fn link(&mut self, url: &str) -> &mut Self {
        self.line(&format!("[Details]({})", url))
    }

    fn finish(self) -> String {
        self.text
    }
}

/// Whole seconds between two event times, rendered as `10m1s` / `1h0m0s` / `0s`
pub fn format_elapsed(from_ms: i64, to_ms: i64) -> String {
    let seconds = to_ms.div_euclid(1000) - from_ms.div_euclid(1000);
    let sign = if seconds < 0 { "-" } else { "" };
    let seconds = seconds.unsigned_abs();

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}{}h{}m{}s", sign, hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}{}m{}s", sign, minutes, secs)
    } else {
        format!("{}{}s", sign, secs)
    }
}
