use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::Duration;

/// Per-symbol cooldown between delivered notifications
#[derive(Debug)]
pub struct NotificationGate {
    window: Duration,
    last_sent: DashMap<String, DateTime<Utc>>,
}

impl NotificationGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_sent: DashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decide whether a notification for `symbol` may go out now
    pub fn allow(&self, symbol: &str, would_send: bool) -> bool {
        self.allow_at(symbol, would_send, Utc::now())
    }

    /// Same as [`NotificationGate::allow`] with an explicit clock
    ///
    /// The timestamp is only recorded when the call allows delivery.
    pub fn allow_at(&self, symbol: &str, would_send: bool, now: DateTime<Utc>) -> bool {
        if !would_send {
            return false;
        }

        match self.last_sent.entry(symbol.to_string()) {
            Entry::Vacant(vacant) => {
                vacant.insert(now);
                true
            }
            Entry::Occupied(mut occupied) => {
                // a clock that went backwards counts as no time elapsed
                let elapsed = (now - *occupied.get()).to_std().unwrap_or(Duration::ZERO);
                if elapsed >= self.window {
                    occupied.insert(now);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// When a notification for `symbol` was last allowed
    pub fn last_sent(&self, symbol: &str) -> Option<DateTime<Utc>> {
        self.last_sent.get(symbol).map(|entry| *entry.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    #[test]
    fn test_allow_then_deny_within_window() {
        let gate = NotificationGate::new(Duration::from_secs(20));
        assert!(gate.allow_at("BTCUSDT", true, at(0)));
        assert!(!gate.allow_at("BTCUSDT", true, at(5)));
        assert!(!gate.allow_at("BTCUSDT", true, at(19)));
        assert_eq!(gate.last_sent("BTCUSDT"), Some(at(0)));
    }

    #[test]
    fn test_allow_after_window_resets_it() {
        let gate = NotificationGate::new(Duration::from_secs(20));
        assert!(gate.allow_at("BTCUSDT", true, at(0)));
        assert!(gate.allow_at("BTCUSDT", true, at(20)));
        assert!(!gate.allow_at("BTCUSDT", true, at(39)));
        assert!(gate.allow_at("BTCUSDT", true, at(40)));
    }

    #[test]
    fn test_would_not_send_is_denied_without_state() {
        let gate = NotificationGate::new(Duration::from_secs(20));
        assert!(!gate.allow_at("BTCUSDT", false, at(0)));
        assert!(gate.last_sent("BTCUSDT").is_none());
        assert!(gate.allow_at("BTCUSDT", true, at(1)));
    }

    #[test]
    fn test_symbols_are_independent() {
        let gate = NotificationGate::new(Duration::from_secs(60));
        assert!(gate.allow_at("BTCUSDT", true, at(0)));
        assert!(gate.allow_at("ETHUSDT", true, at(1)));
        assert!(!gate.allow_at("BTCUSDT", true, at(2)));
    }

    #[test]
    fn test_zero_window_always_allows() {
        let gate = NotificationGate::new(Duration::ZERO);
        assert!(gate.allow_at("XUSDT", true, at(0)));
        assert!(gate.allow_at("XUSDT", true, at(0)));
    }

    #[test]
    fn test_clock_going_backwards_denies() {
        let gate = NotificationGate::new(Duration::from_secs(20));
        assert!(gate.allow_at("BTCUSDT", true, at(100)));
        assert!(!gate.allow_at("BTCUSDT", true, at(50)));
    }
}
