//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::Result;

/// Flat environment keys kept for compatibility with existing deployments
const LEGACY_KEYS: [(&str, &str); 4] = [
    ("QUOTE_ASSET", "monitor.quote_asset"),
    ("ENVIRONMENT", "monitor.environment"),
    ("TELEGRAM_BOT_TOKEN", "telegram.bot_token"),
    ("TELEGRAM_CHANNEL_USERNAME", "telegram.channel_username"),
];

/// Load configuration from defaults, file, and environment variables
///
/// Priority (highest to lowest):
/// 1. Flat keys (`QUOTE_ASSET`, `TELEGRAM_CHANNEL_USERNAME`, ...)
/// 2. Environment variables prefixed with `MONITOR__` (e.g. `MONITOR__UNIVERSE__GROUP_COUNT`)
/// 3. Configuration file (TOML format)
/// 4. Default values
///
/// The result is validated before it is returned.
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    dotenvy::dotenv().ok();
    let config = build_config(config_path, |key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Assemble configuration with an injectable lookup for the flat keys
fn build_config<F>(config_path: Option<&str>, lookup: F) -> Result<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("MONITOR")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    for (env_key, config_key) in LEGACY_KEYS {
        let value = lookup(env_key).filter(|v| !v.trim().is_empty());
        builder = builder.set_override_option(config_key, value)?;
    }

    Ok(builder.build()?.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = build_config(None, lookup_from(&[])).unwrap();
        assert_eq!(config.quote_asset(), "USDT");
        assert_eq!(config.universe.group_count, 3);
        assert_eq!(config.alerts.candle_move.threshold_percent, 3.0);
        assert!(config.telegram.bot_token.is_none());
    }

    #[test]
    fn test_flat_keys_override() {
        let config = build_config(
            None,
            lookup_from(&[
                ("QUOTE_ASSET", "busd"),
                ("ENVIRONMENT", "production"),
                ("TELEGRAM_BOT_TOKEN", "123:abc"),
                ("TELEGRAM_CHANNEL_USERNAME", "alerts"),
            ]),
        )
        .unwrap();

        assert_eq!(config.quote_asset(), "BUSD");
        assert!(config.monitor.environment.is_production());
        assert_eq!(config.telegram.channel().as_deref(), Some("@alerts"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_flat_key_is_ignored() {
        let config = build_config(None, lookup_from(&[("QUOTE_ASSET", "  ")])).unwrap();
        assert_eq!(config.quote_asset(), "USDT");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = build_config(Some("does-not-exist.toml"), lookup_from(&[])).unwrap();
        assert_eq!(config.supervisor.reconnect_delay_ms, 5000);
    }
}
