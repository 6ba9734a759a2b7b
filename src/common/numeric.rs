//! Numeric parsing policy for exchange decimal strings
//!
//! Prices arrive as decimal strings. They are parsed explicitly, and a failed
//! parse is handled by one of two named policies:
//!
//! - decision math uses [`signal_value`]: a value that does not parse
//!   contributes no signal and counts as `0.0` (ZeroOnParseFailure)
//! - display uses [`pretty_decimal`]: a value that does not parse is shown
//!   exactly as received

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use tracing::debug;

use super::errors::{MonitorError, Result};

/// Decimal places used when rendering prices and quantities
pub const DISPLAY_DECIMALS: u32 = 6;

/// Parse a decimal string into a finite `f64`
pub fn parse_number(field: &'static str, raw: &str) -> Result<f64> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(MonitorError::NumericParse {
            field,
            value: raw.to_string(),
        }),
    }
}

/// ZeroOnParseFailure: parse for decision math, treating failures as `0.0`
pub fn signal_value(field: &'static str, raw: &str) -> f64 {
    parse_number(field, raw).unwrap_or_else(|e| {
        debug!(error = %e, "Unparseable number treated as zero");
        0.0
    })
}

/// Render a decimal string with a fixed number of decimals
///
/// Rounding happens on the exact decimal, so no float error leaks into
/// the output. Strings that are not decimals are returned unchanged.
pub fn pretty_decimal(raw: &str, decimals: u32) -> String {
    let trimmed = raw.trim();
    let parsed = Decimal::from_str(trimmed).or_else(|_| Decimal::from_scientific(trimmed));
    match parsed {
        Ok(value) => {
            let rounded =
                value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
            format!("{:.*}", decimals as usize, rounded)
        }
        Err(_) => raw.to_string(),
    }
}

/// Render a computed float with a fixed number of decimals
pub fn fixed(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, value)
}
