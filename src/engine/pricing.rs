//! Limit price offsets and inter-cycle delays

use std::time::Duration;

use rand::Rng;

use crate::common::types::Side;
use crate::config::types::{DynamicOffsetConfig, TradingConfig};

/// Limit price for `side`: buys below the reference, sells above it
pub fn compute_trade_price(side: Side, price: f64, offset: f64) -> f64 {
    match side {
        Side::Buy => price * (1.0 - offset),
        Side::Sell => price * (1.0 + offset),
    }
}

/// Offset scaled by volatility (percent), clamped to the configured band
pub fn order_offset(volatility: f64, dynamic: &DynamicOffsetConfig, static_offset: f64) -> f64 {
    if !dynamic.enabled {
        return static_offset;
    }
    if !volatility.is_finite() || volatility <= 0.0 {
        return dynamic.fallback_offset;
    }

    let raw = volatility / 100.0 * dynamic.volatility_factor;
    let clamped = raw.max(dynamic.min_offset).min(dynamic.max_offset);
    if clamped.is_finite() && clamped > 0.0 {
        clamped
    } else {
        dynamic.fallback_offset
    }
}

/// Delay before the next cycle.
///
/// Collecting waits the fixed collect interval. Trading waits a uniformly
/// random whole number of seconds in `[min, max)` minutes, never under 1s.
pub fn next_delay<R: Rng + ?Sized>(collecting: bool, config: &TradingConfig, rng: &mut R) -> Duration {
    if collecting {
        return Duration::from_secs(config.collect_interval_sec.max(1));
    }

    let min_sec = config.min_interval_min * 60;
    let max_sec = config.max_interval_min.max(config.min_interval_min) * 60;
    if max_sec <= min_sec {
        return Duration::from_secs(min_sec.max(1));
    }
    Duration::from_secs(rng.gen_range(min_sec..max_sec).max(1))
}
