//! External market snapshot types and the momentum features derived from klines

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One candle; fields are `None` when upstream sent something unreadable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    pub open_time: Option<i64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

/// 24h spot ticker fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotTicker {
    pub last_price: Option<f64>,
    pub price_change_percent: Option<f64>,
    pub high_price: Option<f64>,
    pub low_price: Option<f64>,
    pub volume_24h: Option<f64>,
    pub quote_volume_24h: Option<f64>,
}

/// Multi-horizon momentum computed from klines
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Momentum {
    pub change_1m: Option<f64>,
    pub change_5m: Option<f64>,
    pub change_15m: Option<f64>,
    pub change_30m: Option<f64>,
    /// Volume of the last 5 candles over the 5 before them
    pub volume_spike_ratio: Option<f64>,
    /// High-low range across all candles as a percent of the last close
    pub range_pct: Option<f64>,
    pub atr14: Option<f64>,
}

/// Perpetual futures fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuturesSnapshot {
    pub mark_price: Option<f64>,
    pub index_price: Option<f64>,
    pub funding_rate: Option<f64>,
    pub funding_rate_percent: Option<f64>,
    pub next_funding_time: Option<i64>,
    /// Spot last price minus index price
    pub basis_spot: Option<f64>,
    pub open_interest: Option<f64>,
}

/// Snapshot as fetched from upstream, independent of the venue price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub source: String,
    pub symbol: String,
    pub fetched_at: DateTime<Utc>,
    pub spot: SpotTicker,
    pub momentum: Momentum,
    pub futures: FuturesSnapshot,
}

/// Basis of the venue price against external references
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelativeBasis {
    pub basis_vs_spot: Option<f64>,
    pub basis_vs_mark: Option<f64>,
    pub basis_spot_vs_index: Option<f64>,
}

/// Snapshot plus basis against the current venue price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketContext {
    #[serde(flatten)]
    pub snapshot: MarketSnapshot,
    pub relative: RelativeBasis,
}

impl MarketSnapshot {
    /// Attach basis fields computed against `current_price`
    pub fn with_reference(&self, current_price: Option<f64>) -> MarketContext {
        let diff = |other: Option<f64>| match (current_price, other) {
            (Some(a), Some(b)) => Some(a - b),
            _ => None,
        };
        MarketContext {
            relative: RelativeBasis {
                basis_vs_spot: diff(self.spot.last_price),
                basis_vs_mark: diff(self.futures.mark_price),
                basis_spot_vs_index: self.futures.basis_spot,
            },
            snapshot: self.clone(),
        }
    }
}

/// Compute momentum features from oldest-first klines
pub fn compute_momentum(klines: &[Kline]) -> Momentum {
    if klines.is_empty() {
        return Momentum::default();
    }

    let closes: Vec<f64> = klines.iter().filter_map(|k| k.close).collect();
    let volumes: Vec<f64> = klines.iter().filter_map(|k| k.volume).collect();
    let latest_close = closes.last().copied();

    let change = |len: usize| -> Option<f64> {
        let latest = latest_close?;
        let idx = closes.len().checked_sub(1 + len)?;
        let prev = closes[idx];
        if prev == 0.0 {
            return None;
        }
        Some((latest - prev) / prev * 100.0)
    };

    let sum_volumes = |count: usize, offset: usize| -> Option<f64> {
        let end = volumes.len().checked_sub(offset)?;
        let start = end.saturating_sub(count);
        if start >= end {
            return None;
        }
        Some(volumes[start..end].iter().sum())
    };

    let volume_spike_ratio = match (sum_volumes(5, 0), sum_volumes(5, 5)) {
        (Some(recent), Some(prev)) if recent != 0.0 && prev != 0.0 => Some(recent / prev),
        _ => None,
    };

    let high = klines.iter().filter_map(|k| k.high).fold(None, |acc: Option<f64>, v| {
        Some(acc.map_or(v, |a| a.max(v)))
    });
    let low = klines.iter().filter_map(|k| k.low).fold(None, |acc: Option<f64>, v| {
        Some(acc.map_or(v, |a| a.min(v)))
    });
    let range_pct = match (high, low, latest_close) {
        (Some(h), Some(l), Some(c)) if c != 0.0 => Some((h - l) / c * 100.0),
        _ => None,
    };

    Momentum {
        change_1m: change(1),
        change_5m: change(5),
        change_15m: change(15),
        change_30m: change(30),
        volume_spike_ratio,
        range_pct,
        atr14: atr(klines, 14),
    }
}

/// Average true range over the last `period` valid true ranges
pub fn atr(klines: &[Kline], period: usize) -> Option<f64> {
    let ranges: Vec<f64> = klines
        .windows(2)
        .filter_map(|w| {
            let prev_close = w[0].close?;
            let high = w[1].high?;
            let low = w[1].low?;
            Some(
                (high - low)
                    .max((high - prev_close).abs())
                    .max((low - prev_close).abs()),
            )
        })
        .collect();

    if period == 0 || ranges.len() < period {
        return None;
    }
    let tail = &ranges[ranges.len() - period..];
    Some(tail.iter().sum::<f64>() / period as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(high: f64, low: f64, close: f64, volume: f64) -> Kline {
        Kline {
            open_time: None,
            open: Some(close),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            volume: Some(volume),
        }
    }

    #[test]
    fn test_momentum_changes_and_volume_ratio() {
        let klines: Vec<Kline> = (0..10)
            .map(|i| {
                let close = 100.0 + i as f64;
                let volume = if i >= 5 { 20.0 } else { 10.0 };
                candle(close + 1.0, close - 1.0, close, volume)
            })
            .collect();

        let m = compute_momentum(&klines);
        assert!((m.change_1m.unwrap() - (109.0 - 108.0) / 108.0 * 100.0).abs() < 1e-9);
        assert!((m.change_5m.unwrap() - (109.0 - 104.0) / 104.0 * 100.0).abs() < 1e-9);
        assert!(m.change_15m.is_none());
        assert_eq!(m.volume_spike_ratio, Some(2.0));
        assert!((m.range_pct.unwrap() - (110.0 - 99.0) / 109.0 * 100.0).abs() < 1e-9);
        assert!(m.atr14.is_none());
    }

    #[test]
    fn test_atr_requires_full_window() {
        let klines: Vec<Kline> = (0..15).map(|_| candle(102.0, 98.0, 100.0, 1.0)).collect();
        assert_eq!(atr(&klines, 14), Some(4.0));
        assert_eq!(atr(&klines[..14], 14), None);
    }

    #[test]
    fn test_atr_uses_gap_from_previous_close() {
        let mut klines: Vec<Kline> = (0..14).map(|_| candle(101.0, 99.0, 100.0, 1.0)).collect();
        // gaps up: range 2, gap to previous close 10
        klines.push(candle(110.0, 108.0, 109.0, 1.0));
        let value = atr(&klines, 14).unwrap();
        assert!((value - (13.0 * 2.0 + 10.0) / 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_relative_basis_against_reference() {
        let snapshot = MarketSnapshot {
            source: "binance".to_string(),
            symbol: "ETHUSDT".to_string(),
            fetched_at: Utc::now(),
            spot: SpotTicker {
                last_price: Some(2500.0),
                ..Default::default()
            },
            momentum: Momentum::default(),
            futures: FuturesSnapshot {
                mark_price: Some(2502.0),
                basis_spot: Some(-1.5),
                ..Default::default()
            },
        };

        let ctx = snapshot.with_reference(Some(2505.0));
        assert_eq!(ctx.relative.basis_vs_spot, Some(5.0));
        assert_eq!(ctx.relative.basis_vs_mark, Some(3.0));
        assert_eq!(ctx.relative.basis_spot_vs_index, Some(-1.5));

        let ctx = snapshot.with_reference(None);
        assert_eq!(ctx.relative.basis_vs_spot, None);
    }
}
