//! Technical indicators over a price series
//!
//! Every function is pure. Period-gated indicators return `None` until the
//! series is long enough; nothing here ever produces a value computed from
//! too little data.

use serde::{Deserialize, Serialize};

/// Coarse trend label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

/// Bollinger band values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bollinger {
    pub upper: f64,
    pub lower: f64,
    pub basis: f64,
    pub bandwidth: f64,
}

/// Indicator values computed from one price history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSnapshot {
    pub ma5: Option<f64>,
    pub ma8: Option<f64>,
    pub ma20: Option<f64>,
    pub ema12: Option<f64>,
    pub ema26: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    /// Standard deviation of period returns, in percent
    pub volatility: f64,
    pub trend: Trend,
    pub rsi14: Option<f64>,
    pub bollinger: Option<Bollinger>,
    pub roc1: Option<f64>,
    pub roc5: Option<f64>,
    pub roc10: Option<f64>,
}

impl IndicatorSnapshot {
    /// Compute every indicator for `prices` (oldest first)
    pub fn compute(prices: &[f64]) -> Self {
        let ma20 = sma(prices, 20);
        let ema12 = ema(prices, 12);
        let ema26 = ema(prices, 26);

        let (macd, macd_signal, macd_histogram) = match (ema12, ema26) {
            (Some(fast), Some(slow)) => {
                let line = fast - slow;
                let signal = ema(&macd_series(prices), 9);
                (Some(line), signal, signal.map(|s| line - s))
            }
            _ => (None, None, None),
        };

        Self {
            ma5: sma(prices, 5),
            ma8: sma(prices, 8),
            ma20,
            ema12,
            ema26,
            macd,
            macd_signal,
            macd_histogram,
            volatility: volatility(prices),
            trend: trend(prices),
            rsi14: rsi(prices, 14),
            bollinger: bollinger(prices, 20),
            roc1: roc(prices, 1),
            roc5: roc(prices, 5),
            roc10: roc(prices, 10),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Arithmetic mean of the last `period` values
pub fn sma(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }
    Some(mean(&prices[prices.len() - period..]))
}

/// Exponential moving average seeded with the SMA of the first `period` values
pub fn ema(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }
    let k = 2.0 / (period as f64 + 1.0);
    let seed = mean(&prices[..period]);
    Some(
        prices[period..]
            .iter()
            .fold(seed, |acc, price| price * k + acc * (1.0 - k)),
    )
}

/// MACD line values from index 26 onward, used for the signal line.
///
/// Both averages are seeded with their own SMA and then stepped together
/// from the slow period to the end of the series.
fn macd_series(prices: &[f64]) -> Vec<f64> {
    const FAST: usize = 12;
    const SLOW: usize = 26;
    if prices.len() < SLOW {
        return Vec::new();
    }
    let k_fast = 2.0 / (FAST as f64 + 1.0);
    let k_slow = 2.0 / (SLOW as f64 + 1.0);
    let mut fast = mean(&prices[..FAST]);
    let mut slow = mean(&prices[..SLOW]);

    prices[SLOW..]
        .iter()
        .map(|price| {
            fast = price * k_fast + fast * (1.0 - k_fast);
            slow = price * k_slow + slow * (1.0 - k_slow);
            fast - slow
        })
        .collect()
}

/// Relative strength index over the last `period` transitions
pub fn rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() <= period {
        return None;
    }
    let (gains, losses) = prices[prices.len() - period - 1..]
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(g, l), change| {
            if change > 0.0 {
                (g + change, l)
            } else {
                (g, l - change)
            }
        });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;
    if avg_loss == 0.0 {
        return Some(100.0);
    }
    Some(100.0 - 100.0 / (1.0 + avg_gain / avg_loss))
}

fn population_stdev(values: &[f64]) -> f64 {
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Bollinger bands at two standard deviations
pub fn bollinger(prices: &[f64], period: usize) -> Option<Bollinger> {
    let basis = sma(prices, period)?;
    let stdev = population_stdev(&prices[prices.len() - period..]);
    Some(Bollinger {
        upper: basis + 2.0 * stdev,
        lower: basis - 2.0 * stdev,
        basis,
        bandwidth: 2.0 * stdev / basis,
    })
}

/// Rate of change over `lookback` periods, in percent
pub fn roc(prices: &[f64], lookback: usize) -> Option<f64> {
    if prices.len() < lookback + 1 {
        return None;
    }
    let last = prices[prices.len() - 1];
    let base = prices[prices.len() - 1 - lookback];
    if base <= 0.0 {
        return None;
    }
    Some((last - base) / base * 100.0)
}

/// Standard deviation of period returns times 100.
///
/// Returns are only taken from a strictly positive previous price; fewer than
/// two valid returns yields 0.
pub fn volatility(prices: &[f64]) -> f64 {
    let returns: Vec<f64> = prices
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }
    population_stdev(&returns) * 100.0
}

/// Trend from the change between the last price and the one at `len - 5`
pub fn trend(prices: &[f64]) -> Trend {
    let len = prices.len();
    if len < 5 || prices[len - 5] == 0.0 {
        return Trend::Neutral;
    }
    let change = (prices[len - 1] - prices[len - 5]) / prices[len - 5];
    if change > 0.001 {
        Trend::Bullish
    } else if change < -0.001 {
        Trend::Bearish
    } else {
        Trend::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn ramp(len: usize) -> Vec<f64> {
        (0..len).map(|i| 100.0 + i as f64).collect()
    }

    #[test]
    fn test_gated_indicators_are_none_on_short_history() {
        let prices = ramp(4);
        let snap = IndicatorSnapshot::compute(&prices);
        assert!(snap.ma5.is_none());
        assert!(snap.ma8.is_none());
        assert!(snap.ma20.is_none());
        assert!(snap.ema12.is_none());
        assert!(snap.ema26.is_none());
        assert!(snap.macd.is_none());
        assert!(snap.macd_signal.is_none());
        assert!(snap.rsi14.is_none());
        assert!(snap.bollinger.is_none());
        assert!(snap.roc5.is_none());
        assert!(snap.roc10.is_none());
        assert!(snap.roc1.is_some());
    }

    #[test]
    fn test_empty_history() {
        let snap = IndicatorSnapshot::compute(&[]);
        assert!(snap.roc1.is_none());
        assert_eq!(snap.volatility, 0.0);
        assert_eq!(snap.trend, Trend::Neutral);
    }

    #[test]
    fn test_sma_uses_last_values() {
        let prices = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert!((sma(&prices, 5).unwrap() - 4.0).abs() < EPS);
    }

    #[test]
    fn test_ema_of_constant_series_is_constant() {
        let prices = vec![42.5; 30];
        assert!((ema(&prices, 12).unwrap() - 42.5).abs() < EPS);
        assert!((ema(&prices, 26).unwrap() - 42.5).abs() < EPS);
        assert!((ema(&prices[..12], 12).unwrap() - 42.5).abs() < EPS);
    }

    #[test]
    fn test_rsi_gating_and_monotonic_series() {
        assert!(rsi(&ramp(14), 14).is_none());
        assert_eq!(rsi(&ramp(15), 14), Some(100.0));
    }

    #[test]
    fn test_rsi_balanced_moves_is_fifty() {
        let prices: Vec<f64> = (0..15)
            .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
            .collect();
        let value = rsi(&prices, 14).unwrap();
        assert!((value - 50.0).abs() < EPS);
    }

    #[test]
    fn test_macd_line_and_signal_gating() {
        assert!(IndicatorSnapshot::compute(&ramp(25)).macd.is_none());

        let snap = IndicatorSnapshot::compute(&ramp(26));
        assert!(snap.macd.is_some());
        assert!(snap.macd_signal.is_none());

        // 26 seeds + 9 MACD points
        let snap = IndicatorSnapshot::compute(&ramp(35));
        assert!(snap.macd_signal.is_some());
        let hist = snap.macd.unwrap() - snap.macd_signal.unwrap();
        assert!((snap.macd_histogram.unwrap() - hist).abs() < EPS);
    }

    #[test]
    fn test_macd_is_zero_on_constant_series() {
        let snap = IndicatorSnapshot::compute(&vec![10.0; 40]);
        assert!(snap.macd.unwrap().abs() < EPS);
        assert!(snap.macd_signal.unwrap().abs() < EPS);
    }

    #[test]
    fn test_bollinger_bands() {
        let mut prices = vec![10.0; 10];
        prices.extend(vec![12.0; 10]);
        let band = bollinger(&prices, 20).unwrap();
        assert!((band.basis - 11.0).abs() < EPS);
        assert!((band.upper - 13.0).abs() < EPS);
        assert!((band.lower - 9.0).abs() < EPS);
        assert!((band.bandwidth - 2.0 / 11.0).abs() < EPS);
    }

    #[test]
    fn test_roc_handles_lookback_and_denominator() {
        let prices = [100.0, 110.0];
        assert!((roc(&prices, 1).unwrap() - 10.0).abs() < EPS);
        assert!(roc(&prices, 2).is_none());
        assert!(roc(&[0.0, 5.0], 1).is_none());
        assert!(roc(&[-1.0, 5.0], 1).is_none());
    }

    #[test]
    fn test_volatility_requires_two_valid_returns() {
        assert_eq!(volatility(&[100.0, 101.0]), 0.0);
        // the zero price invalidates the only other return
        assert_eq!(volatility(&[0.0, 100.0, 101.0]), 0.0);
        assert!(volatility(&[100.0, 101.0, 99.0]) > 0.0);
    }

    #[test]
    fn test_volatility_constant_returns_is_zero() {
        let prices = [100.0, 110.0, 121.0];
        assert!(volatility(&prices).abs() < 1e-9);
    }

    #[test]
    fn test_trend_labels() {
        assert_eq!(trend(&[100.0, 100.0, 100.0, 100.0, 101.0]), Trend::Bullish);
        assert_eq!(trend(&[100.0, 100.0, 100.0, 100.0, 99.0]), Trend::Bearish);
        assert_eq!(trend(&[100.0, 100.0, 100.0, 100.0, 100.05]), Trend::Neutral);
        assert_eq!(trend(&[100.0, 200.0]), Trend::Neutral);
    }

    #[test]
    fn test_snapshot_serializes_with_wire_names() {
        let json = serde_json::to_value(IndicatorSnapshot::compute(&ramp(20))).unwrap();
        assert!(json.get("macdSignal").is_some());
        assert!(json.get("rsi14").is_some());
        assert_eq!(json["trend"], "bullish");
    }
}
