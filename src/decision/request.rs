//! Feature payload sent to the decision provider

use serde::{Deserialize, Serialize};

use crate::common::types::Direction;
use crate::indicators::IndicatorSnapshot;
use crate::market::MarketContext;
use crate::state::{TrackedPosition, TradingStats};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionPayload {
    pub has_position: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_price: Option<f64>,
}

impl From<Option<&TrackedPosition>> for PositionPayload {
    fn from(position: Option<&TrackedPosition>) -> Self {
        match position {
            Some(p) => Self {
                has_position: true,
                direction: Some(p.direction),
                size: Some(p.size),
                entry_price: p.entry_price,
            },
            None => Self {
                has_position: false,
                direction: None,
                size: None,
                entry_price: None,
            },
        }
    }
}

/// Request body for the decision endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub symbol: String,
    pub current_price: f64,
    pub price_history: Vec<f64>,
    /// Percent change from the oldest price in the history
    pub price_change: Option<f64>,
    pub indicators: IndicatorSnapshot,
    pub position: PositionPayload,
    pub trading_stats: TradingStats,
    pub external_market: Option<MarketContext>,
    /// Epoch millis
    pub timestamp: i64,
}

/// Percent change from the first to `current`
pub fn price_change(history: &[f64], current: f64) -> Option<f64> {
    let first = *history.first()?;
    if first == 0.0 || !first.is_finite() {
        return None;
    }
    Some((current - first) / first * 100.0)
}
