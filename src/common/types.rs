//! Shared domain types used across the venue, ledger and control loop

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Both sides, in the order pending-intent slots are scanned
    pub const ALL: [Side; 2] = [Side::Buy, Side::Sell];

    /// Direction of the position an opening order on this side creates
    pub fn opens(self) -> Direction {
        match self {
            Side::Buy => Direction::Long,
            Side::Sell => Direction::Short,
        }
    }

    /// Direction of the position a closing order on this side exits
    pub fn closes(self) -> Direction {
        match self {
            Side::Buy => Direction::Short,
            Side::Sell => Direction::Long,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Position direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Side of the order that closes a position in this direction
    pub fn closing_side(self) -> Side {
        match self {
            Direction::Long => Side::Sell,
            Direction::Short => Side::Buy,
        }
    }

    /// True when `signal` calls for the opposite exposure
    pub fn is_opposed_by(self, signal: Signal) -> bool {
        matches!(
            (self, signal),
            (Direction::Long, Signal::Sell) | (Direction::Short, Signal::Buy)
        )
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// Directional call from the decision provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    /// Coerce a provider label; anything other than buy/sell is `Hold`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "buy" => Signal::Buy,
            "sell" => Signal::Sell,
            _ => Signal::Hold,
        }
    }

    /// The order side for a directional signal
    pub fn side(self) -> Option<Side> {
        match self {
            Signal::Buy => Some(Side::Buy),
            Signal::Sell => Some(Side::Sell),
            Signal::Hold => None,
        }
    }

    pub fn is_directional(self) -> bool {
        self != Signal::Hold
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
            Signal::Hold => write!(f, "HOLD"),
        }
    }
}

/// Whether a submission opens or closes exposure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeKind {
    Open,
    Close,
}

/// Position as reported by the venue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedPosition {
    pub direction: Direction,
    /// Reported size; `None` when the venue value was unreadable
    pub size: Option<f64>,
}

/// A resting order as reported by the venue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveOrder {
    /// Row position in the venue's order list
    pub index: usize,
    pub side: Side,
    pub price: f64,
    pub filled_qty: f64,
    pub total_qty: f64,
    #[serde(default)]
    pub order_id: Option<String>,
    /// Submit time reported by the venue
    #[serde(default)]
    pub order_time: Option<DateTime<Utc>>,
}

impl LiveOrder {
    /// Key used to deduplicate orders across staleness sources
    pub fn dedup_key(&self) -> String {
        match &self.order_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => format!("{}-{}-{}", self.side.as_str(), self.price, self.index),
        }
    }

    pub fn is_unfilled(&self) -> bool {
        self.filled_qty < self.total_qty
    }
}

/// Limit order to place at the venue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub side: Side,
    pub price: f64,
    pub size: f64,
}

/// A submission the ledger records once the venue accepted it
#[derive(Debug, Clone, PartialEq)]
pub struct TradeSubmission {
    pub side: Side,
    pub price: f64,
    pub size: f64,
    pub kind: TradeKind,
}
