//! Ledger records: tracked position, realized PnL and signal confirmation

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::common::types::{Direction, Signal};

/// Position as tracked by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedPosition {
    pub direction: Direction,
    pub size: f64,
    /// `None` until a finite price has been seen for it
    pub entry_price: Option<f64>,
    pub opened_at: DateTime<Utc>,
    /// A risk exit was submitted and has not been reconciled yet
    pub pending_risk_exit: bool,
}

impl TrackedPosition {
    pub fn new(
        direction: Direction,
        size: f64,
        entry_price: Option<f64>,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            direction,
            size,
            entry_price,
            opened_at,
            pending_risk_exit: false,
        }
    }

    /// Realized PnL of closing `qty` at `exit_price`
    pub fn pnl_at(&self, exit_price: f64, qty: f64) -> f64 {
        let entry = self.entry_price.unwrap_or(exit_price);
        match self.direction {
            Direction::Long => (exit_price - entry) * qty,
            Direction::Short => (entry - exit_price) * qty,
        }
    }
}

/// Realized PnL, reset daily on first use after the UTC date rolls over
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PnlLedger {
    pub realized: f64,
    pub daily_realized: f64,
    pub daily_date: Option<NaiveDate>,
    pub consecutive_losses: u32,
    pub last_trade_pnl: Option<f64>,
}

impl PnlLedger {
    /// Reset the daily figures when `today` differs from the tracked date
    pub fn roll_day(&mut self, today: NaiveDate) {
        if self.daily_date != Some(today) {
            self.daily_date = Some(today);
            self.daily_realized = 0.0;
            self.consecutive_losses = 0;
        }
    }

    pub fn record_close(&mut self, pnl: f64, today: NaiveDate) {
        self.roll_day(today);
        self.realized += pnl;
        self.daily_realized += pnl;
        self.last_trade_pnl = Some(pnl);
        if pnl < 0.0 {
            self.consecutive_losses += 1;
        } else {
            self.consecutive_losses = 0;
        }
    }
}

/// Run of identical directional signals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalHistory {
    pub last: Option<Signal>,
    pub count: u32,
}

impl SignalHistory {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Fold in one signal and return the current run length
    pub fn observe(&mut self, signal: Signal) -> u32 {
        if !signal.is_directional() {
            self.reset();
        } else if self.last == Some(signal) {
            self.count += 1;
        } else {
            self.last = Some(signal);
            self.count = 1;
        }
        self.count
    }

    pub fn confirms(&self, signal: Signal, required: u32) -> bool {
        if required <= 1 {
            return true;
        }
        signal.is_directional() && self.last == Some(signal) && self.count >= required
    }
}
