//! Pure risk checks over ledger snapshots

use std::fmt;

use chrono::{DateTime, Utc};

use crate::common::types::{Direction, Side};
use crate::config::types::RiskConfig;
use crate::state::position::{PnlLedger, TrackedPosition};

/// Global limit that was breached
#[derive(Debug, Clone, PartialEq)]
pub enum RiskBreach {
    DailyLossLimit { daily_realized: f64, limit: f64 },
    ConsecutiveLosses { count: u32, limit: u32 },
}

impl fmt::Display for RiskBreach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskBreach::DailyLossLimit {
                daily_realized,
                limit,
            } => write!(
                f,
                "daily loss limit reached ({:.2} <= {})",
                daily_realized, limit
            ),
            RiskBreach::ConsecutiveLosses { count, limit } => {
                write!(f, "consecutive losses reached limit ({} >= {})", count, limit)
            }
        }
    }
}

/// Why a position should be closed
#[derive(Debug, Clone, PartialEq)]
pub enum ExitReason {
    StopLoss { pnl_pct: f64 },
    TakeProfit { pnl_pct: f64 },
    MaxHoldDuration { max_minutes: f64 },
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::StopLoss { pnl_pct } => write!(f, "stop-loss hit at {:.2}%", pnl_pct),
            ExitReason::TakeProfit { pnl_pct } => write!(f, "take-profit hit at {:.2}%", pnl_pct),
            ExitReason::MaxHoldDuration { max_minutes } => {
                write!(f, "max hold duration of {} minutes exceeded", max_minutes)
            }
        }
    }
}

/// Close instruction produced by a risk exit
#[derive(Debug, Clone, PartialEq)]
pub struct RiskExit {
    pub side: Side,
    pub size: f64,
    pub direction: Direction,
    pub reason: ExitReason,
}

/// Check daily loss first, then the losing streak (ignored when its limit is 0)
pub fn check_global_limits(pnl: &PnlLedger, config: &RiskConfig) -> Option<RiskBreach> {
    if config.daily_loss_limit.is_finite() && pnl.daily_realized <= config.daily_loss_limit {
        return Some(RiskBreach::DailyLossLimit {
            daily_realized: pnl.daily_realized,
            limit: config.daily_loss_limit,
        });
    }

    if config.max_consecutive_losses > 0 && pnl.consecutive_losses >= config.max_consecutive_losses
    {
        return Some(RiskBreach::ConsecutiveLosses {
            count: pnl.consecutive_losses,
            limit: config.max_consecutive_losses,
        });
    }

    None
}

/// Unrealized PnL in percent, sign flipped for shorts
pub fn unrealized_pnl_pct(position: &TrackedPosition, current_price: Option<f64>) -> Option<f64> {
    let entry = position.entry_price.filter(|e| *e > 0.0)?;
    let price = current_price?;
    let change = (price - entry) / entry * 100.0;
    Some(match position.direction {
        Direction::Long => change,
        Direction::Short => -change,
    })
}

fn threshold(value: f64) -> Option<f64> {
    value.is_finite().then(|| value.abs())
}

/// Stop-loss, then take-profit, then max hold; the first that applies wins
pub fn check_position_exit(
    position: &TrackedPosition,
    current_price: Option<f64>,
    now: DateTime<Utc>,
    config: &RiskConfig,
) -> Option<ExitReason> {
    let pnl_pct = unrealized_pnl_pct(position, current_price);
    let elapsed_minutes = (now - position.opened_at).num_milliseconds() as f64 / 60_000.0;

    if let (Some(stop), Some(pct)) = (threshold(config.stop_loss_pct), pnl_pct) {
        if pct <= -stop {
            return Some(ExitReason::StopLoss { pnl_pct: pct });
        }
    }
    if let (Some(take), Some(pct)) = (threshold(config.take_profit_pct), pnl_pct) {
        if pct >= take {
            return Some(ExitReason::TakeProfit { pnl_pct: pct });
        }
    }
    if let Some(max_minutes) = threshold(config.max_hold_minutes) {
        if elapsed_minutes >= max_minutes {
            return Some(ExitReason::MaxHoldDuration { max_minutes });
        }
    }

    None
}
