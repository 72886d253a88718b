//! Trading state ledger owned by the control loop

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::checkpoint::{CheckpointStore, LedgerCheckpoint, CHECKPOINT_VERSION};
use super::position::{PnlLedger, SignalHistory, TrackedPosition};
use crate::common::errors::Result;
use crate::common::numeric::{finite, round_to};
use crate::common::types::{LiveOrder, ObservedPosition, Side, Signal, TradeKind, TradeSubmission};
use crate::config::types::RiskConfig;
use crate::orders::{self, PendingOrderIntent, PendingOrders};
use crate::risk::{self, RiskBreach, RiskExit};

/// Outcome of a global risk evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct RiskStatus {
    pub paused: bool,
    pub reason: Option<RiskBreach>,
}

/// Ledger figures reported to the decision provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingStats {
    pub total_trades: u64,
    pub total_volume: f64,
    pub realized_pnl: f64,
    pub daily_realized: f64,
    pub consecutive_losses: u32,
    /// Epoch millis, 0 when no pause is set
    pub risk_pause_until: i64,
    /// Minutes since the ledger was created
    pub session_duration: i64,
}

/// Local view of position, order intents, PnL and risk pause.
///
/// Every method that depends on time takes `now` explicitly.
#[derive(Debug, Clone)]
pub struct TradingLedger {
    risk: RiskConfig,
    position: Option<TrackedPosition>,
    pending: PendingOrders,
    last_orders: Vec<LiveOrder>,
    signals: SignalHistory,
    pnl: PnlLedger,
    risk_pause_until: Option<DateTime<Utc>>,
    trade_count: u64,
    total_volume: f64,
    started_at: DateTime<Utc>,
}

impl TradingLedger {
    pub fn new(risk: RiskConfig, now: DateTime<Utc>) -> Self {
        Self {
            risk,
            position: None,
            pending: PendingOrders::default(),
            last_orders: Vec::new(),
            signals: SignalHistory::default(),
            pnl: PnlLedger::default(),
            risk_pause_until: None,
            trade_count: 0,
            total_volume: 0.0,
            started_at: now,
        }
    }

    pub fn position(&self) -> Option<&TrackedPosition> {
        self.position.as_ref()
    }

    pub fn pending_orders(&self) -> &PendingOrders {
        &self.pending
    }

    pub fn last_orders(&self) -> &[LiveOrder] {
        &self.last_orders
    }

    pub fn signal_history(&self) -> SignalHistory {
        self.signals
    }

    pub fn pnl(&self) -> &PnlLedger {
        &self.pnl
    }

    pub fn risk_pause_until(&self) -> Option<DateTime<Utc>> {
        self.risk_pause_until
    }

    pub fn trade_count(&self) -> u64 {
        self.trade_count
    }

    pub fn total_volume(&self) -> f64 {
        self.total_volume
    }

    fn max_order_wait(&self) -> Option<Duration> {
        let secs = finite(self.risk.max_order_wait_seconds)?;
        Some(Duration::milliseconds((secs * 1000.0) as i64))
    }

    /// Fold the venue's reported position into the tracked one.
    ///
    /// A new or flipped direction replaces the position; the same direction
    /// only refreshes size and backfills an unknown entry price.
    pub fn sync_position_state(
        &mut self,
        observed: Option<&ObservedPosition>,
        current_price: Option<f64>,
        now: DateTime<Utc>,
    ) {
        let Some(observed) = observed else {
            if self.position.take().is_some() {
                debug!("Venue reports no position, clearing tracked position");
            }
            return;
        };

        let current_price = current_price.and_then(finite);
        match self.position.as_mut() {
            Some(tracked) if tracked.direction == observed.direction => {
                if let Some(size) = observed.size.and_then(finite) {
                    tracked.size = size;
                }
                if tracked.entry_price.is_none() {
                    tracked.entry_price = current_price;
                }
            }
            _ => {
                info!(
                    "Tracking {} position reported by venue (entry {:?})",
                    observed.direction, current_price
                );
                self.position = Some(TrackedPosition::new(
                    observed.direction,
                    observed.size.and_then(finite).unwrap_or(0.0),
                    current_price,
                    now,
                ));
            }
        }
    }

    /// Record a submission the venue accepted.
    ///
    /// Returns the realized PnL for closes.
    pub fn record_trade_submission(
        &mut self,
        submission: &TradeSubmission,
        now: DateTime<Utc>,
    ) -> Option<f64> {
        let qty = finite(submission.size).unwrap_or(0.0);
        self.trade_count += 1;
        self.total_volume += qty * submission.price;

        match submission.kind {
            TradeKind::Open => {
                self.position = Some(TrackedPosition::new(
                    submission.side.opens(),
                    qty,
                    Some(submission.price),
                    now,
                ));
                self.pending.set(
                    submission.side,
                    PendingOrderIntent {
                        price: submission.price,
                        amount: qty,
                        created_at: now,
                        expires_at: self.max_order_wait().map(|wait| now + wait),
                    },
                );
                self.signals.reset();
                None
            }
            TradeKind::Close => {
                let active = self.position.take();
                let direction = active
                    .as_ref()
                    .map(|p| p.direction)
                    .unwrap_or_else(|| submission.side.closes());
                let effective_qty = if qty > 0.0 {
                    qty
                } else {
                    active.as_ref().map_or(0.0, |p| p.size)
                };
                let closed = active.unwrap_or_else(|| {
                    TrackedPosition::new(direction, effective_qty, None, now)
                });
                let pnl = closed.pnl_at(submission.price, effective_qty);

                self.pnl.record_close(pnl, now.date_naive());
                self.pending.clear(direction.closing_side());

                info!(
                    "Closed {} at {:.2}: pnl {:.4}, daily {:.4}, losing streak {}",
                    direction,
                    submission.price,
                    pnl,
                    self.pnl.daily_realized,
                    self.pnl.consecutive_losses
                );
                Some(pnl)
            }
        }
    }

    pub fn update_signal_history(&mut self, signal: Signal) -> u32 {
        self.signals.observe(signal)
    }

    pub fn has_required_confirmation(&self, signal: Signal) -> bool {
        self.signals
            .confirms(signal, self.risk.signal_confirmation_count)
    }

    /// Apply the daily reset, then pause trading on a limit breach
    pub fn evaluate_global_risk(&mut self, now: DateTime<Utc>) -> RiskStatus {
        if !self.risk.enabled {
            return RiskStatus {
                paused: false,
                reason: None,
            };
        }

        self.pnl.roll_day(now.date_naive());

        match risk::check_global_limits(&self.pnl, &self.risk) {
            Some(breach) => {
                let minutes = self.risk.pause_minutes_on_breach;
                if minutes.is_finite() && minutes > 0.0 {
                    let until = now + Duration::milliseconds((minutes * 60_000.0) as i64);
                    self.risk_pause_until = Some(until);
                    warn!("Risk pause until {}: {}", until, breach);
                }
                RiskStatus {
                    paused: true,
                    reason: Some(breach),
                }
            }
            None => RiskStatus {
                paused: false,
                reason: None,
            },
        }
    }

    pub fn can_trade(&self, now: DateTime<Utc>) -> bool {
        if !self.risk.enabled {
            return true;
        }
        self.risk_pause_until.map_or(true, |until| now >= until)
    }

    /// Decide whether the tracked position must be closed for risk reasons.
    ///
    /// Marks the position as having a pending risk exit, and returns `None`
    /// while an earlier exit is still resting at the venue.
    pub fn evaluate_risk_exit(
        &mut self,
        current_price: Option<f64>,
        now: DateTime<Utc>,
    ) -> Option<RiskExit> {
        if !self.risk.enabled {
            return None;
        }
        let position = self.position.as_ref()?;
        let close_side = position.direction.closing_side();
        let current_price = current_price.and_then(finite);

        let close_order_live = current_price.is_some_and(|price| {
            orders::find_matching_order(&self.last_orders, close_side, price, Some(position.size))
                .is_some()
        });

        if position.pending_risk_exit {
            if close_order_live || self.pending.is_occupied(close_side) {
                debug!("Risk exit already resting, skipping re-evaluation");
                return None;
            }
            debug!("Pending risk exit no longer visible, re-evaluating");
        }

        let reason = risk::check_position_exit(position, current_price, now, &self.risk);
        let position = self.position.as_mut()?;
        position.pending_risk_exit = false;
        let reason = reason?;

        position.pending_risk_exit = true;
        if close_order_live {
            debug!("Close order already live for {}, not submitting another", reason);
            return None;
        }

        warn!("Risk exit triggered: {}", reason);
        Some(RiskExit {
            side: close_side,
            size: position.size,
            direction: position.direction,
            reason,
        })
    }

    pub fn has_outstanding_orders(&self) -> bool {
        !self.pending.is_empty() || !self.last_orders.is_empty()
    }

    /// True when an unfilled live order rests on `side`
    pub fn has_live_order_on(&self, side: Side) -> bool {
        self.last_orders
            .iter()
            .any(|order| order.side == side && order.is_unfilled())
    }

    /// Replace the live order snapshot and prune intents it no longer shows
    pub fn update_orders_snapshot(&mut self, live_orders: Vec<LiveOrder>) {
        self.last_orders = live_orders;
        for side in Side::ALL {
            orders::prune_pending_by_side(&mut self.pending, side, &self.last_orders);
        }
    }

    pub fn find_stale_orders(&mut self, now: DateTime<Utc>) -> Vec<LiveOrder> {
        if !self.risk.enabled {
            return Vec::new();
        }
        let Some(max_age) = self.max_order_wait() else {
            return Vec::new();
        };
        orders::find_stale_orders(&mut self.pending, &self.last_orders, now, max_age)
    }

    /// Drop the intent on the cancelled order's side if that order was the one it tracked
    pub fn release_cancelled_order(&mut self, order: &LiveOrder) {
        let tracked = self
            .pending
            .get(order.side)
            .is_some_and(|intent| orders::matches_intent(order, order.side, intent));
        if tracked {
            self.pending.clear(order.side);
        } else {
            debug!("Cancelled {} order was not the tracked intent, keeping it", order.side);
        }
    }

    pub fn stats(&self, now: DateTime<Utc>) -> TradingStats {
        TradingStats {
            total_trades: self.trade_count,
            total_volume: round_to(self.total_volume, 2),
            realized_pnl: round_to(self.pnl.realized, 2),
            daily_realized: round_to(self.pnl.daily_realized, 2),
            consecutive_losses: self.pnl.consecutive_losses,
            risk_pause_until: self
                .risk_pause_until
                .map_or(0, |until| until.timestamp_millis()),
            session_duration: (now - self.started_at).num_minutes(),
        }
    }

    pub fn checkpoint(&self, now: DateTime<Utc>) -> LedgerCheckpoint {
        LedgerCheckpoint {
            version: CHECKPOINT_VERSION,
            saved_at: now,
            trade_count: self.trade_count,
            total_volume: self.total_volume,
            pnl: self.pnl.clone(),
            risk_pause_until: self.risk_pause_until,
        }
    }

    pub async fn save(&self, store: &CheckpointStore, now: DateTime<Utc>) -> Result<()> {
        store.write(&self.checkpoint(now)).await
    }

    /// Load durable fields from `store`.
    ///
    /// Returns `Ok(false)` when there is no checkpoint, or it has an unknown
    /// version, or it is older than `max_age`.
    pub async fn restore(
        &mut self,
        store: &CheckpointStore,
        now: DateTime<Utc>,
        max_age: Duration,
    ) -> Result<bool> {
        let Some(checkpoint) = store.read().await? else {
            return Ok(false);
        };

        if checkpoint.version != CHECKPOINT_VERSION {
            warn!(
                "Ignoring checkpoint with version {} (expected {})",
                checkpoint.version, CHECKPOINT_VERSION
            );
            return Ok(false);
        }
        if now - checkpoint.saved_at > max_age {
            info!(
                "Ignoring checkpoint saved at {}, older than {} minutes",
                checkpoint.saved_at,
                max_age.num_minutes()
            );
            return Ok(false);
        }

        self.trade_count = checkpoint.trade_count;
        self.total_volume = checkpoint.total_volume;
        self.pnl = checkpoint.pnl;
        self.risk_pause_until = checkpoint.risk_pause_until;
        info!(
            "Restored ledger: {} trades, realized {:.2}",
            self.trade_count, self.pnl.realized
        );
        Ok(true)
    }
}
