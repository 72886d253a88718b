//! The control loop: observe, reconcile, evaluate risk, decide, act, sleep

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use super::pricing::{compute_trade_price, next_delay, order_offset};
use crate::common::channels::ShutdownSignal;
use crate::common::errors::Result;
use crate::common::numeric::finite;
use crate::common::traits::{DecisionProvider, Venue};
use crate::common::types::{OrderRequest, Side, Signal, TradeKind, TradeSubmission};
use crate::config::types::AppConfig;
use crate::decision::{price_change, DecisionRequest, PositionPayload};
use crate::indicators::{IndicatorSnapshot, PriceHistory};
use crate::market::MarketContextCache;
use crate::state::{CheckpointStore, TradingLedger};

/// Loop phase derived from the history fill level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Collecting,
    Trading,
}

/// What a cycle ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleAction {
    /// Price, position or orders could not be read
    ObservationFailed,
    /// History not full yet
    Collecting,
    RiskPaused,
    RiskExit { submitted: bool },
    SignalClose { submitted: bool },
    Open { submitted: bool },
    /// A position is held and the signal does not oppose it
    HoldPosition,
    AwaitingOrders,
    AwaitingConfirmation,
    /// Flat with a non-directional signal
    Idle,
}

/// Result of one cycle, including the sleep chosen for the next one
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub phase: Phase,
    pub action: CycleAction,
    pub signal: Option<Signal>,
    pub delay: Duration,
}

/// Await `fut` within `limit`, logging and swallowing any failure
async fn bounded<T, F>(what: &str, limit: Duration, fut: F) -> Option<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            warn!("{} failed: {}", what, e);
            None
        }
        Err(_) => {
            warn!("{} timed out after {:?}", what, limit);
            None
        }
    }
}

/// Owns the price history and ledger; runs one cycle at a time
pub struct ControlLoop {
    config: AppConfig,
    venue: Arc<dyn Venue>,
    decisions: Arc<dyn DecisionProvider>,
    market: MarketContextCache,
    history: PriceHistory,
    ledger: TradingLedger,
    checkpoint: Option<CheckpointStore>,
    phase: Phase,
    rng: StdRng,
}

impl ControlLoop {
    pub fn new(
        config: AppConfig,
        venue: Arc<dyn Venue>,
        decisions: Arc<dyn DecisionProvider>,
        market: MarketContextCache,
    ) -> Self {
        let history = PriceHistory::new(config.trading.price_history_length);
        let ledger = TradingLedger::new(config.risk.clone(), Utc::now());
        Self {
            config,
            venue,
            decisions,
            market,
            history,
            ledger,
            checkpoint: None,
            phase: Phase::Collecting,
            rng: StdRng::from_entropy(),
        }
    }

    /// Persist the ledger to `store` at controlled points
    pub fn with_checkpoint(mut self, store: CheckpointStore) -> Self {
        self.checkpoint = Some(store);
        self
    }

    /// Replace the ledger, e.g. with one restored from a checkpoint
    pub fn with_ledger(mut self, ledger: TradingLedger) -> Self {
        self.ledger = ledger;
        self
    }

    /// Deterministic trading intervals
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn history(&self) -> &PriceHistory {
        &self.history
    }

    pub fn ledger(&self) -> &TradingLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut TradingLedger {
        &mut self.ledger
    }

    fn call_timeout(&self) -> Duration {
        self.config.trading.call_timeout()
    }

    fn outcome(&self, action: CycleAction, signal: Option<Signal>, delay: Duration) -> CycleOutcome {
        CycleOutcome {
            phase: self.phase,
            action,
            signal,
            delay,
        }
    }

    /// Run cycles until `shutdown` fires, then write a final checkpoint
    pub async fn run(&mut self, mut shutdown: ShutdownSignal) {
        info!(
            "Control loop started on {} for {}",
            self.venue.venue_name(),
            self.config.trading.ticker
        );

        while !shutdown.is_triggered() {
            let outcome = self.run_cycle().await;
            debug!(
                "Cycle finished: {:?} ({:?}), next in {:?}",
                outcome.action, outcome.phase, outcome.delay
            );

            tokio::select! {
                _ = tokio::time::sleep(outcome.delay) => {}
                _ = shutdown.triggered() => {
                    info!("Stop requested, leaving control loop");
                    break;
                }
            }
        }

        self.save_checkpoint().await;
    }

    async fn save_checkpoint(&self) {
        if let Some(store) = &self.checkpoint {
            if let Err(e) = self.ledger.save(store, Utc::now()).await {
                warn!("Failed to write checkpoint: {}", e);
            }
        }
    }

    /// Execute one full cycle
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let limit = self.call_timeout();
        let retry = Duration::from_secs(self.config.trading.retry_backoff_sec);

        let price = bounded("Price observation", limit, self.venue.current_price())
            .await
            .flatten()
            .and_then(finite);
        let Some(price) = price else {
            warn!("No price available, retrying in {:?}", retry);
            return self.outcome(CycleAction::ObservationFailed, None, retry);
        };
        let Some(position) =
            bounded("Position observation", limit, self.venue.current_position()).await
        else {
            return self.outcome(CycleAction::ObservationFailed, None, retry);
        };
        let Some(live_orders) = bounded("Order observation", limit, self.venue.live_orders()).await
        else {
            return self.outcome(CycleAction::ObservationFailed, None, retry);
        };

        let now = Utc::now();
        self.history.push(price);
        let prices = self.history.to_vec();
        let indicators = IndicatorSnapshot::compute(&prices);
        self.ledger
            .sync_position_state(position.as_ref(), Some(price), now);
        self.ledger.update_orders_snapshot(live_orders);

        if !self.history.is_full() {
            debug!(
                "Collecting prices {}/{}",
                self.history.len(),
                self.history.capacity()
            );
            let delay = next_delay(true, &self.config.trading, &mut self.rng);
            return self.outcome(CycleAction::Collecting, None, delay);
        }
        if self.phase == Phase::Collecting {
            info!(
                "Price history full ({} samples), entering trading phase",
                self.history.len()
            );
            self.phase = Phase::Trading;
        }

        let delay = next_delay(false, &self.config.trading, &mut self.rng);

        let status = self.ledger.evaluate_global_risk(now);
        if status.paused {
            if let Some(reason) = &status.reason {
                warn!("Risk limit breached: {}", reason);
            }
            self.save_checkpoint().await;
        }

        let can_trade = self.ledger.can_trade(now);
        if can_trade || self.config.risk.cancel_stale_while_paused {
            self.cancel_stale_orders().await;
        }
        if !can_trade {
            info!(
                "Trading paused until {:?}, next check in {:?}",
                self.ledger.risk_pause_until(),
                delay
            );
            return self.outcome(CycleAction::RiskPaused, None, delay);
        }

        let request = DecisionRequest {
            symbol: self.config.trading.ticker.clone(),
            current_price: price,
            price_change: price_change(&prices, price),
            price_history: prices,
            indicators: indicators.clone(),
            position: PositionPayload::from(self.ledger.position()),
            trading_stats: self.ledger.stats(now),
            external_market: self.market.get(Some(price)).await,
            timestamp: now.timestamp_millis(),
        };
        let signal = bounded("Decision request", limit, self.decisions.decide(&request))
            .await
            .unwrap_or(Signal::Hold);
        let run = self.ledger.update_signal_history(signal);
        info!("Decision: {} (run of {})", signal, run);

        let offset = order_offset(
            indicators.volatility,
            &self.config.dynamic_offset,
            self.config.trading.price_offset,
        );

        if let Some(exit) = self.ledger.evaluate_risk_exit(Some(price), now) {
            let target = compute_trade_price(exit.side, price, offset);
            info!(
                "Risk exit ({}): {} {} @ {:.2}",
                exit.reason, exit.side, exit.size, target
            );
            let submitted = self
                .submit(exit.side, target, exit.size, TradeKind::Close)
                .await;
            if !submitted {
                warn!("Risk exit submission failed, retrying next cycle");
            }
            return self.outcome(CycleAction::RiskExit { submitted }, Some(signal), delay);
        }

        let action = match self.ledger.position().cloned() {
            Some(position) if position.direction.is_opposed_by(signal) => {
                let close_side = position.direction.closing_side();
                if self.ledger.has_live_order_on(close_side) {
                    debug!("Close order already resting on {}", close_side);
                    CycleAction::AwaitingOrders
                } else {
                    let target = compute_trade_price(close_side, price, offset);
                    info!(
                        "Closing {} on opposing signal: {} {} @ {:.2}",
                        position.direction, close_side, position.size, target
                    );
                    let submitted = self
                        .submit(close_side, target, position.size, TradeKind::Close)
                        .await;
                    CycleAction::SignalClose { submitted }
                }
            }
            Some(position) => {
                debug!("Holding {} position on {} signal", position.direction, signal);
                CycleAction::HoldPosition
            }
            None => self.act_when_flat(signal, price, offset).await,
        };

        self.outcome(action, Some(signal), delay)
    }

    async fn act_when_flat(&mut self, signal: Signal, price: f64, offset: f64) -> CycleAction {
        if self.ledger.has_outstanding_orders() {
            debug!(
                "{} order(s) outstanding, waiting",
                self.ledger.last_orders().len()
            );
            return CycleAction::AwaitingOrders;
        }
        let Some(side) = signal.side() else {
            return CycleAction::Idle;
        };
        if !self.ledger.has_required_confirmation(signal) {
            info!(
                "{} signal not confirmed yet ({}/{})",
                signal,
                self.ledger.signal_history().count,
                self.config.risk.signal_confirmation_count
            );
            return CycleAction::AwaitingConfirmation;
        }

        let target = compute_trade_price(side, price, offset);
        let size = self.config.trading.quantity;
        info!("Opening: {} {} @ {:.2}", side, size, target);
        let submitted = self.submit(side, target, size, TradeKind::Open).await;
        CycleAction::Open { submitted }
    }

    /// Place a limit order and record it in the ledger once accepted
    async fn submit(&mut self, side: Side, price: f64, size: f64, kind: TradeKind) -> bool {
        let order = OrderRequest { side, price, size };
        let accepted = bounded(
            "Order placement",
            self.call_timeout(),
            self.venue.place_limit_order(&order),
        )
        .await
        .unwrap_or(false);

        if !accepted {
            warn!("Venue did not accept {} order @ {:.2}", side, price);
            return false;
        }

        let submission = TradeSubmission {
            side,
            price,
            size,
            kind,
        };
        self.ledger.record_trade_submission(&submission, Utc::now());
        if kind == TradeKind::Close {
            self.save_checkpoint().await;
        }
        true
    }

    async fn cancel_stale_orders(&mut self) {
        let stale = self.ledger.find_stale_orders(Utc::now());
        for order in stale {
            let cancelled = bounded(
                "Order cancellation",
                self.call_timeout(),
                self.venue.cancel_order(&order),
            )
            .await
            .unwrap_or(false);

            if cancelled {
                self.ledger.release_cancelled_order(&order);
                warn!("Cancelled stale {} order @ {:.2}", order.side, order.price);
            } else {
                debug!("Could not cancel stale {} order, retrying next cycle", order.side);
            }
        }
    }
}
