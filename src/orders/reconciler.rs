//! Reconciles locally recorded order intents against the venue's live orders

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::types::{LiveOrder, Side};

/// An order this process believes it submitted and has not seen resolve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOrderIntent {
    pub price: f64,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// One intent slot per side
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingOrders {
    buy: Option<PendingOrderIntent>,
    sell: Option<PendingOrderIntent>,
}

impl PendingOrders {
    pub fn get(&self, side: Side) -> Option<&PendingOrderIntent> {
        match side {
            Side::Buy => self.buy.as_ref(),
            Side::Sell => self.sell.as_ref(),
        }
    }

    pub fn set(&mut self, side: Side, intent: PendingOrderIntent) {
        *self.slot_mut(side) = Some(intent);
    }

    pub fn clear(&mut self, side: Side) -> Option<PendingOrderIntent> {
        self.slot_mut(side).take()
    }

    pub fn is_occupied(&self, side: Side) -> bool {
        self.get(side).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.buy.is_none() && self.sell.is_none()
    }

    fn slot_mut(&mut self, side: Side) -> &mut Option<PendingOrderIntent> {
        match side {
            Side::Buy => &mut self.buy,
            Side::Sell => &mut self.sell,
        }
    }
}

/// Absolute price tolerance around an intended price
pub fn price_tolerance(price: f64) -> f64 {
    0.5_f64.max(price * 0.0015)
}

/// Absolute quantity tolerance around an intended amount
pub fn amount_tolerance(amount: f64) -> f64 {
    if !amount.is_finite() || amount <= 0.0 {
        return 0.0001;
    }
    0.0001_f64.max(amount * 0.05)
}

fn price_matches(order: &LiveOrder, price: f64) -> bool {
    (order.price - price).abs() <= price_tolerance(price)
}

fn amount_matches(order: &LiveOrder, amount: f64) -> bool {
    (order.total_qty - amount).abs() <= amount_tolerance(amount)
}

/// True when `order` is the venue's view of `intent` on `side`
pub fn matches_intent(order: &LiveOrder, side: Side, intent: &PendingOrderIntent) -> bool {
    order.side == side && price_matches(order, intent.price) && amount_matches(order, intent.amount)
}

/// First unfilled live order on `side` near `price`, optionally also of `amount`
pub fn find_matching_order(
    orders: &[LiveOrder],
    side: Side,
    price: f64,
    amount: Option<f64>,
) -> Option<&LiveOrder> {
    orders.iter().find(|order| {
        order.side == side
            && price_matches(order, price)
            && amount.map_or(true, |a| amount_matches(order, a))
            && order.is_unfilled()
    })
}

/// Clear the intent on `side` when no live order matches it any more
///
/// Returns the cleared intent, interpreted as filled or cancelled outside
/// this process.
pub fn prune_pending_by_side(
    pending: &mut PendingOrders,
    side: Side,
    orders: &[LiveOrder],
) -> Option<PendingOrderIntent> {
    let intent = pending.get(side)?;
    if orders.iter().any(|order| matches_intent(order, side, intent)) {
        return None;
    }
    debug!("No live {} order matches pending intent, clearing it", side);
    pending.clear(side)
}

/// Orders unfilled for at least `max_age`
///
/// Intent-matched orders age from the intent's creation; any live order with
/// a venue submit time ages from that. Intents whose order is gone are cleared
/// along the way. Results are deduplicated by [`LiveOrder::dedup_key`].
pub fn find_stale_orders(
    pending: &mut PendingOrders,
    orders: &[LiveOrder],
    now: DateTime<Utc>,
    max_age: Duration,
) -> Vec<LiveOrder> {
    let mut stale = Vec::new();

    for side in Side::ALL {
        let Some(intent) = pending.get(side) else {
            continue;
        };
        let matched = find_matching_order(orders, side, intent.price, Some(intent.amount));
        match matched {
            None => {
                pending.clear(side);
            }
            Some(order) => {
                if now - intent.created_at >= max_age {
                    stale.push(order.clone());
                }
            }
        }
    }

    stale.extend(
        orders
            .iter()
            .filter(|order| order.order_time.is_some_and(|t| now - t >= max_age))
            .cloned(),
    );

    let mut seen = HashSet::new();
    stale.retain(|order| seen.insert(order.dedup_key()));
    stale
}
