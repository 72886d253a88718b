//! Order reconciliation

pub mod reconciler;

pub use reconciler::{
    amount_tolerance, find_matching_order, find_stale_orders, matches_intent, price_tolerance,
    prune_pending_by_side, PendingOrderIntent, PendingOrders,
};
