//! Trait definitions for the external collaborators of the control loop

use async_trait::async_trait;

use super::errors::Result;
use super::types::{LiveOrder, ObservedPosition, OrderRequest, Signal};
use crate::decision::DecisionRequest;
use crate::market::MarketSnapshot;

/// Trait for the trading venue (read and write side)
///
/// The venue is authoritative: the control loop only reconciles its own
/// intent against what these calls report.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Venue: Send + Sync {
    /// Latest traded price, `None` when the venue cannot report one
    async fn current_price(&self) -> Result<Option<f64>>;

    /// Current position, `None` when flat
    async fn current_position(&self) -> Result<Option<ObservedPosition>>;

    /// Resting orders on the instrument
    async fn live_orders(&self) -> Result<Vec<LiveOrder>>;

    /// Place a limit order; `Ok(false)` means the venue refused it
    async fn place_limit_order(&self, order: &OrderRequest) -> Result<bool>;

    /// Cancel a resting order by its identifier or row index
    async fn cancel_order(&self, order: &LiveOrder) -> Result<bool>;

    /// Get the name of the venue
    fn venue_name(&self) -> &'static str;
}

/// Trait for the external decision provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DecisionProvider: Send + Sync {
    /// Ask for a direction given the current features
    async fn decide(&self, request: &DecisionRequest) -> Result<Signal>;
}

/// Trait for the upstream market-data fetcher behind the context cache
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch a fresh snapshot from upstream
    async fn fetch_snapshot(&self) -> Result<MarketSnapshot>;
}

/// Trait for anything that can quote a reference spot price
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn spot_price(&self) -> Result<Option<f64>>;
}
