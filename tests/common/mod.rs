//! Common test utilities and fixtures

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use edgex_trader::common::traits::{DecisionProvider, MarketDataSource, Venue};
use edgex_trader::market::MarketContextCache;
use edgex_trader::{
    AppConfig, ControlLoop, DecisionRequest, LiveOrder, MarketSnapshot, ObservedPosition,
    OrderRequest, Result, Signal, TraderError,
};

/// Venue replaying scripted prices and recording every write
#[derive(Default)]
pub struct FakeVenue {
    prices: Mutex<VecDeque<Option<f64>>>,
    last_price: Mutex<Option<f64>>,
    pub position: Mutex<Option<ObservedPosition>>,
    pub orders: Mutex<Vec<LiveOrder>>,
    pub placed: Mutex<Vec<OrderRequest>>,
    pub cancelled: Mutex<Vec<LiveOrder>>,
    pub accept_orders: Mutex<bool>,
}

impl FakeVenue {
    pub fn new() -> Self {
        Self {
            accept_orders: Mutex::new(true),
            ..Default::default()
        }
    }

    /// Queue prices; once drained the last one repeats
    pub fn with_prices(self, prices: impl IntoIterator<Item = f64>) -> Self {
        self.prices.lock().unwrap().extend(prices.into_iter().map(Some));
        self
    }

    pub fn push_price(&self, price: Option<f64>) {
        self.prices.lock().unwrap().push_back(price);
    }

    pub fn set_position(&self, position: Option<ObservedPosition>) {
        *self.position.lock().unwrap() = position;
    }

    pub fn set_orders(&self, orders: Vec<LiveOrder>) {
        *self.orders.lock().unwrap() = orders;
    }

    pub fn placed(&self) -> Vec<OrderRequest> {
        self.placed.lock().unwrap().clone()
    }

    pub fn cancelled(&self) -> Vec<LiveOrder> {
        self.cancelled.lock().unwrap().clone()
    }
}

#[async_trait]
impl Venue for FakeVenue {
    async fn current_price(&self) -> Result<Option<f64>> {
        let next = self.prices.lock().unwrap().pop_front();
        let mut last = self.last_price.lock().unwrap();
        match next {
            Some(price) => {
                *last = price.or(*last);
                Ok(price)
            }
            None => Ok(*last),
        }
    }

    async fn current_position(&self) -> Result<Option<ObservedPosition>> {
        Ok(self.position.lock().unwrap().clone())
    }

    async fn live_orders(&self) -> Result<Vec<LiveOrder>> {
        Ok(self.orders.lock().unwrap().clone())
    }

    async fn place_limit_order(&self, order: &OrderRequest) -> Result<bool> {
        if !*self.accept_orders.lock().unwrap() {
            return Ok(false);
        }
        self.placed.lock().unwrap().push(order.clone());
        Ok(true)
    }

    async fn cancel_order(&self, order: &LiveOrder) -> Result<bool> {
        self.cancelled.lock().unwrap().push(order.clone());
        self.orders
            .lock()
            .unwrap()
            .retain(|o| o.dedup_key() != order.dedup_key());
        Ok(true)
    }

    fn venue_name(&self) -> &'static str {
        "fake"
    }
}

/// Decision provider returning a fixed signal and counting requests
pub struct ScriptedDecisions {
    pub signal: Mutex<Signal>,
    pub requests: Mutex<Vec<DecisionRequest>>,
}

impl ScriptedDecisions {
    pub fn new(signal: Signal) -> Self {
        Self {
            signal: Mutex::new(signal),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn set(&self, signal: Signal) {
        *self.signal.lock().unwrap() = signal;
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<DecisionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl DecisionProvider for ScriptedDecisions {
    async fn decide(&self, request: &DecisionRequest) -> Result<Signal> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(*self.signal.lock().unwrap())
    }
}

/// Market source that always fails and counts attempts
#[derive(Default)]
pub struct UnreachableMarket {
    pub calls: AtomicUsize,
}

#[async_trait]
impl MarketDataSource for UnreachableMarket {
    async fn fetch_snapshot(&self) -> Result<MarketSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TraderError::Timeout("binance unreachable".to_string()))
    }
}

/// Default configuration with external calls disabled
pub fn test_config(history_length: usize) -> AppConfig {
    let mut config = AppConfig::default();
    config.trading.price_history_length = history_length;
    config.external_market.enabled = false;
    config.checkpoint.enabled = false;
    config
}

pub fn build_loop(
    config: AppConfig,
    venue: Arc<FakeVenue>,
    decisions: Arc<ScriptedDecisions>,
) -> ControlLoop {
    let market = MarketContextCache::disabled(Arc::new(UnreachableMarket::default()));
    ControlLoop::new(config, venue, decisions, market).with_rng_seed(42)
}
