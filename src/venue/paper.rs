//! Paper-trading venue
//!
//! Accepts limit orders without sending them anywhere and fills them when the
//! reference price crosses the limit. The reference price comes from any
//! [`PriceSource`], normally the Binance spot ticker.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::common::errors::Result;
use crate::common::numeric::{finite, round_to};
use crate::common::traits::{PriceSource, Venue};
use crate::common::types::{Direction, LiveOrder, ObservedPosition, OrderRequest, Side};
use crate::config::types::PaperVenueConfig;

const FLAT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
struct RestingOrder {
    id: String,
    side: Side,
    price: f64,
    size: f64,
    submitted_at: DateTime<Utc>,
}

impl RestingOrder {
    fn crossed_by(&self, price: f64) -> bool {
        match self.side {
            Side::Buy => price <= self.price,
            Side::Sell => price >= self.price,
        }
    }
}

#[derive(Debug, Default)]
struct PaperBook {
    orders: Vec<RestingOrder>,
    /// Signed: positive long, negative short
    net_position: f64,
    last_price: Option<f64>,
    next_id: u64,
}

impl PaperBook {
    fn apply_fills(&mut self) {
        let Some(price) = self.last_price else {
            return;
        };
        let (filled, resting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.orders)
            .into_iter()
            .partition(|order| order.crossed_by(price));
        self.orders = resting;

        for order in filled {
            let signed = match order.side {
                Side::Buy => order.size,
                Side::Sell => -order.size,
            };
            self.net_position += signed;
            info!(
                "Paper fill: {} {} @ {} (reference {}), net position {}",
                order.side, order.size, order.price, price, self.net_position
            );
        }
    }
}

/// In-process venue backed by a reference price feed
pub struct PaperVenue {
    prices: Arc<dyn PriceSource>,
    config: PaperVenueConfig,
    book: Mutex<PaperBook>,
}

impl PaperVenue {
    pub fn new(prices: Arc<dyn PriceSource>, config: PaperVenueConfig) -> Self {
        Self {
            prices,
            config,
            book: Mutex::new(PaperBook::default()),
        }
    }

    /// Signed net position, for inspection
    pub async fn net_position(&self) -> f64 {
        self.book.lock().await.net_position
    }
}

#[async_trait]
impl Venue for PaperVenue {
    #[instrument(skip(self))]
    async fn current_price(&self) -> Result<Option<f64>> {
        let quote = self.prices.spot_price().await?.and_then(finite);
        let mut book = self.book.lock().await;
        if let Some(price) = quote {
            book.last_price = Some(price);
            book.apply_fills();
        }
        Ok(quote.map(|p| round_to(p, self.config.price_precision)))
    }

    async fn current_position(&self) -> Result<Option<ObservedPosition>> {
        let book = self.book.lock().await;
        let net = book.net_position;
        if net.abs() < FLAT_EPSILON {
            return Ok(None);
        }
        Ok(Some(ObservedPosition {
            direction: if net > 0.0 {
                Direction::Long
            } else {
                Direction::Short
            },
            size: Some(round_to(net.abs(), self.config.quantity_precision)),
        }))
    }

    async fn live_orders(&self) -> Result<Vec<LiveOrder>> {
        let book = self.book.lock().await;
        Ok(book
            .orders
            .iter()
            .enumerate()
            .map(|(index, order)| LiveOrder {
                index,
                side: order.side,
                price: order.price,
                filled_qty: 0.0,
                total_qty: order.size,
                order_id: Some(order.id.clone()),
                order_time: Some(order.submitted_at),
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn place_limit_order(&self, order: &OrderRequest) -> Result<bool> {
        let price = finite(order.price).filter(|p| *p > 0.0);
        let size = finite(order.size).filter(|s| *s > 0.0);
        let (Some(price), Some(size)) = (price, size) else {
            debug!("Rejecting paper order with invalid price or size");
            return Ok(false);
        };

        let mut book = self.book.lock().await;
        book.next_id += 1;
        let resting = RestingOrder {
            id: format!("paper-{}", book.next_id),
            side: order.side,
            price: round_to(price, self.config.price_precision),
            size: round_to(size, self.config.quantity_precision),
            submitted_at: Utc::now(),
        };
        info!(
            "Paper order {} accepted: {} {} @ {}",
            resting.id, resting.side, resting.size, resting.price
        );
        book.orders.push(resting);
        book.apply_fills();
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn cancel_order(&self, order: &LiveOrder) -> Result<bool> {
        let mut book = self.book.lock().await;
        let position = match order.order_id.as_deref() {
            Some(id) => book.orders.iter().position(|o| o.id == id),
            None => (order.index < book.orders.len()).then_some(order.index),
        };

        match position {
            Some(i) => {
                let removed = book.orders.remove(i);
                info!("Paper order {} cancelled", removed.id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn venue_name(&self) -> &'static str {
        "paper"
    }
}
