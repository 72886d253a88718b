//! EdgeX Trader Library
//!
//! Single-instrument trading decision and risk state machine: indicators over
//! a bounded price history, an external decision provider, risk controls and
//! reconciliation of local order intent against the venue.

pub mod common;
pub mod config;
pub mod decision;
pub mod engine;
pub mod indicators;
pub mod market;
pub mod orders;
pub mod risk;
pub mod state;
pub mod venue;

// Re-export commonly used types
pub use common::errors::{Result, TraderError};
pub use common::traits::{DecisionProvider, MarketDataSource, PriceSource, Venue};
pub use common::types::{
    Direction, LiveOrder, ObservedPosition, OrderRequest, Side, Signal, TradeKind, TradeSubmission,
};
pub use config::types::AppConfig;
pub use decision::{DecisionRequest, HttpDecisionClient};
pub use engine::{ControlLoop, CycleAction, CycleOutcome, Phase};
pub use indicators::{IndicatorSnapshot, PriceHistory};
pub use market::{BinanceMarketSource, MarketContext, MarketContextCache, MarketSnapshot};
pub use state::{CheckpointStore, TradingLedger, TradingStats};
pub use venue::PaperVenue;
