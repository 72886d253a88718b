//! Indicator engine: bounded price history and the indicators derived from it

mod engine;
mod history;

pub use engine::{bollinger, ema, roc, rsi, sma, trend, volatility};
pub use engine::{Bollinger, IndicatorSnapshot, Trend};
pub use history::PriceHistory;
