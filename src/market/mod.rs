//! External market context: Binance snapshot fetcher and its TTL cache

pub mod binance;
pub mod cache;
pub mod snapshot;

pub use binance::BinanceMarketSource;
pub use cache::MarketContextCache;
pub use snapshot::{
    atr, compute_momentum, FuturesSnapshot, Kline, MarketContext, MarketSnapshot, Momentum,
    RelativeBasis, SpotTicker,
};
