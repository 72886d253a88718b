//! Control loop and its pricing helpers

pub mod pricing;
pub mod scheduler;

pub use pricing::{compute_trade_price, next_delay, order_offset};
pub use scheduler::{ControlLoop, CycleAction, CycleOutcome, Phase};
