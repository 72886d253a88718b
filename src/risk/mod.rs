//! Risk evaluation: global pause limits and per-position exits

pub mod evaluator;

pub use evaluator::{
    check_global_limits, check_position_exit, unrealized_pnl_pct, ExitReason, RiskBreach, RiskExit,
};
