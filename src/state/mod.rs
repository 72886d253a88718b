//! Trading state ledger, its records and checkpoint store

pub mod checkpoint;
pub mod ledger;
pub mod position;

pub use checkpoint::{CheckpointStore, LedgerCheckpoint, CHECKPOINT_VERSION};
pub use ledger::{RiskStatus, TradingLedger, TradingStats};
pub use position::{PnlLedger, SignalHistory, TrackedPosition};
