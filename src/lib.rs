pub mod cli;
pub mod data_paths;
pub mod engine;
pub mod ledger;
pub mod logging;

pub use engine::{compute_position, PositionState, ReconciliationEngine};
pub use ledger::{Portfolio, Trade, TradeSide};
