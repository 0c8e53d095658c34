//! Trade ledger domain: row types and pluggable stores.

pub mod file_store;
pub mod memory;
pub mod store;
pub mod types;

pub use store::{PortfolioStore, PriceSource, StoreError, TradeStore};
pub use types::{Portfolio, Trade, TradeSide, ValidationError};
