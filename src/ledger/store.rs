//! Storage trait definitions
//!
//! The reconciliation engine only ever talks to these traits, keeping the
//! persistence engine pluggable. Two implementations ship with the crate:
//! [`crate::ledger::memory`] for tests and embedding callers, and
//! [`crate::ledger::file_store`] for the JSON data directory the CLI uses.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::ledger::types::{Portfolio, Trade};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("trade {id} not found")]
    TradeNotFound { id: u64 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Ordered, mutable trade ledger for all instruments.
#[async_trait]
pub trait TradeStore: Send + Sync {
    /// All trades for one instrument, ascending by id.
    async fn list_by_symbol(&self, symbol: &str) -> Result<Vec<Trade>, StoreError>;

    /// Every trade in the ledger, ascending by id.
    async fn list_all(&self) -> Result<Vec<Trade>, StoreError>;

    /// Fetch one trade; missing ids are a distinct not-found condition.
    async fn get(&self, id: u64) -> Result<Trade, StoreError>;

    /// Insert or overwrite a trade. Drafts (no id) are assigned the next id
    /// in sequence; the saved row is returned.
    async fn save(&self, trade: Trade) -> Result<Trade, StoreError>;

    /// Remove a trade row. Removing an already-absent id is a no-op.
    async fn delete(&self, id: u64) -> Result<(), StoreError>;
}

/// One derived position row per instrument symbol.
#[async_trait]
pub trait PortfolioStore: Send + Sync {
    async fn get(&self, symbol: &str) -> Result<Option<Portfolio>, StoreError>;

    /// Every tracked portfolio, sorted by symbol.
    async fn list_all(&self) -> Result<Vec<Portfolio>, StoreError>;

    /// Insert or overwrite the row for `portfolio.symbol`.
    async fn save(&self, portfolio: Portfolio) -> Result<(), StoreError>;

    /// Remove the row for `symbol`. Removing an absent row is a no-op.
    async fn delete(&self, symbol: &str) -> Result<(), StoreError>;
}

/// Pluggable source of current instrument prices, used for return
/// computations. Live market lookup is deliberately out of scope; the
/// default implementation quotes a fixed price for every symbol.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn current_price(&self, symbol: &str) -> Result<Decimal, StoreError>;
}

/// Quotes the same price for every instrument.
pub struct FixedPriceSource {
    price: Decimal,
}

impl FixedPriceSource {
    pub fn new(price: Decimal) -> Self {
        Self { price }
    }
}

#[async_trait]
impl PriceSource for FixedPriceSource {
    async fn current_price(&self, _symbol: &str) -> Result<Decimal, StoreError> {
        Ok(self.price)
    }
}
