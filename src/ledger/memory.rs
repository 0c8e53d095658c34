//! In-memory stores backed by `DashMap`
//!
//! Used by the engine tests and by embedding callers that do not want a
//! data directory.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::ledger::store::{PortfolioStore, StoreError, TradeStore};
use crate::ledger::types::{Portfolio, Trade};

pub struct MemoryTradeStore {
    trades: DashMap<u64, Trade>,
    next_id: AtomicU64,
}

impl MemoryTradeStore {
    pub fn new() -> Self {
        Self {
            trades: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for MemoryTradeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TradeStore for MemoryTradeStore {
    async fn list_by_symbol(&self, symbol: &str) -> Result<Vec<Trade>, StoreError> {
        let mut trades: Vec<Trade> = self
            .trades
            .iter()
            .filter(|entry| entry.value().symbol == symbol)
            .map(|entry| entry.value().clone())
            .collect();
        trades.sort_by_key(|t| t.id);
        Ok(trades)
    }

    async fn list_all(&self) -> Result<Vec<Trade>, StoreError> {
        let mut trades: Vec<Trade> = self
            .trades
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        trades.sort_by_key(|t| t.id);
        Ok(trades)
    }

    async fn get(&self, id: u64) -> Result<Trade, StoreError> {
        self.trades
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::TradeNotFound { id })
    }

    async fn save(&self, mut trade: Trade) -> Result<Trade, StoreError> {
        let id = match trade.id {
            Some(id) => id,
            None => self.next_id.fetch_add(1, Ordering::SeqCst),
        };
        trade.id = Some(id);
        self.trades.insert(id, trade.clone());
        Ok(trade)
    }

    async fn delete(&self, id: u64) -> Result<(), StoreError> {
        self.trades.remove(&id);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryPortfolioStore {
    portfolios: DashMap<String, Portfolio>,
}

impl MemoryPortfolioStore {
    pub fn new() -> Self {
        Self {
            portfolios: DashMap::new(),
        }
    }
}

#[async_trait]
impl PortfolioStore for MemoryPortfolioStore {
    async fn get(&self, symbol: &str) -> Result<Option<Portfolio>, StoreError> {
        Ok(self
            .portfolios
            .get(symbol)
            .map(|entry| entry.value().clone()))
    }

    async fn list_all(&self) -> Result<Vec<Portfolio>, StoreError> {
        let mut portfolios: Vec<Portfolio> = self
            .portfolios
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        portfolios.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(portfolios)
    }

    async fn save(&self, portfolio: Portfolio) -> Result<(), StoreError> {
        self.portfolios.insert(portfolio.symbol.clone(), portfolio);
        Ok(())
    }

    async fn delete(&self, symbol: &str) -> Result<(), StoreError> {
        self.portfolios.remove(symbol);
        Ok(())
    }
}
