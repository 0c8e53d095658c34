//! CLI Commands module
//!
//! Each command follows a consistent pattern with dedicated Args and Command
//! structs; all of them operate on the JSON-file ledger under the data
//! directory through the reconciliation engine.

use std::sync::Arc;

use crate::data_paths::DataPaths;
use crate::engine::ReconciliationEngine;
use crate::ledger::file_store::{FilePortfolioStore, FileTradeStore};
use crate::ledger::store::{PortfolioStore, TradeStore};

// Command modules
pub mod add;
pub mod delete;
pub mod portfolio;
pub mod returns;
pub mod trades;
pub mod update;

/// File-backed stores plus the engine wired on top of them.
pub(crate) struct LedgerHandles {
    pub trades: Arc<dyn TradeStore>,
    pub portfolios: Arc<dyn PortfolioStore>,
    pub engine: ReconciliationEngine,
}

pub(crate) fn open_ledger(data_paths: &DataPaths) -> LedgerHandles {
    let trades: Arc<dyn TradeStore> = Arc::new(FileTradeStore::new(data_paths));
    let portfolios: Arc<dyn PortfolioStore> = Arc::new(FilePortfolioStore::new(data_paths));
    let engine = ReconciliationEngine::new(Arc::clone(&trades), Arc::clone(&portfolios));
    LedgerHandles {
        trades,
        portfolios,
        engine,
    }
}
