//! JSON-file persistence layer
//!
//! Stores ledger state under the data directory:
//! - ledger/trades/<id>.json      - One file per trade row
//! - ledger/portfolios/<SYM>.json - One file per derived position
//! - ledger/sequence.json         - Next trade id counter

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::data_paths::DataPaths;
use crate::ledger::store::{PortfolioStore, StoreError, TradeStore};
use crate::ledger::types::{Portfolio, Trade};

#[derive(Debug, Serialize, Deserialize)]
struct Sequence {
    next_id: u64,
}

pub struct FileTradeStore {
    trades_dir: PathBuf,
    sequence_path: PathBuf,
    /// Serializes read-increment-write of the sequence file.
    sequence_lock: Mutex<()>,
}

impl FileTradeStore {
    pub fn new(data_paths: &DataPaths) -> Self {
        Self {
            trades_dir: data_paths.trades(),
            sequence_path: data_paths.ledger().join("sequence.json"),
            sequence_lock: Mutex::new(()),
        }
    }

    async fn init_directories(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.trades_dir).await?;
        Ok(())
    }

    fn trade_path(&self, id: u64) -> PathBuf {
        self.trades_dir.join(format!("{}.json", id))
    }

    async fn next_id(&self) -> Result<u64, StoreError> {
        let _guard = self.sequence_lock.lock().await;
        let next = match fs::read_to_string(&self.sequence_path).await {
            Ok(content) => serde_json::from_str::<Sequence>(&content)?.next_id,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 1,
            Err(e) => return Err(e.into()),
        };
        let updated = serde_json::to_string_pretty(&Sequence { next_id: next + 1 })?;
        fs::write(&self.sequence_path, updated).await?;
        Ok(next)
    }

    async fn read_all(&self) -> Result<Vec<Trade>, StoreError> {
        let mut trades = Vec::new();
        if !self.trades_dir.exists() {
            return Ok(trades);
        }
        let mut entries = fs::read_dir(&self.trades_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read_to_string(&path).await?;
            match serde_json::from_str::<Trade>(&content) {
                Ok(trade) => trades.push(trade),
                Err(e) => warn!("Skipping unreadable trade file {:?}: {}", path, e),
            }
        }
        trades.sort_by_key(|t| t.id);
        Ok(trades)
    }
}

#[async_trait]
impl TradeStore for FileTradeStore {
    async fn list_by_symbol(&self, symbol: &str) -> Result<Vec<Trade>, StoreError> {
        let mut trades = self.read_all().await?;
        trades.retain(|t| t.symbol == symbol);
        Ok(trades)
    }

    async fn list_all(&self) -> Result<Vec<Trade>, StoreError> {
        self.read_all().await
    }

    async fn get(&self, id: u64) -> Result<Trade, StoreError> {
        match fs::read_to_string(self.trade_path(id)).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::TradeNotFound { id })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, mut trade: Trade) -> Result<Trade, StoreError> {
        self.init_directories().await?;
        let id = match trade.id {
            Some(id) => id,
            None => self.next_id().await?,
        };
        trade.id = Some(id);
        let json = serde_json::to_string_pretty(&trade)?;
        fs::write(self.trade_path(id), json).await?;
        debug!(id, symbol = %trade.symbol, "Saved trade");
        Ok(trade)
    }

    async fn delete(&self, id: u64) -> Result<(), StoreError> {
        match fs::remove_file(self.trade_path(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

pub struct FilePortfolioStore {
    portfolios_dir: PathBuf,
}

impl FilePortfolioStore {
    pub fn new(data_paths: &DataPaths) -> Self {
        Self {
            portfolios_dir: data_paths.portfolios(),
        }
    }

    fn portfolio_path(&self, symbol: &str) -> PathBuf {
        self.portfolios_dir.join(format!("{}.json", symbol))
    }
}

#[async_trait]
impl PortfolioStore for FilePortfolioStore {
    async fn get(&self, symbol: &str) -> Result<Option<Portfolio>, StoreError> {
        match fs::read_to_string(self.portfolio_path(symbol)).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_all(&self) -> Result<Vec<Portfolio>, StoreError> {
        let mut portfolios = Vec::new();
        if !self.portfolios_dir.exists() {
            return Ok(portfolios);
        }
        let mut entries = fs::read_dir(&self.portfolios_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read_to_string(&path).await?;
            match serde_json::from_str::<Portfolio>(&content) {
                Ok(portfolio) => portfolios.push(portfolio),
                Err(e) => warn!("Skipping unreadable portfolio file {:?}: {}", path, e),
            }
        }
        portfolios.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(portfolios)
    }

    async fn save(&self, portfolio: Portfolio) -> Result<(), StoreError> {
        fs::create_dir_all(&self.portfolios_dir).await?;
        let json = serde_json::to_string_pretty(&portfolio)?;
        fs::write(self.portfolio_path(&portfolio.symbol), json).await?;
        debug!(symbol = %portfolio.symbol, shares = portfolio.shares, "Saved portfolio");
        Ok(())
    }

    async fn delete(&self, symbol: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.portfolio_path(symbol)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
