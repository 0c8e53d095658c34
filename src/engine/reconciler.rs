//! Reconciliation engine
//!
//! Orchestrates every trade mutation: fetch the affected history, apply the
//! pending change to an in-memory copy, replay it through
//! [`compute_position`], and either apply the outcome to the portfolio
//! store or reject the mutation. Admissibility is binary; there is no error
//! taxonomy beyond "rejected" and the infrastructural store/lock failures.
//!
//! Dry runs are modeled as plan-then-apply rather than a `check` flag: every
//! operation first computes a [`PortfolioPlan`] (the committable token) and
//! a dry run simply drops it. The cross-instrument move in [`amend`] is the
//! one place this matters: both halves are planned under both symbol locks
//! before either store is touched.
//!
//! [`amend`]: ReconciliationEngine::amend

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::engine::average_cost::{compute_position, PositionState};
use crate::engine::locks::SymbolLocks;
use crate::ledger::store::{PortfolioStore, StoreError, TradeStore};
use crate::ledger::types::{Portfolio, Trade, TradeSide};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Another mutation holds this instrument's lock; safe to retry.
    #[error("instrument {symbol} is busy, retry the operation")]
    Conflict { symbol: String },
    #[error("trade has no id")]
    MissingId,
}

/// Committed against the portfolio store after a mutation is admitted.
#[derive(Debug, Clone, PartialEq)]
enum PortfolioPlan {
    Create(Portfolio),
    Update(Portfolio),
    Delete(String),
    /// Admissible but nothing to reconcile (deleting a trade whose
    /// instrument has no portfolio row).
    Noop,
}

pub struct ReconciliationEngine {
    trades: Arc<dyn TradeStore>,
    portfolios: Arc<dyn PortfolioStore>,
    locks: SymbolLocks,
}

impl ReconciliationEngine {
    pub fn new(trades: Arc<dyn TradeStore>, portfolios: Arc<dyn PortfolioStore>) -> Self {
        Self {
            trades,
            portfolios,
            locks: SymbolLocks::new(),
        }
    }

    /// Bound the per-symbol lock wait (mainly for tests).
    pub fn with_lock_wait(mut self, wait: Duration) -> Self {
        self.locks = SymbolLocks::with_wait(wait);
        self
    }

    // ------------------------------------------------------------------
    // Spec surface: reconcile-only operations.
    //
    // These mirror the upstream system's handlers, which persisted the
    // trade row themselves after a `true` verdict. Callers that want the
    // trade row and the portfolio written under one lock scope should use
    // `record` / `amend` / `remove` instead.
    // ------------------------------------------------------------------

    /// Reconcile the portfolio as if `trade` were appended to its history.
    pub async fn add_trade(&self, trade: &Trade) -> Result<bool, EngineError> {
        let _guard = self.locks.acquire(&trade.symbol).await?;
        match self.plan_add(trade).await? {
            Some(plan) => {
                self.apply(plan).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Reconcile the portfolio as if `trade` were removed from its history.
    pub async fn delete_trade(&self, trade: &Trade) -> Result<bool, EngineError> {
        let _guard = self.locks.acquire(&trade.symbol).await?;
        match self.plan_delete(trade).await? {
            Some(plan) => {
                self.apply(plan).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Reconcile the portfolios affected by replacing `old` with `new`.
    ///
    /// When the symbol changed this is a cross-portfolio move: both halves
    /// are validated under both locks before either is committed, and a
    /// failed half leaves both portfolios untouched.
    pub async fn update_trade(&self, new: &Trade, old: &Trade) -> Result<bool, EngineError> {
        if new.symbol == old.symbol {
            let _guard = self.locks.acquire(&new.symbol).await?;
            match self.plan_replace(new, old).await? {
                Some(plan) => {
                    self.apply(plan).await?;
                    Ok(true)
                }
                None => Ok(false),
            }
        } else {
            let _guards = self.locks.acquire_pair(&old.symbol, &new.symbol).await?;
            match (self.plan_delete(old).await?, self.plan_add(new).await?) {
                (Some(delete_half), Some(add_half)) => {
                    self.apply(delete_half).await?;
                    self.apply(add_half).await?;
                    Ok(true)
                }
                _ => {
                    warn!(
                        from = %old.symbol,
                        to = %new.symbol,
                        "Rejected ticker move: one half failed validation"
                    );
                    Ok(false)
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Ledger operations: trade row + portfolio under one lock scope.
    // ------------------------------------------------------------------

    /// Admit and persist a new trade. Returns the saved trade (with its
    /// assigned id), or `None` when the mutation was rejected.
    pub async fn record(&self, draft: Trade) -> Result<Option<Trade>, EngineError> {
        let _guard = self.locks.acquire(&draft.symbol).await?;
        match self.plan_add(&draft).await? {
            Some(plan) => {
                let saved = self.trades.save(draft).await?;
                self.apply(plan).await?;
                info!(id = saved.id, %saved, "Recorded trade");
                Ok(Some(saved))
            }
            None => Ok(None),
        }
    }

    /// Remove a trade row and reconcile its portfolio. `Ok(false)` means
    /// the removal was rejected; an unknown id is a store-level not-found.
    pub async fn remove(&self, id: u64) -> Result<bool, EngineError> {
        let trade = self.trades.get(id).await?;
        let _guard = self.locks.acquire(&trade.symbol).await?;
        match self.plan_delete(&trade).await? {
            Some(plan) => {
                self.trades.delete(id).await?;
                self.apply(plan).await?;
                info!(id, symbol = %trade.symbol, "Removed trade");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Replace an existing trade with `new_trade` (same id) and reconcile
    /// every affected portfolio. Returns the saved trade, or `None` when
    /// the update was rejected.
    pub async fn amend(&self, new_trade: Trade) -> Result<Option<Trade>, EngineError> {
        let id = new_trade.id.ok_or(EngineError::MissingId)?;
        let old = self.trades.get(id).await?;

        if old.symbol == new_trade.symbol {
            let _guard = self.locks.acquire(&old.symbol).await?;
            match self.plan_replace(&new_trade, &old).await? {
                Some(plan) => {
                    let saved = self.trades.save(new_trade).await?;
                    self.apply(plan).await?;
                    info!(id, %saved, "Amended trade");
                    Ok(Some(saved))
                }
                None => Ok(None),
            }
        } else {
            let _guards = self
                .locks
                .acquire_pair(&old.symbol, &new_trade.symbol)
                .await?;
            match (
                self.plan_delete(&old).await?,
                self.plan_add(&new_trade).await?,
            ) {
                (Some(delete_half), Some(add_half)) => {
                    let saved = self.trades.save(new_trade).await?;
                    self.apply(delete_half).await?;
                    self.apply(add_half).await?;
                    info!(id, from = %old.symbol, to = %saved.symbol, "Moved trade");
                    Ok(Some(saved))
                }
                _ => {
                    warn!(
                        id,
                        from = %old.symbol,
                        to = %new_trade.symbol,
                        "Rejected ticker move: one half failed validation"
                    );
                    Ok(None)
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Planning. `Ok(None)` is a rejection; errors are infrastructural.
    // Callers hold the relevant symbol lock(s).
    // ------------------------------------------------------------------

    async fn plan_add(&self, trade: &Trade) -> Result<Option<PortfolioPlan>, EngineError> {
        match self.portfolios.get(&trade.symbol).await? {
            None => match trade.side {
                TradeSide::Sell => {
                    warn!(symbol = %trade.symbol, "Rejected sell against untracked instrument");
                    Ok(None)
                }
                TradeSide::Buy => {
                    match Portfolio::new(&trade.symbol, trade.price, trade.shares) {
                        Ok(portfolio) => Ok(Some(PortfolioPlan::Create(portfolio))),
                        Err(e) => {
                            warn!(symbol = %trade.symbol, error = %e, "Rejected opening trade");
                            Ok(None)
                        }
                    }
                }
            },
            Some(_) => {
                let mut history = self.trades.list_by_symbol(&trade.symbol).await?;
                insert_candidate(&mut history, trade.clone());
                Ok(self.plan_from_replay(&trade.symbol, compute_position(&history)))
            }
        }
    }

    async fn plan_delete(&self, trade: &Trade) -> Result<Option<PortfolioPlan>, EngineError> {
        if self.portfolios.get(&trade.symbol).await?.is_none() {
            // Deleting a trade with no corresponding portfolio is a no-op
            // success, uniformly across operations.
            debug!(symbol = %trade.symbol, "Delete against untracked instrument, nothing to reconcile");
            return Ok(Some(PortfolioPlan::Noop));
        }
        let mut history = self.trades.list_by_symbol(&trade.symbol).await?;
        history.retain(|t| t.id != trade.id);
        Ok(self.plan_from_replay(&trade.symbol, compute_position(&history)))
    }

    /// Same-symbol replacement: swap the entry in place, preserving its
    /// position in the history.
    async fn plan_replace(
        &self,
        new: &Trade,
        old: &Trade,
    ) -> Result<Option<PortfolioPlan>, EngineError> {
        match self.portfolios.get(&new.symbol).await? {
            None => match new.side {
                TradeSide::Sell => {
                    warn!(symbol = %new.symbol, "Rejected update to a sell against untracked instrument");
                    Ok(None)
                }
                TradeSide::Buy => match Portfolio::new(&new.symbol, new.price, new.shares) {
                    Ok(portfolio) => Ok(Some(PortfolioPlan::Create(portfolio))),
                    Err(e) => {
                        warn!(symbol = %new.symbol, error = %e, "Rejected update");
                        Ok(None)
                    }
                },
            },
            Some(_) => {
                let mut history = self.trades.list_by_symbol(&new.symbol).await?;
                if let Some(slot) = history.iter_mut().find(|t| t.id == old.id) {
                    *slot = new.clone();
                }
                Ok(self.plan_from_replay(&new.symbol, compute_position(&history)))
            }
        }
    }

    fn plan_from_replay(&self, symbol: &str, state: PositionState) -> Option<PortfolioPlan> {
        if state.shares < 0 {
            warn!(
                symbol,
                shares = state.shares,
                "Rejected mutation: history would oversell"
            );
            return None;
        }
        if state.shares == 0 {
            return Some(PortfolioPlan::Delete(symbol.to_string()));
        }
        match Portfolio::new(symbol, state.average_price, state.shares) {
            Ok(portfolio) => Some(PortfolioPlan::Update(portfolio)),
            Err(e) => {
                warn!(symbol, error = %e, "Rejected mutation: replay produced an invalid portfolio");
                None
            }
        }
    }

    async fn apply(&self, plan: PortfolioPlan) -> Result<(), EngineError> {
        match plan {
            PortfolioPlan::Create(portfolio) => {
                info!(symbol = %portfolio.symbol, shares = portfolio.shares, "Opening portfolio");
                self.portfolios.save(portfolio).await?;
            }
            PortfolioPlan::Update(portfolio) => {
                debug!(symbol = %portfolio.symbol, shares = portfolio.shares, "Updating portfolio");
                self.portfolios.save(portfolio).await?;
            }
            PortfolioPlan::Delete(symbol) => {
                info!(%symbol, "Position closed, deleting portfolio");
                self.portfolios.delete(&symbol).await?;
            }
            PortfolioPlan::Noop => {}
        }
        Ok(())
    }
}

/// Insert the pending trade at its chronological slot: drafts append as the
/// newest entry; an id-bearing trade (an update being replayed) goes
/// immediately before the first entry with a strictly greater id.
fn insert_candidate(history: &mut Vec<Trade>, candidate: Trade) {
    match candidate.id {
        None => history.push(candidate),
        Some(id) => {
            let slot = history
                .iter()
                .position(|t| t.id.is_some_and(|existing| existing > id));
            match slot {
                Some(index) => history.insert(index, candidate),
                None => history.push(candidate),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::memory::{MemoryPortfolioStore, MemoryTradeStore};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn engine() -> ReconciliationEngine {
        ReconciliationEngine::new(
            Arc::new(MemoryTradeStore::new()),
            Arc::new(MemoryPortfolioStore::new()),
        )
    }

    fn buy(symbol: &str, price: Decimal, shares: i64) -> Trade {
        Trade::new(symbol, TradeSide::Buy, price, shares).unwrap()
    }

    fn sell(symbol: &str, price: Decimal, shares: i64) -> Trade {
        Trade::new(symbol, TradeSide::Sell, price, shares).unwrap()
    }

    async fn portfolio_of(engine: &ReconciliationEngine, symbol: &str) -> Option<Portfolio> {
        engine.portfolios.get(symbol).await.unwrap()
    }

    #[tokio::test]
    async fn selling_untracked_instrument_is_rejected() {
        let engine = engine();
        let verdict = engine.record(sell("AAPL", dec!(100), 5)).await.unwrap();
        assert!(verdict.is_none());
        assert!(portfolio_of(&engine, "AAPL").await.is_none());
        assert!(engine.trades.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn first_buy_opens_portfolio() {
        let engine = engine();
        let saved = engine
            .record(buy("AAPL", dec!(50), 10))
            .await
            .unwrap()
            .expect("admissible");
        assert_eq!(saved.id, Some(1));

        let portfolio = portfolio_of(&engine, "AAPL").await.unwrap();
        assert_eq!(portfolio.shares, 10);
        assert_eq!(portfolio.average_price, dec!(50.00));
    }

    #[tokio::test]
    async fn buys_update_weighted_average() {
        let engine = engine();
        engine.record(buy("AAPL", dec!(100), 10)).await.unwrap();
        engine.record(buy("AAPL", dec!(120), 5)).await.unwrap();

        let portfolio = portfolio_of(&engine, "AAPL").await.unwrap();
        assert_eq!(portfolio.shares, 15);
        assert_eq!(portfolio.average_price, dec!(106.67));
    }

    #[tokio::test]
    async fn oversell_is_rejected_without_side_effects() {
        let engine = engine();
        engine.record(buy("AAPL", dec!(100), 10)).await.unwrap();
        let verdict = engine.record(sell("AAPL", dec!(90), 15)).await.unwrap();
        assert!(verdict.is_none());

        // Neither the ledger nor the portfolio moved.
        assert_eq!(engine.trades.list_all().await.unwrap().len(), 1);
        let portfolio = portfolio_of(&engine, "AAPL").await.unwrap();
        assert_eq!(portfolio.shares, 10);
        assert_eq!(portfolio.average_price, dec!(100.00));
    }

    #[tokio::test]
    async fn selling_to_zero_deletes_portfolio() {
        let engine = engine();
        engine.record(buy("AAPL", dec!(100), 10)).await.unwrap();
        let verdict = engine.record(sell("AAPL", dec!(110), 10)).await.unwrap();
        assert!(verdict.is_some());
        assert!(portfolio_of(&engine, "AAPL").await.is_none());
        // The sell itself stays in the ledger.
        assert_eq!(engine.trades.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn removing_only_trade_deletes_portfolio() {
        let engine = engine();
        let saved = engine
            .record(buy("AAPL", dec!(100), 10))
            .await
            .unwrap()
            .unwrap();
        assert!(engine.remove(saved.id.unwrap()).await.unwrap());
        assert!(portfolio_of(&engine, "AAPL").await.is_none());
        assert!(engine.trades.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn removing_a_load_bearing_buy_is_rejected() {
        let engine = engine();
        engine.record(buy("AAPL", dec!(100), 10)).await.unwrap();
        let second = engine
            .record(buy("AAPL", dec!(120), 5))
            .await
            .unwrap()
            .unwrap();
        engine.record(sell("AAPL", dec!(140), 12)).await.unwrap();

        // Without the second buy the sell oversells the remaining history.
        assert!(!engine.remove(second.id.unwrap()).await.unwrap());
        assert_eq!(engine.trades.list_all().await.unwrap().len(), 3);
        assert_eq!(portfolio_of(&engine, "AAPL").await.unwrap().shares, 3);
    }

    #[tokio::test]
    async fn removing_the_opening_buy_reseeds_from_the_sell() {
        // Quirk preserved from the upstream system: the remaining sell-first
        // history seeds a positive position instead of overselling.
        let engine = engine();
        let first = engine
            .record(buy("AAPL", dec!(100), 10))
            .await
            .unwrap()
            .unwrap();
        engine.record(sell("AAPL", dec!(110), 8)).await.unwrap();

        assert!(engine.remove(first.id.unwrap()).await.unwrap());
        let portfolio = portfolio_of(&engine, "AAPL").await.unwrap();
        assert_eq!(portfolio.shares, 8);
        assert_eq!(portfolio.average_price, dec!(110.00));
    }

    #[tokio::test]
    async fn remove_unknown_id_is_not_found() {
        let engine = engine();
        let err = engine.remove(42).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Store(StoreError::TradeNotFound { id: 42 })
        ));
    }

    #[tokio::test]
    async fn delete_trade_without_portfolio_is_noop_success() {
        let engine = engine();
        // A trade row whose portfolio never existed (or was already closed).
        let mut orphan = sell("AAPL", dec!(10), 1);
        orphan.id = Some(7);
        assert!(engine.delete_trade(&orphan).await.unwrap());
        assert!(portfolio_of(&engine, "AAPL").await.is_none());
    }

    #[tokio::test]
    async fn amend_reprices_in_place() {
        let engine = engine();
        let first = engine
            .record(buy("AAPL", dec!(100), 10))
            .await
            .unwrap()
            .unwrap();
        engine.record(buy("AAPL", dec!(120), 5)).await.unwrap();

        let mut repriced = first.clone();
        repriced.price = dec!(130);
        let saved = engine.amend(repriced).await.unwrap().expect("admissible");
        assert_eq!(saved.id, first.id);

        let portfolio = portfolio_of(&engine, "AAPL").await.unwrap();
        assert_eq!(portfolio.shares, 15);
        // (10*130 + 5*120) / 15 = 126.666... -> 126.67
        assert_eq!(portfolio.average_price, dec!(126.67));
    }

    #[tokio::test]
    async fn amend_that_oversells_is_rejected() {
        let engine = engine();
        let first = engine
            .record(buy("AAPL", dec!(100), 10))
            .await
            .unwrap()
            .unwrap();
        engine.record(sell("AAPL", dec!(110), 8)).await.unwrap();

        // Shrinking the opening buy below the sold quantity must fail.
        let mut shrunk = first.clone();
        shrunk.shares = 5;
        assert!(engine.amend(shrunk).await.unwrap().is_none());
        assert_eq!(portfolio_of(&engine, "AAPL").await.unwrap().shares, 2);
        assert_eq!(engine.trades.get(first.id.unwrap()).await.unwrap().shares, 10);
    }

    #[tokio::test]
    async fn amend_preserves_history_position() {
        let engine = engine();
        engine.record(buy("AAPL", dec!(100), 10)).await.unwrap();
        let middle = engine
            .record(buy("AAPL", dec!(120), 5))
            .await
            .unwrap()
            .unwrap();
        engine.record(sell("AAPL", dec!(140), 12)).await.unwrap();

        // Replacing the middle buy must replay it in its original slot,
        // before the sell; a naive append would oversell mid-sequence.
        let mut amended = middle.clone();
        amended.shares = 4;
        assert!(engine.amend(amended).await.unwrap().is_some());

        let portfolio = portfolio_of(&engine, "AAPL").await.unwrap();
        assert_eq!(portfolio.shares, 2);
    }

    #[tokio::test]
    async fn ticker_move_commits_both_halves() {
        let engine = engine();
        engine.record(buy("AAPL", dec!(100), 10)).await.unwrap();
        engine.record(buy("MSFT", dec!(200), 4)).await.unwrap();
        let moved = engine
            .record(buy("AAPL", dec!(110), 6))
            .await
            .unwrap()
            .unwrap();

        let mut relabeled = moved.clone();
        relabeled.symbol = "MSFT".to_string();
        let saved = engine.amend(relabeled).await.unwrap().expect("admissible");
        assert_eq!(saved.symbol, "MSFT");

        let aapl = portfolio_of(&engine, "AAPL").await.unwrap();
        assert_eq!(aapl.shares, 10);
        assert_eq!(aapl.average_price, dec!(100.00));

        let msft = portfolio_of(&engine, "MSFT").await.unwrap();
        assert_eq!(msft.shares, 10);
        // (4*200 + 6*110) / 10 = 146.00
        assert_eq!(msft.average_price, dec!(146.00));
    }

    #[tokio::test]
    async fn ticker_move_rejection_touches_nothing() {
        let engine = engine();
        engine.record(buy("AAPL", dec!(100), 10)).await.unwrap();
        let moved = engine
            .record(sell("AAPL", dec!(110), 4))
            .await
            .unwrap()
            .unwrap();

        // MSFT is untracked; moving a sell there fails its dry run, so the
        // delete half must not run either.
        let mut relabeled = moved.clone();
        relabeled.symbol = "MSFT".to_string();
        assert!(engine.amend(relabeled).await.unwrap().is_none());

        let stored = engine.trades.get(moved.id.unwrap()).await.unwrap();
        assert_eq!(stored.symbol, "AAPL");
        assert_eq!(portfolio_of(&engine, "AAPL").await.unwrap().shares, 6);
        assert!(portfolio_of(&engine, "MSFT").await.is_none());
    }

    #[tokio::test]
    async fn spec_surface_accepts_and_rejects() {
        let engine = engine();
        // Reconcile-only surface: trade rows are the caller's business.
        assert!(!engine.add_trade(&sell("AAPL", dec!(100), 5)).await.unwrap());
        assert!(engine.add_trade(&buy("AAPL", dec!(50), 10)).await.unwrap());
        assert_eq!(portfolio_of(&engine, "AAPL").await.unwrap().shares, 10);

        // No trade rows were stored through this surface, so replacing one
        // replays an empty history: zero shares, portfolio row deleted.
        let mut update = buy("AAPL", dec!(80), 10);
        update.id = Some(1);
        let mut old = buy("AAPL", dec!(50), 10);
        old.id = Some(1);
        assert!(engine.update_trade(&update, &old).await.unwrap());
        assert!(portfolio_of(&engine, "AAPL").await.is_none());
        assert!(engine.trades.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_adds_serialize_per_symbol() {
        let engine = Arc::new(engine());
        let mut handles = Vec::new();
        for i in 1..=10_i64 {
            let engine = Arc::clone(&engine);
            handles.push(tokio::spawn(async move {
                engine
                    .record(buy("AAPL", Decimal::from(100 + i), 1))
                    .await
                    .unwrap()
                    .expect("admissible")
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // The stored portfolio must equal a sequential replay of the final
        // ledger: no lost updates.
        let history = engine.trades.list_by_symbol("AAPL").await.unwrap();
        assert_eq!(history.len(), 10);
        let expected = compute_position(&history);
        let portfolio = portfolio_of(&engine, "AAPL").await.unwrap();
        assert_eq!(portfolio.shares, expected.shares);
        assert_eq!(portfolio.shares, 10);
        assert_eq!(portfolio.average_price, expected.average_price);
    }
}
