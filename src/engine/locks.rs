//! Per-instrument mutual exclusion
//!
//! Every reconciliation holds its instrument's lock across the whole
//! read-list, replay, write-portfolio span, so two mutations against the
//! same symbol can never interleave their read-modify-write. Cross-symbol
//! moves take both locks in lexicographic order, which rules out deadlock
//! between two concurrent moves in opposite directions.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::timeout;

use crate::engine::reconciler::EngineError;

const DEFAULT_WAIT: Duration = Duration::from_secs(5);

/// Registry of per-symbol mutexes with a bounded wait.
///
/// A lock that cannot be acquired within the wait window surfaces as a
/// retryable [`EngineError::Conflict`] instead of blocking indefinitely.
pub struct SymbolLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
    wait: Duration,
}

/// Held for the duration of one reconciliation against one symbol.
#[derive(Debug)]
pub struct SymbolGuard {
    _guard: OwnedMutexGuard<()>,
}

impl SymbolLocks {
    pub fn new() -> Self {
        Self::with_wait(DEFAULT_WAIT)
    }

    pub fn with_wait(wait: Duration) -> Self {
        Self {
            locks: DashMap::new(),
            wait,
        }
    }

    pub async fn acquire(&self, symbol: &str) -> Result<SymbolGuard, EngineError> {
        let lock = self
            .locks
            .entry(symbol.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        match timeout(self.wait, lock.lock_owned()).await {
            Ok(guard) => Ok(SymbolGuard { _guard: guard }),
            Err(_) => Err(EngineError::Conflict {
                symbol: symbol.to_string(),
            }),
        }
    }

    /// Acquire two distinct symbols' locks in lexicographic order.
    pub async fn acquire_pair(
        &self,
        a: &str,
        b: &str,
    ) -> Result<(SymbolGuard, SymbolGuard), EngineError> {
        debug_assert_ne!(a, b);
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let first_guard = self.acquire(first).await?;
        let second_guard = self.acquire(second).await?;
        Ok((first_guard, second_guard))
    }
}

impl Default for SymbolLocks {
    fn default() -> Self {
        Self::new()
    }
}
