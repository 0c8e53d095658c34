//! Reconciliation core: average-cost replay, per-symbol locking, and the
//! engine that applies trade mutations to the portfolio store.

pub mod average_cost;
pub mod locks;
pub mod reconciler;

pub use average_cost::{compute_position, PositionState};
pub use locks::SymbolLocks;
pub use reconciler::{EngineError, ReconciliationEngine};
