//! Ledger type definitions with strong typing
//!
//! `Trade` is the append-only ledger row, `Portfolio` the derived position
//! row. All field validation lives in the constructors; stores and the
//! engine can assume any value they receive has already passed it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of decimal places kept on every stored price.
pub const PRICE_SCALE: u32 = 2;

/// Field-level validation failure, surfaced to the caller as a rejection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ticker symbol must not be empty")]
    EmptySymbol,
    #[error("invalid price {0}, expected value greater than 0")]
    InvalidPrice(Decimal),
    #[error("invalid shares {0}, expected value greater than 0")]
    InvalidShares(i64),
}

/// Trade direction, serialized as "buy"/"sell" on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "buy"),
            TradeSide::Sell => write!(f, "sell"),
        }
    }
}

/// A single ledger entry for one instrument.
///
/// `id` is `None` until the trade is first persisted; the store assigns a
/// monotonically increasing id, so ascending id is ascending chronology
/// within one instrument's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: Option<u64>,
    pub symbol: String,
    pub side: TradeSide,
    pub price: Decimal,
    pub shares: i64,
    pub timestamp: DateTime<Utc>,
}

impl Trade {
    /// Build a draft trade, validating every field.
    ///
    /// The symbol is uppercased and the price normalized to two decimal
    /// places, mirroring how rows are stored.
    pub fn new(
        symbol: impl Into<String>,
        side: TradeSide,
        price: Decimal,
        shares: i64,
    ) -> Result<Self, ValidationError> {
        let symbol = symbol.into().trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        if price <= Decimal::ZERO {
            return Err(ValidationError::InvalidPrice(price));
        }
        if shares <= 0 {
            return Err(ValidationError::InvalidShares(shares));
        }
        Ok(Self {
            id: None,
            symbol,
            side,
            price: price.round_dp(PRICE_SCALE),
            shares,
            timestamp: Utc::now(),
        })
    }
}

impl std::fmt::Display for Trade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} @ {}",
            self.symbol, self.side, self.shares, self.price
        )
    }
}

/// Derived position row, one per tracked instrument.
///
/// Never persisted with `shares <= 0`: a position that reconciles to zero
/// shares is deleted rather than zeroed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub symbol: String,
    pub average_price: Decimal,
    pub shares: i64,
}

impl Portfolio {
    pub fn new(
        symbol: impl Into<String>,
        average_price: Decimal,
        shares: i64,
    ) -> Result<Self, ValidationError> {
        let symbol = symbol.into().trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        if average_price <= Decimal::ZERO {
            return Err(ValidationError::InvalidPrice(average_price));
        }
        if shares <= 0 {
            return Err(ValidationError::InvalidShares(shares));
        }
        Ok(Self {
            symbol,
            average_price: average_price.round_dp(PRICE_SCALE),
            shares,
        })
    }

    /// Cost basis of the whole position.
    pub fn cost_basis(&self) -> Decimal {
        self.average_price * Decimal::from(self.shares)
    }
}

impl std::fmt::Display for Portfolio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.symbol, self.average_price, self.shares)
    }
}
