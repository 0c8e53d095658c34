//! Average-cost position replay
//!
//! Pure function mapping one instrument's ordered trade history to its
//! share count and weighted-average cost basis. The caller guarantees the
//! slice is ascending by id, which for a single instrument is ascending
//! chronological order.

use rust_decimal::Decimal;

use crate::ledger::types::{Trade, TradeSide, PRICE_SCALE};

/// Result of replaying a trade history.
///
/// `shares` can be negative: a history that oversells short-circuits and is
/// returned as-is so the reconciler can reject the mutation that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionState {
    pub shares: i64,
    pub average_price: Decimal,
}

impl PositionState {
    pub fn flat() -> Self {
        Self {
            shares: 0,
            average_price: Decimal::ZERO,
        }
    }
}

/// Replay `trades` in order and return the resulting position.
///
/// The first trade always seeds the position from its own shares and price,
/// without inspecting its side. A sell-first history therefore seeds a
/// positive position instead of going short. That matches the system this
/// ledger is reconciled against and is kept deliberately; do not "fix" it
/// here without also migrating every stored history.
///
/// Buys fold into the weighted average, rounded to two decimal places at
/// every step (banker's rounding, the `Decimal::round_dp` default). The
/// average is path dependent because of this per-step rounding. Sells reduce
/// shares and leave the average untouched. Once the running share count is
/// negative the replay stops and reports the negative state.
pub fn compute_position(trades: &[Trade]) -> PositionState {
    let Some(first) = trades.first() else {
        return PositionState::flat();
    };

    let mut shares = first.shares;
    let mut average_price = first.price;

    for trade in &trades[1..] {
        if shares < 0 {
            break;
        }
        match trade.side {
            TradeSide::Buy => {
                let cost = average_price * Decimal::from(shares)
                    + trade.price * Decimal::from(trade.shares);
                shares += trade.shares;
                average_price = (cost / Decimal::from(shares)).round_dp(PRICE_SCALE);
            }
            TradeSide::Sell => {
                shares -= trade.shares;
            }
        }
    }

    PositionState {
        shares,
        average_price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn trade(side: TradeSide, price: Decimal, shares: i64) -> Trade {
        Trade::new("AAPL", side, price, shares).unwrap()
    }

    fn buy(price: Decimal, shares: i64) -> Trade {
        trade(TradeSide::Buy, price, shares)
    }

    fn sell(price: Decimal, shares: i64) -> Trade {
        trade(TradeSide::Sell, price, shares)
    }

    #[test]
    fn empty_history_is_flat() {
        assert_eq!(compute_position(&[]), PositionState::flat());
    }

    #[test]
    fn single_buy_seeds_position() {
        let state = compute_position(&[buy(dec!(100), 10)]);
        assert_eq!(state.shares, 10);
        assert_eq!(state.average_price, dec!(100.00));
    }

    #[test]
    fn buys_fold_into_weighted_average() {
        let state = compute_position(&[buy(dec!(100), 10), buy(dec!(120), 5)]);
        assert_eq!(state.shares, 15);
        // (10*100 + 5*120) / 15 = 106.666... -> 106.67
        assert_eq!(state.average_price, dec!(106.67));
    }

    #[test]
    fn sells_leave_average_untouched() {
        let state = compute_position(&[buy(dec!(100), 10), sell(dec!(150), 4)]);
        assert_eq!(state.shares, 6);
        assert_eq!(state.average_price, dec!(100.00));
    }

    #[test]
    fn overselling_goes_negative() {
        let state = compute_position(&[buy(dec!(100), 10), sell(dec!(90), 15)]);
        assert_eq!(state.shares, -5);
        assert_eq!(state.average_price, dec!(100.00));
    }

    #[test]
    fn negative_shares_short_circuit_the_replay() {
        // The buy after the oversell must never be folded in.
        let state = compute_position(&[
            buy(dec!(100), 10),
            sell(dec!(90), 15),
            buy(dec!(80), 100),
        ]);
        assert_eq!(state.shares, -5);
        assert_eq!(state.average_price, dec!(100.00));
    }

    #[test]
    fn first_trade_side_is_not_inspected() {
        // Historical quirk: a sell-first history seeds a positive position.
        let state = compute_position(&[sell(dec!(50), 8), buy(dec!(100), 2)]);
        assert_eq!(state.shares, 10);
        assert_eq!(state.average_price, dec!(60.00));
    }

    #[test]
    fn rounding_happens_at_every_buy_step() {
        // (3*1.00 + 3*1.01)/6 = 1.005, a midpoint: banker's rounding takes
        // it to the even digit, 1.00. The next buy folds the already-rounded
        // average, not the exact 1.005.
        let intermediate = compute_position(&[buy(dec!(1.00), 3), buy(dec!(1.01), 3)]);
        assert_eq!(intermediate.average_price, dec!(1.00));

        let state = compute_position(&[
            buy(dec!(1.00), 3),
            buy(dec!(1.01), 3),
            buy(dec!(2.00), 6),
        ]);
        assert_eq!(state.shares, 12);
        // (6*1.00 + 6*2.00)/12, carried forward from the rounded step.
        assert_eq!(state.average_price, dec!(1.50));
    }

    #[test]
    fn replay_is_deterministic() {
        let history = vec![
            buy(dec!(33.33), 7),
            buy(dec!(41.79), 11),
            sell(dec!(60.00), 5),
            buy(dec!(12.01), 3),
        ];
        assert_eq!(compute_position(&history), compute_position(&history));
    }
}
