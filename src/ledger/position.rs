//! Signed position with weighted-average entry price

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::errors::{ArenaError, Result};
use crate::common::types::Side;

/// Position of one strategy in one instrument
///
/// Positive quantity is long, negative is short. The entry price exists only
/// while the position is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    quantity: i64,
    entry_price: Option<Decimal>,
}

impl Position {
    /// A flat position
    pub fn flat() -> Self {
        Self::default()
    }

    /// Rebuild a position from persisted parts
    pub fn from_parts(quantity: i64, entry_price: Option<Decimal>) -> Result<Self> {
        match (quantity, entry_price) {
            (0, _) => Ok(Self::flat()),
            (_, Some(entry)) => Ok(Self {
                quantity,
                entry_price: Some(entry),
            }),
            (_, None) => Err(ArenaError::InvalidTrade(format!(
                "open position of {} has no entry price",
                quantity
            ))),
        }
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    /// Average entry price, `None` when flat
    pub fn entry_price(&self) -> Option<Decimal> {
        self.entry_price
    }

    pub fn is_flat(&self) -> bool {
        self.quantity == 0
    }

    pub fn is_long(&self) -> bool {
        self.quantity > 0
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0
    }

    /// Apply a trade and return the realized P&L it produced
    ///
    /// Returns `Ok(None)` when the trade only opened or added to the position.
    /// The portion of a trade that closes the existing position realizes
    /// against the current entry price; any remainder opens a fresh position
    /// at `price`. While the position keeps its sign the entry price is
    /// re-blended by size with the trade price, reductions included.
    ///
    /// A quantity that does not fit the signed position is rejected and
    /// leaves the position untouched.
    pub fn apply(&mut self, side: Side, quantity: u64, price: Decimal) -> Result<Option<Decimal>> {
        let current = self.quantity;
        let traded = i64::try_from(quantity).map_err(|_| {
            ArenaError::InvalidTrade(format!("quantity {} exceeds position range", quantity))
        })?;
        let next = current.checked_add(side.signum() * traded).ok_or_else(|| {
            ArenaError::InvalidTrade(format!(
                "{} {} on position of {} overflows",
                side, quantity, current
            ))
        })?;
        let closes_existing = (side == Side::Buy && current < 0) || (side == Side::Sell && current > 0);

        let realized = if closes_existing {
            // entry_price is always set while current != 0
            let entry = self.entry_price.unwrap_or(price);
            let closed = Decimal::from(traded.min(current.abs()));
            Some(match side {
                Side::Buy => closed * (entry - price),
                Side::Sell => closed * (price - entry),
            })
        } else {
            None
        };

        self.entry_price = if next == 0 {
            None
        } else if current != 0 && current.signum() == next.signum() {
            let held = Decimal::from(current.unsigned_abs());
            let traded = Decimal::from(quantity);
            let old_entry = self.entry_price.unwrap_or(price);
            Some((held * old_entry + traded * price) / (held + traded))
        } else {
            // fresh open or direction flip
            Some(price)
        };
        self.quantity = next;

        Ok(realized)
    }

    /// Mark-to-market P&L of the open quantity at `price`
    pub fn unrealized_pnl(&self, price: Decimal) -> Decimal {
        match self.entry_price {
            Some(entry) if self.quantity > 0 => Decimal::from(self.quantity) * (price - entry),
            Some(entry) if self.quantity < 0 => Decimal::from(self.quantity.abs()) * (entry - price),
            _ => Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_open_long_sets_entry() {
        let mut position = Position::flat();
        let realized = position.apply(Side::Buy, 100, dec!(10)).unwrap();

        assert_eq!(realized, None);
        assert_eq!(position.quantity(), 100);
        assert_eq!(position.entry_price(), Some(dec!(10)));
    }

    #[test]
    fn test_add_blends_entry() {
        let mut position = Position::flat();
        position.apply(Side::Buy, 100, dec!(10)).unwrap();
        let realized = position.apply(Side::Buy, 50, dec!(20)).unwrap();

        assert_eq!(realized, None);
        assert_eq!(position.quantity(), 150);
        let entry = position.entry_price().unwrap();
        assert_eq!(entry.round_dp(10), dec!(13.3333333333));
    }

    #[test]
    fn test_full_close_realizes_and_clears_entry() {
        let mut position = Position::flat();
        position.apply(Side::Buy, 100, dec!(10)).unwrap();
        position.apply(Side::Buy, 50, dec!(20)).unwrap();
        let realized = position.apply(Side::Sell, 150, dec!(15)).unwrap().unwrap();

        assert_eq!(realized.round_dp(8), dec!(250));
        assert!(position.is_flat());
        assert_eq!(position.entry_price(), None);
    }

    #[test]
    fn test_flip_long_to_short_opens_at_trade_price() {
        let mut position = Position::flat();
        position.apply(Side::Buy, 50, dec!(10)).unwrap();
        let realized = position.apply(Side::Sell, 80, dec!(12)).unwrap();

        assert_eq!(realized, Some(dec!(100)));
        assert_eq!(position.quantity(), -30);
        assert_eq!(position.entry_price(), Some(dec!(12)));
    }

    #[test]
    fn test_short_cover_realizes_entry_minus_price() {
        let mut position = Position::flat();
        position.apply(Side::Sell, 40, dec!(50)).unwrap();
        let realized = position.apply(Side::Buy, 10, dec!(45)).unwrap();

        assert_eq!(realized, Some(dec!(50)));
        assert_eq!(position.quantity(), -30);
        // (40 * 50 + 10 * 45) / 50
        assert_eq!(position.entry_price(), Some(dec!(49)));
    }

    #[test]
    fn test_partial_close_reblends_entry() {
        let mut position = Position::flat();
        position.apply(Side::Buy, 100, dec!(10)).unwrap();
        let realized = position.apply(Side::Sell, 40, dec!(12)).unwrap();

        assert_eq!(realized, Some(dec!(80)));
        assert_eq!(position.quantity(), 60);
        // (100 * 10 + 40 * 12) / 140
        let entry = position.entry_price().unwrap();
        assert_eq!(entry.round_dp(6), dec!(10.571429));
        assert_eq!(position.unrealized_pnl(dec!(12)).round_dp(6), dec!(85.714286));
    }

    #[test]
    fn test_oversized_quantity_rejected_untouched() {
        let mut position = Position::flat();
        position.apply(Side::Buy, 10, dec!(100)).unwrap();

        let err = position.apply(Side::Buy, u64::MAX, dec!(100)).unwrap_err();
        assert!(matches!(err, ArenaError::InvalidTrade(_)));

        let mut near_limit = Position::from_parts(i64::MAX - 1, Some(dec!(1))).unwrap();
        assert!(near_limit.apply(Side::Buy, 5, dec!(1)).is_err());
        assert_eq!(near_limit.quantity(), i64::MAX - 1);

        assert_eq!(position.quantity(), 10);
        assert_eq!(position.entry_price(), Some(dec!(100)));
    }

    #[test]
    fn test_unrealized_pnl() {
        let long = Position::from_parts(10, Some(dec!(100))).unwrap();
        let short = Position::from_parts(-10, Some(dec!(100))).unwrap();

        assert_eq!(long.unrealized_pnl(dec!(105)), dec!(50));
        assert_eq!(short.unrealized_pnl(dec!(105)), dec!(-50));
        assert_eq!(Position::flat().unrealized_pnl(dec!(1000)), Decimal::ZERO);
    }

    #[test]
    fn test_from_parts_requires_entry_when_open() {
        assert!(Position::from_parts(5, None).is_err());
        assert_eq!(Position::from_parts(0, Some(dec!(3))).unwrap(), Position::flat());
    }
}
