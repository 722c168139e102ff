use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::common::errors::{ArenaError, Result};
use crate::common::types::MarketSnapshot;
use crate::strategy::types::StrategyContext;

/// Converts a fixed notional into whole-unit order sizes
///
/// BUY size is `floor(notional / price)`; full-exit SELL size is the whole
/// long position from the ledger view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSizer {
    notional: Decimal,
}

impl PositionSizer {
    pub fn new(notional: Decimal) -> Self {
        Self { notional }
    }

    pub fn notional(&self) -> Decimal {
        self.notional
    }

    /// Whole units affordable at the snapshot's price
    ///
    /// Zero when the notional is below one unit. A non-positive price is
    /// unusable data and an error.
    pub fn buy_quantity(&self, snapshot: &MarketSnapshot) -> Result<u64> {
        let price = snapshot.current_price;
        if price <= Decimal::ZERO {
            return Err(ArenaError::market_data(
                &snapshot.symbol,
                format!("cannot size an order at price {}", price),
            ));
        }

        let units = self
            .notional
            .checked_div(price)
            .ok_or_else(|| {
                ArenaError::Internal(format!(
                    "notional {} at price {} overflows for {}",
                    self.notional, price, snapshot.symbol
                ))
            })?
            .floor();
        units.to_u64().ok_or_else(|| {
            ArenaError::Internal(format!(
                "order size {} for {} out of range",
                units, snapshot.symbol
            ))
        })
    }

    /// Entire long position, zero when flat or short
    pub fn exit_quantity(&self, ctx: &StrategyContext, symbol: &str) -> u64 {
        ctx.long_quantity(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_buy_quantity_floors() {
        let sizer = PositionSizer::new(dec!(10000));
        let snapshot = MarketSnapshot::new("SPY", dec!(512.34));
        assert_eq!(sizer.buy_quantity(&snapshot).unwrap(), 19);
    }

    #[test]
    fn test_notional_below_one_unit() {
        let sizer = PositionSizer::new(dec!(100));
        let snapshot = MarketSnapshot::new("BRK.A", dec!(600000));
        assert_eq!(sizer.buy_quantity(&snapshot).unwrap(), 0);
    }

    #[test]
    fn test_non_positive_price_is_error() {
        let sizer = PositionSizer::new(dec!(100));
        let snapshot = MarketSnapshot::new("SPY", Decimal::ZERO);
        assert!(sizer.buy_quantity(&snapshot).is_err());
    }

    #[test]
    fn test_oversized_notional_is_error() {
        let snapshot = MarketSnapshot::new("SPY", dec!(0.5));
        let err = PositionSizer::new(Decimal::MAX).buy_quantity(&snapshot).unwrap_err();
        assert!(matches!(err, ArenaError::Internal(_)));

        // fits a Decimal but not a whole-unit order size
        let snapshot = MarketSnapshot::new("SPY", dec!(1));
        assert!(PositionSizer::new(dec!(100000000000000000000))
            .buy_quantity(&snapshot)
            .is_err());
    }

    #[test]
    fn test_exit_quantity_is_full_long() {
        let sizer = PositionSizer::new(dec!(100));
        let ctx = StrategyContext::new().with_position("SPY", 42);
        assert_eq!(sizer.exit_quantity(&ctx, "SPY"), 42);
        assert_eq!(sizer.exit_quantity(&ctx, "QQQ"), 0);
    }
}
