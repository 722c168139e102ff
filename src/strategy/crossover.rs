use std::collections::HashMap;

use crate::common::errors::Result;
use crate::common::types::MarketSnapshot;
use crate::strategy::sizing::PositionSizer;
use crate::strategy::types::{Decision, StrategyContext};

/// Last observed trend of one instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrendState {
    #[default]
    Uninitialized,
    Bullish,
    Bearish,
}

impl TrendState {
    fn observed(bullish: bool) -> Self {
        if bullish {
            TrendState::Bullish
        } else {
            TrendState::Bearish
        }
    }
}

/// Moving-average crossover (trend following)
///
/// Opens a long when the short SMA crosses above the long SMA and exits the
/// long on the opposite cross. The first observation only seeds the trend,
/// though it may open a position if the trend is already bullish.
#[derive(Debug, Clone)]
pub struct MaCrossover {
    sizer: PositionSizer,
    trends: HashMap<String, TrendState>,
}

impl MaCrossover {
    pub fn new(sizer: PositionSizer) -> Self {
        Self {
            sizer,
            trends: HashMap::new(),
        }
    }

    pub fn trend(&self, symbol: &str) -> TrendState {
        self.trends.get(symbol).copied().unwrap_or_default()
    }

    pub fn decide(&mut self, snapshot: &MarketSnapshot, ctx: &StrategyContext) -> Result<Decision> {
        let symbol = &snapshot.symbol;
        let (short, long) = match (snapshot.indicators.sma_short, snapshot.indicators.sma_long) {
            (Some(short), Some(long)) => (short, long),
            _ => {
                return Ok(Decision::unavailable(
                    "Moving averages unavailable, not enough price history",
                ))
            }
        };

        let now = TrendState::observed(short > long);
        let previous = self.trend(symbol);
        let position = ctx.get_position(symbol);

        // Size before committing the new trend so a bad price leaves state untouched
        let decision = match (previous, now) {
            (TrendState::Uninitialized, TrendState::Bullish) if position <= 0 => {
                self.open_long(snapshot, 0.6, format!("Initial uptrend: SMA {} > {}", short, long))?
            }
            (TrendState::Bearish, TrendState::Bullish) if position <= 0 => {
                self.open_long(snapshot, 0.8, format!("Bullish crossover: SMA {} crossed above {}", short, long))?
            }
            (TrendState::Bullish, TrendState::Bearish) if position > 0 => Decision::sell(
                self.sizer.exit_quantity(ctx, symbol),
                0.8,
                format!("Bearish crossover: SMA {} crossed below {}", short, long),
            ),
            (TrendState::Uninitialized, _) => {
                Decision::hold(0.5, format!("Seeding trend: SMA {} vs {}", short, long))
            }
            _ => Decision::hold(0.5, format!("No crossover: SMA {} vs {}", short, long)),
        };

        self.trends.insert(symbol.clone(), now);
        Ok(decision)
    }

    fn open_long(&self, snapshot: &MarketSnapshot, confidence: f64, rationale: String) -> Result<Decision> {
        let quantity = self.sizer.buy_quantity(snapshot)?;
        if quantity == 0 {
            return Ok(Decision::unavailable(format!(
                "{}, but notional buys less than one unit",
                rationale
            )));
        }
        Ok(Decision::buy(quantity, confidence, rationale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Indicators;
    use crate::strategy::types::Action;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn snapshot(short: Decimal, long: Decimal) -> MarketSnapshot {
        MarketSnapshot::new("SPY", dec!(500)).with_indicators(Indicators {
            rsi: None,
            sma_short: Some(short),
            sma_long: Some(long),
        })
    }

    fn bullish() -> MarketSnapshot {
        snapshot(dec!(505), dec!(500))
    }

    fn bearish() -> MarketSnapshot {
        snapshot(dec!(495), dec!(500))
    }

    #[test]
    fn test_missing_indicators_hold_without_seeding() {
        let mut strategy = MaCrossover::new(PositionSizer::new(dec!(10000)));
        let decision = strategy
            .decide(&MarketSnapshot::new("SPY", dec!(500)), &StrategyContext::new())
            .unwrap();

        assert!(decision.is_hold());
        assert_eq!(decision.confidence, 0.0);
        assert_eq!(strategy.trend("SPY"), TrendState::Uninitialized);
    }

    #[test]
    fn test_first_bullish_tick_opens() {
        let mut strategy = MaCrossover::new(PositionSizer::new(dec!(10000)));
        let decision = strategy.decide(&bullish(), &StrategyContext::new()).unwrap();

        assert_eq!(decision.action, Action::Buy);
        assert_eq!(decision.quantity, Some(20));
        assert!((decision.confidence - 0.6).abs() < 1e-9);
        assert_eq!(strategy.trend("SPY"), TrendState::Bullish);
    }

    #[test]
    fn test_first_bearish_tick_only_seeds() {
        let mut strategy = MaCrossover::new(PositionSizer::new(dec!(10000)));
        let decision = strategy.decide(&bearish(), &StrategyContext::new()).unwrap();

        assert!(decision.is_hold());
        assert_eq!(strategy.trend("SPY"), TrendState::Bearish);
    }

    #[test]
    fn test_trades_only_on_transitions() {
        let mut strategy = MaCrossover::new(PositionSizer::new(dec!(10000)));
        let flat = StrategyContext::new();
        let long = StrategyContext::new().with_position("SPY", 20);

        strategy.decide(&bearish(), &flat).unwrap();

        let cross_up = strategy.decide(&bullish(), &flat).unwrap();
        assert_eq!(cross_up.action, Action::Buy);
        assert!((cross_up.confidence - 0.8).abs() < 1e-9);

        // Staying bullish never buys twice
        assert!(strategy.decide(&bullish(), &long).unwrap().is_hold());
        assert!(strategy.decide(&bullish(), &long).unwrap().is_hold());

        let cross_down = strategy.decide(&bearish(), &long).unwrap();
        assert_eq!(cross_down.action, Action::Sell);
        assert_eq!(cross_down.quantity, Some(20));

        assert!(strategy.decide(&bearish(), &flat).unwrap().is_hold());
    }

    #[test]
    fn test_bearish_cross_without_long_holds() {
        let mut strategy = MaCrossover::new(PositionSizer::new(dec!(10000)));
        let flat = StrategyContext::new();

        strategy.decide(&bullish(), &StrategyContext::new().with_position("SPY", 5)).unwrap();
        let decision = strategy.decide(&bearish(), &flat).unwrap();
        assert!(decision.is_hold());
        assert_eq!(strategy.trend("SPY"), TrendState::Bearish);
    }
}
