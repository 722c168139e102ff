use std::collections::HashSet;

use crate::common::errors::Result;
use crate::common::types::MarketSnapshot;
use crate::strategy::sizing::PositionSizer;
use crate::strategy::types::{Decision, StrategyContext};

/// Instruments this strategy has already bought
///
/// Entries are permanent: once tripped, an instrument is never bought again
/// for the life of the instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuyHoldState {
    bought: HashSet<String>,
}

impl BuyHoldState {
    pub fn has_bought(&self, symbol: &str) -> bool {
        self.bought.contains(symbol)
    }
}

/// Buys the configured notional once per instrument and holds forever
#[derive(Debug, Clone)]
pub struct BuyAndHold {
    sizer: PositionSizer,
    state: BuyHoldState,
}

impl BuyAndHold {
    pub fn new(sizer: PositionSizer) -> Self {
        Self {
            sizer,
            state: BuyHoldState::default(),
        }
    }

    pub fn state(&self) -> &BuyHoldState {
        &self.state
    }

    pub fn decide(&mut self, snapshot: &MarketSnapshot, _ctx: &StrategyContext) -> Result<Decision> {
        let symbol = &snapshot.symbol;

        if self.state.has_bought(symbol) {
            return Ok(Decision::hold(1.0, "Holding position per buy-and-hold strategy"));
        }

        let quantity = self.sizer.buy_quantity(snapshot)?;
        if quantity == 0 {
            return Ok(Decision::unavailable(format!(
                "Notional {} buys less than one unit of {} at {}",
                self.sizer.notional(),
                symbol,
                snapshot.current_price
            )));
        }

        self.state.bought.insert(symbol.clone());
        Ok(Decision::buy(
            quantity,
            1.0,
            "Initial buy for buy-and-hold strategy",
        ))
    }
}
