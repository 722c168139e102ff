use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::common::types::Side;

/// What a strategy wants to do this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    /// Order side for trading actions, `None` for HOLD
    pub fn side(&self) -> Option<Side> {
        match self {
            Action::Buy => Some(Side::Buy),
            Action::Sell => Some(Side::Sell),
            Action::Hold => None,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Buy => write!(f, "BUY"),
            Action::Sell => write!(f, "SELL"),
            Action::Hold => write!(f, "HOLD"),
        }
    }
}

/// Strategy decision output
///
/// BUY and SELL carry a quantity; HOLD never does. Confidence is clamped to
/// [0, 1] on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub action: Action,
    pub quantity: Option<u64>,
    pub confidence: f64,
    pub rationale: String,
}

impl Decision {
    pub fn buy(quantity: u64, confidence: f64, rationale: impl Into<String>) -> Self {
        Self::trade(Action::Buy, quantity, confidence, rationale)
    }

    pub fn sell(quantity: u64, confidence: f64, rationale: impl Into<String>) -> Self {
        Self::trade(Action::Sell, quantity, confidence, rationale)
    }

    pub fn hold(confidence: f64, rationale: impl Into<String>) -> Self {
        Self {
            action: Action::Hold,
            quantity: None,
            confidence: clamp_confidence(confidence),
            rationale: rationale.into(),
        }
    }

    /// HOLD with zero confidence, used for every degraded path
    pub fn unavailable(rationale: impl Into<String>) -> Self {
        Self::hold(0.0, rationale)
    }

    fn trade(action: Action, quantity: u64, confidence: f64, rationale: impl Into<String>) -> Self {
        Self {
            action,
            quantity: Some(quantity),
            confidence: clamp_confidence(confidence),
            rationale: rationale.into(),
        }
    }

    pub fn is_hold(&self) -> bool {
        self.action == Action::Hold
    }

    /// Side and size to send to the broker, if this decision trades at all
    pub fn order(&self) -> Option<(Side, u64)> {
        let side = self.action.side()?;
        match self.quantity {
            Some(quantity) if quantity > 0 => Some((side, quantity)),
            _ => None,
        }
    }
}

/// Clamp into [0, 1]; NaN becomes 0
pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Context provided to strategies by the orchestrator
///
/// A read-only view of the ledger's positions for the deciding strategy.
/// Strategies use this instead of keeping their own position counters.
#[derive(Debug, Clone, Default)]
pub struct StrategyContext {
    /// Signed quantity by symbol
    pub positions: HashMap<String, i64>,
}

impl StrategyContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(mut self, symbol: impl Into<String>, quantity: i64) -> Self {
        self.positions.insert(symbol.into(), quantity);
        self
    }

    /// Signed position in a symbol, zero if none
    pub fn get_position(&self, symbol: &str) -> i64 {
        self.positions.get(symbol).copied().unwrap_or(0)
    }

    /// Size of the long position, zero when flat or short
    pub fn long_quantity(&self, symbol: &str) -> u64 {
        self.get_position(symbol).max(0) as u64
    }

    /// Check if we hold a long position in a symbol
    pub fn has_long(&self, symbol: &str) -> bool {
        self.get_position(symbol) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hold_has_no_order() {
        let decision = Decision::hold(0.5, "nothing to do");
        assert!(decision.is_hold());
        assert_eq!(decision.quantity, None);
        assert_eq!(decision.order(), None);
    }

    #[test]
    fn test_zero_quantity_trade_has_no_order() {
        assert_eq!(Decision::sell(0, 0.8, "flat").order(), None);
        assert_eq!(Decision::buy(12, 0.8, "go").order(), Some((Side::Buy, 12)));
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(Decision::buy(1, 3.5, "").confidence, 1.0);
        assert_eq!(Decision::hold(-1.0, "").confidence, 0.0);
        assert_eq!(Decision::hold(f64::NAN, "").confidence, 0.0);
    }

    #[test]
    fn test_context_long_quantity() {
        let ctx = StrategyContext::new()
            .with_position("SPY", 20)
            .with_position("QQQ", -5);

        assert_eq!(ctx.long_quantity("SPY"), 20);
        assert_eq!(ctx.long_quantity("QQQ"), 0);
        assert!(!ctx.has_long("AAPL"));
    }
}
