//! Unified types shared by the ledger, strategies and collaborators

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Sign applied to a quantity when this side moves a position
    pub fn signum(&self) -> i64 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }

    /// Lowercase form used by REST APIs
    pub fn as_lower(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// A closing-price series at one sampling interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    /// Sampling interval label (e.g. "15m", "1d")
    pub timeframe: String,
    /// Closing prices, oldest first
    pub closes: Vec<Decimal>,
}

impl PriceSeries {
    pub fn new(timeframe: impl Into<String>, closes: Vec<Decimal>) -> Self {
        Self {
            timeframe: timeframe.into(),
            closes,
        }
    }
}

/// Technical indicators attached to a snapshot
///
/// Every field is `None` when the provider could not compute it. Strategies
/// must treat `None` as "unavailable", never as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    /// Relative strength index over the configured period
    pub rsi: Option<Decimal>,
    /// Short simple moving average
    pub sma_short: Option<Decimal>,
    /// Long simple moving average
    pub sma_long: Option<Decimal>,
}

/// Point-in-time market view of one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub current_price: Decimal,
    /// One or more series; the first is the primary timeframe
    pub price_history: Vec<PriceSeries>,
    pub news_headlines: Vec<String>,
    #[serde(default)]
    pub indicators: Indicators,
    pub timestamp: DateTime<Utc>,
}

impl MarketSnapshot {
    /// Create a snapshot with only a price, no history or indicators
    pub fn new(symbol: impl Into<String>, current_price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            current_price,
            price_history: Vec::new(),
            news_headlines: Vec::new(),
            indicators: Indicators::default(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_history(mut self, series: PriceSeries) -> Self {
        self.price_history.push(series);
        self
    }

    pub fn with_indicators(mut self, indicators: Indicators) -> Self {
        self.indicators = indicators;
        self
    }

    pub fn with_headlines(mut self, headlines: Vec<String>) -> Self {
        self.news_headlines = headlines;
        self
    }

    /// Closes of the primary timeframe, or an empty slice
    pub fn primary_closes(&self) -> &[Decimal] {
        self.price_history
            .first()
            .map(|s| s.closes.as_slice())
            .unwrap_or(&[])
    }
}

/// An order routed to the broker
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    /// Always positive
    pub quantity: u64,
    /// Tag identifying the originating strategy
    pub tag: String,
    /// Last quoted price, used for simulated fills
    pub reference_price: Decimal,
}

impl OrderRequest {
    pub fn new(symbol: impl Into<String>, side: Side, quantity: u64, strategy: &str) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            tag: format!("LLM-ARENA-{}", strategy),
            reference_price: Decimal::ZERO,
        }
    }

    pub fn with_reference_price(mut self, price: Decimal) -> Self {
        self.reference_price = price;
        self
    }
}

/// An execution reported by the broker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub symbol: String,
    pub side: Side,
    pub quantity: u64,
    pub price: Decimal,
    /// Broker order id, absent for simulated fills
    pub order_id: Option<String>,
    /// True when no live broker executed this fill
    pub simulated: bool,
    pub filled_at: DateTime<Utc>,
}

impl Fill {
    /// A dry-run fill at the order's reference price
    pub fn simulated(order: &OrderRequest) -> Self {
        Self {
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
            price: order.reference_price,
            order_id: None,
            simulated: true,
            filled_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_primary_closes_empty_without_history() {
        let snapshot = MarketSnapshot::new("SPY", dec!(500));
        assert!(snapshot.primary_closes().is_empty());

        let snapshot = snapshot
            .with_history(PriceSeries::new("15m", vec![dec!(1), dec!(2)]))
            .with_history(PriceSeries::new("1d", vec![dec!(3)]));
        assert_eq!(snapshot.primary_closes(), &[dec!(1), dec!(2)]);
    }

    #[test]
    fn test_simulated_fill_uses_reference_price() {
        let order = OrderRequest::new("AAPL", Side::Sell, 7, "Buy & Hold")
            .with_reference_price(dec!(190.25));
        let fill = Fill::simulated(&order);

        assert!(fill.simulated);
        assert_eq!(fill.price, dec!(190.25));
        assert_eq!(fill.quantity, 7);
        assert_eq!(order.tag, "LLM-ARENA-Buy & Hold");
    }

    #[test]
    fn test_side_serialization() {
        assert_eq!(serde_json::to_string(&Side::Buy).unwrap(), "\"BUY\"");
        assert_eq!(Side::Sell.signum(), -1);
        assert_eq!(Side::Buy.to_string(), "BUY");
    }
}
