//! Dry-run broker that fills every order at its reference price

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{info, warn};

use crate::common::traits::Broker;
use crate::common::types::{Fill, OrderRequest};

/// Broker used for `--dry-run` and tests
///
/// Fills are marked simulated and priced at `OrderRequest::reference_price`.
/// Orders without a usable reference price are not filled.
#[derive(Debug)]
pub struct SimulatedBroker {
    connected: bool,
    account_value: Decimal,
    positions: Mutex<HashMap<String, Decimal>>,
}

impl SimulatedBroker {
    pub fn new(account_value: Decimal) -> Self {
        Self {
            connected: false,
            account_value,
            positions: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for SimulatedBroker {
    fn default() -> Self {
        Self::new(Decimal::ZERO)
    }
}

#[async_trait]
impl Broker for SimulatedBroker {
    async fn connect(&mut self) -> bool {
        self.connected = true;
        info!("Simulated broker ready, all fills are dry-run");
        true
    }

    async fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn execute(&self, order: &OrderRequest) -> Option<Fill> {
        if order.quantity == 0 || order.reference_price <= Decimal::ZERO {
            warn!(symbol = %order.symbol, price = %order.reference_price, "Cannot simulate fill without a price");
            return None;
        }

        let fill = Fill::simulated(order);
        if let Ok(mut positions) = self.positions.lock() {
            let held = positions.entry(fill.symbol.clone()).or_default();
            *held += Decimal::from(fill.side.signum() * fill.quantity as i64);
        }
        info!(
            tag = %order.tag,
            side = %fill.side,
            quantity = fill.quantity,
            symbol = %fill.symbol,
            price = %fill.price,
            simulated = true,
            "[SIMULATED] fill"
        );
        Some(fill)
    }

    async fn position(&self, symbol: &str) -> Decimal {
        self.positions
            .lock()
            .ok()
            .and_then(|p| p.get(symbol).copied())
            .unwrap_or_default()
    }

    async fn account_value(&self) -> Decimal {
        self.account_value
    }

    fn broker_name(&self) -> &'static str {
        "simulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Side;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_fills_at_reference_price() {
        let mut broker = SimulatedBroker::default();
        assert!(broker.connect().await);

        let order = OrderRequest::new("SPY", Side::Buy, 20, "Buy & Hold").with_reference_price(dec!(500));
        let fill = broker.execute(&order).await.unwrap();

        assert!(fill.simulated);
        assert_eq!(fill.price, dec!(500));
        assert_eq!(fill.quantity, 20);
        assert_eq!(broker.position("SPY").await, dec!(20));
    }

    #[test]
    fn test_connect_and_account_value() {
        let mut broker = SimulatedBroker::new(dec!(25000));
        assert!(!broker.is_connected());
        assert!(tokio_test::block_on(broker.connect()));
        assert!(broker.is_connected());
        assert_eq!(tokio_test::block_on(broker.account_value()), dec!(25000));
    }

    #[tokio::test]
    async fn test_no_fill_without_price() {
        let broker = SimulatedBroker::default();
        let order = OrderRequest::new("SPY", Side::Sell, 5, "x");
        assert!(broker.execute(&order).await.is_none());
        assert_eq!(broker.position("SPY").await, Decimal::ZERO);
    }
}
