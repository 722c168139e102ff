//! Trait definitions for the arena's external collaborators

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::errors::Result;
use super::types::{Fill, MarketSnapshot, OrderRequest};

/// Source of market snapshots (prices, history, news, indicators)
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch a full snapshot for one instrument
    async fn fetch(&self, symbol: &str) -> Result<MarketSnapshot>;

    /// Fetch only the current price
    ///
    /// Default implementation takes the price from a full snapshot.
    async fn latest_price(&self, symbol: &str) -> Result<Decimal> {
        Ok(self.fetch(symbol).await?.current_price)
    }
}

/// Order execution against a brokerage
///
/// `execute` never returns an error: rejection, a fill that does not arrive
/// within the timeout, and transport failures all surface as `None`.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Establish the session; returns false when the broker is unreachable
    async fn connect(&mut self) -> bool;

    /// Tear down the session
    async fn disconnect(&mut self);

    /// Check if the broker session is live
    fn is_connected(&self) -> bool;

    /// Place an order and wait (bounded) for its fill
    async fn execute(&self, order: &OrderRequest) -> Option<Fill>;

    /// Broker-side position in an instrument (zero when disconnected)
    async fn position(&self, symbol: &str) -> Decimal;

    /// Net liquidation value of the account (zero when disconnected)
    async fn account_value(&self) -> Decimal;

    /// Get the name of the broker
    fn broker_name(&self) -> &'static str;
}

/// Language model completion endpoint
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Return the raw completion text for a system + user prompt pair
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Boxed broker for dynamic dispatch
pub type BoxedBroker = Box<dyn Broker>;
