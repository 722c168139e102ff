//! Common test utilities and fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use strategy_arena::common::errors::{ArenaError, Result};
use strategy_arena::common::traits::{Broker, CompletionClient, MarketDataProvider};
use strategy_arena::common::types::{Fill, Indicators, MarketSnapshot, OrderRequest};

/// Market data served from a mutable in-memory table
#[derive(Clone, Default)]
pub struct FakeMarketData {
    snapshots: Arc<Mutex<HashMap<String, MarketSnapshot>>>,
    failing: Arc<Mutex<Vec<String>>>,
}

impl FakeMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_price(&self, symbol: &str, price: Decimal) {
        self.set_snapshot(MarketSnapshot::new(symbol, price));
    }

    pub fn set_snapshot(&self, snapshot: MarketSnapshot) {
        self.snapshots
            .lock()
            .unwrap()
            .insert(snapshot.symbol.clone(), snapshot);
    }

    pub fn set_indicators(&self, symbol: &str, price: Decimal, indicators: Indicators) {
        self.set_snapshot(MarketSnapshot::new(symbol, price).with_indicators(indicators));
    }

    pub fn fail(&self, symbol: &str) {
        self.failing.lock().unwrap().push(symbol.to_string());
    }

    pub fn recover(&self, symbol: &str) {
        self.failing.lock().unwrap().retain(|s| s != symbol);
    }
}

#[async_trait]
impl MarketDataProvider for FakeMarketData {
    async fn fetch(&self, symbol: &str) -> Result<MarketSnapshot> {
        if self.failing.lock().unwrap().iter().any(|s| s == symbol) {
            return Err(ArenaError::market_data(symbol, "feed down"));
        }
        self.snapshots
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .ok_or_else(|| ArenaError::market_data(symbol, "unknown symbol"))
    }
}

/// Broker that fills at the reference price unless told to reject
#[derive(Clone, Default)]
pub struct FakeBroker {
    pub orders: Arc<Mutex<Vec<OrderRequest>>>,
    rejecting: Arc<Mutex<bool>>,
    connected: bool,
}

impl FakeBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_all(&self, reject: bool) {
        *self.rejecting.lock().unwrap() = reject;
    }

    pub fn order_count(&self) -> usize {
        self.orders.lock().unwrap().len()
    }
}

#[async_trait]
impl Broker for FakeBroker {
    async fn connect(&mut self) -> bool {
        self.connected = true;
        true
    }

    async fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn execute(&self, order: &OrderRequest) -> Option<Fill> {
        self.orders.lock().unwrap().push(order.clone());
        if *self.rejecting.lock().unwrap() {
            return None;
        }
        let mut fill = Fill::simulated(order);
        fill.simulated = false;
        fill.order_id = Some(format!("fake-{}", self.order_count()));
        Some(fill)
    }

    async fn position(&self, _symbol: &str) -> Decimal {
        Decimal::ZERO
    }

    async fn account_value(&self) -> Decimal {
        Decimal::ZERO
    }

    fn broker_name(&self) -> &'static str {
        "fake"
    }
}

/// Broker whose fills never arrive
pub struct StuckBroker;

#[async_trait]
impl Broker for StuckBroker {
    async fn connect(&mut self) -> bool {
        true
    }

    async fn disconnect(&mut self) {}

    fn is_connected(&self) -> bool {
        true
    }

    async fn execute(&self, _order: &OrderRequest) -> Option<Fill> {
        std::future::pending::<Option<Fill>>().await
    }

    async fn position(&self, _symbol: &str) -> Decimal {
        Decimal::ZERO
    }

    async fn account_value(&self) -> Decimal {
        Decimal::ZERO
    }

    fn broker_name(&self) -> &'static str {
        "stuck"
    }
}

/// Completion client replaying canned replies, then erroring
#[derive(Clone, Default)]
pub struct ScriptedLlm {
    replies: Arc<Mutex<Vec<String>>>,
}

impl ScriptedLlm {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Arc::new(Mutex::new(
                replies.iter().rev().map(|r| r.to_string()).collect(),
            )),
        }
    }
}

#[async_trait]
impl CompletionClient for ScriptedLlm {
    async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        self.replies
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| ArenaError::Timeout("no scripted reply".to_string()))
    }
}
