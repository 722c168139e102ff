//! StrategyArena Library
//!
//! Pits trading strategies (buy-and-hold, mean reversion, moving-average
//! crossover and an LLM-backed trader) against each other on a fixed
//! schedule, routes their orders to a broker and ranks them by P&L.

pub mod arena;
pub mod broker;
pub mod common;
pub mod config;
pub mod ledger;
pub mod llm;
pub mod market;
pub mod strategy;

// Re-export commonly used types
pub use arena::{Arena, CycleReport, Scheduler};
pub use common::errors::{ArenaError, Result};
pub use common::traits::{Broker, CompletionClient, MarketDataProvider};
pub use common::types::{Fill, Indicators, MarketSnapshot, OrderRequest, PriceSeries, Side};
pub use config::types::AppConfig;
pub use ledger::{LeaderboardEntry, Ledger, Position, SharedLedger, TradeRecord};

// Strategy types
pub use strategy::{Action, Decision, Strategy, StrategyContext, StrategyKind};
