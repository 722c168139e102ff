//! Position & P&L ledger
//!
//! The ledger is the single source of truth for what each strategy holds.
//! Strategies never keep their own position counters; they receive a
//! read-only view built from the ledger on every decision.
//!
//! # Components
//!
//! - [`Position`]: signed quantity + weighted-average entry price
//! - [`Ledger`]: trade application, realized/unrealized P&L, leaderboard
//! - [`LedgerStore`]: atomic JSON persistence of [`LedgerDocument`]
//! - [`SharedLedger`]: lock-protected handle for the single-writer discipline

mod book;
mod position;
mod store;
mod types;

use std::sync::Arc;
use tokio::sync::RwLock;

pub use book::{Ledger, StrategyAccount};
pub use position::Position;
pub use store::{LedgerDocument, LedgerStore};
pub use types::{LeaderboardEntry, TradeRecord};

/// Ledger shared between the orchestrator (writer) and report readers
///
/// Writers hold the write lock for the whole of `record_trade`, including
/// the disk write, so readers never observe a partially applied trade.
pub type SharedLedger = Arc<RwLock<Ledger>>;

/// Wrap a ledger for shared access
pub fn shared(ledger: Ledger) -> SharedLedger {
    Arc::new(RwLock::new(ledger))
}
