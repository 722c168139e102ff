//! Ledger record types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::common::types::Side;

/// Immutable record of one executed trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub strategy: String,
    pub symbol: String,
    #[serde(rename = "action")]
    pub side: Side,
    /// Always positive
    pub quantity: u64,
    pub price: Decimal,
    /// Realized P&L of the closing portion, `None` for pure opens/adds
    #[serde(rename = "pnl")]
    pub realized_pnl: Option<Decimal>,
    /// True when the fill came from dry-run simulation
    #[serde(default)]
    pub simulated: bool,
}

/// One row of the leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub strategy: String,
    pub total_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub trade_count: usize,
    /// How many of `trade_count` were simulated fills
    pub simulated_trades: usize,
    /// Open positions, symbol to signed quantity
    pub positions: BTreeMap<String, i64>,
}

impl LeaderboardEntry {
    /// True when any of this strategy's fills were simulated
    pub fn has_simulated_fills(&self) -> bool {
        self.simulated_trades > 0
    }
}
