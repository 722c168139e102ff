//! Per-strategy position and P&L ledger

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tracing::{info, instrument};

use super::position::Position;
use super::store::{LedgerDocument, LedgerStore};
use super::types::{LeaderboardEntry, TradeRecord};
use crate::common::errors::{ArenaError, Result};
use crate::common::types::{Fill, Side};

/// Everything the ledger knows about one strategy
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyAccount {
    pub strategy: String,
    pub positions: BTreeMap<String, Position>,
    pub realized_pnl: Decimal,
    pub trade_count: usize,
    pub simulated_trades: usize,
}

impl StrategyAccount {
    fn new(strategy: &str) -> Self {
        Self {
            strategy: strategy.to_string(),
            positions: BTreeMap::new(),
            realized_pnl: Decimal::ZERO,
            trade_count: 0,
            simulated_trades: 0,
        }
    }

    /// Sum of mark-to-market P&L over open positions
    ///
    /// An open position with no quoted price contributes zero. This is an
    /// approximation: the leaderboard understates exposure in instruments
    /// whose price could not be fetched.
    pub fn unrealized_pnl(&self, prices: &HashMap<String, Decimal>) -> Decimal {
        self.positions
            .iter()
            .filter(|(_, position)| !position.is_flat())
            .filter_map(|(symbol, position)| {
                prices.get(symbol).map(|price| position.unrealized_pnl(*price))
            })
            .sum()
    }

    /// Open positions as symbol -> signed quantity
    pub fn open_positions(&self) -> BTreeMap<String, i64> {
        self.positions
            .iter()
            .filter(|(_, position)| !position.is_flat())
            .map(|(symbol, position)| (symbol.clone(), position.quantity()))
            .collect()
    }
}

/// The authoritative record of positions, realized P&L and trade history
///
/// Mutated only through [`Ledger::record_trade`] / [`Ledger::record_fill`].
/// When backed by a [`LedgerStore`], every mutation is written to disk before
/// the call returns; a failed write rolls the in-memory state back.
#[derive(Debug, Default)]
pub struct Ledger {
    trades: Vec<TradeRecord>,
    /// In first-seen order
    accounts: Vec<StrategyAccount>,
    last_updated: Option<DateTime<Utc>>,
    store: Option<LedgerStore>,
}

impl Ledger {
    /// Create an empty ledger that is never persisted
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a ledger backed by `path`, restoring any saved state
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = LedgerStore::new(path);
        let mut ledger = match store.load()? {
            Some(document) => {
                let ledger = Self::from_document(document)
                    .map_err(|e| ArenaError::persistence(store.path(), e))?;
                info!(
                    "Loaded {} trades for {} strategies from {}",
                    ledger.trades.len(),
                    ledger.accounts.len(),
                    store.path().display()
                );
                ledger
            }
            None => Self::default(),
        };
        ledger.store = Some(store);
        Ok(ledger)
    }

    /// Record an execution; see [`Ledger::record_fill`] for broker fills
    pub fn record_trade(
        &mut self,
        strategy: &str,
        symbol: &str,
        side: Side,
        quantity: u64,
        price: Decimal,
    ) -> Result<TradeRecord> {
        self.apply(strategy, symbol, side, quantity, price, false)
    }

    /// Record a broker fill, carrying its simulated flag into the history
    pub fn record_fill(&mut self, strategy: &str, fill: &Fill) -> Result<TradeRecord> {
        self.apply(
            strategy,
            &fill.symbol,
            fill.side,
            fill.quantity,
            fill.price,
            fill.simulated,
        )
    }

    #[instrument(skip(self))]
    fn apply(
        &mut self,
        strategy: &str,
        symbol: &str,
        side: Side,
        quantity: u64,
        price: Decimal,
        simulated: bool,
    ) -> Result<TradeRecord> {
        if quantity == 0 {
            return Err(ArenaError::InvalidTrade(format!(
                "{} {} {}: quantity must be positive",
                strategy, side, symbol
            )));
        }
        if price <= Decimal::ZERO {
            return Err(ArenaError::InvalidTrade(format!(
                "{} {} {}: price {} must be positive",
                strategy, side, symbol, price
            )));
        }

        // Apply to a copy first so a rejected trade leaves nothing behind
        let mut position = self.position(strategy, symbol);
        let realized = position.apply(side, quantity, price)?;

        let (index, created) = match self.account_index(strategy) {
            Some(index) => (index, false),
            None => {
                self.accounts.push(StrategyAccount::new(strategy));
                (self.accounts.len() - 1, true)
            }
        };
        let before = self.accounts[index].clone();
        let previous_update = self.last_updated;

        let account = &mut self.accounts[index];
        account.positions.insert(symbol.to_string(), position);
        if let Some(delta) = realized {
            account.realized_pnl += delta;
        }
        account.trade_count += 1;
        if simulated {
            account.simulated_trades += 1;
        }

        let record = TradeRecord {
            timestamp: Utc::now(),
            strategy: strategy.to_string(),
            symbol: symbol.to_string(),
            side,
            quantity,
            price,
            realized_pnl: realized,
            simulated,
        };
        self.trades.push(record.clone());
        self.last_updated = Some(record.timestamp);

        if let Err(e) = self.persist() {
            self.trades.pop();
            self.last_updated = previous_update;
            if created {
                self.accounts.pop();
            } else {
                self.accounts[index] = before;
            }
            return Err(e);
        }

        Ok(record)
    }

    /// Write the current state to the backing store, if any
    pub fn flush(&self) -> Result<()> {
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        match &self.store {
            Some(store) => store.save(&self.to_document()),
            None => Ok(()),
        }
    }

    fn account_index(&self, strategy: &str) -> Option<usize> {
        self.accounts.iter().position(|a| a.strategy == strategy)
    }

    pub fn account(&self, strategy: &str) -> Option<&StrategyAccount> {
        self.account_index(strategy).map(|i| &self.accounts[i])
    }

    /// Accounts in first-seen order
    pub fn accounts(&self) -> &[StrategyAccount] {
        &self.accounts
    }

    /// Time of the most recent recorded trade, kept across reloads
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Full trade history, oldest first
    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    /// The `limit` most recent trades, newest first
    pub fn recent_trades(&self, limit: usize) -> Vec<&TradeRecord> {
        self.trades.iter().rev().take(limit).collect()
    }

    /// Position of a strategy in an instrument (flat if never traded)
    pub fn position(&self, strategy: &str, symbol: &str) -> Position {
        self.account(strategy)
            .and_then(|a| a.positions.get(symbol).copied())
            .unwrap_or_default()
    }

    /// Signed quantities of every instrument a strategy has traded
    pub fn positions_for(&self, strategy: &str) -> HashMap<String, i64> {
        self.account(strategy)
            .map(|a| {
                a.positions
                    .iter()
                    .map(|(symbol, p)| (symbol.clone(), p.quantity()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Instruments with an open position in any strategy
    pub fn open_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self
            .accounts
            .iter()
            .flat_map(|a| a.open_positions().into_keys())
            .collect();
        symbols.sort();
        symbols.dedup();
        symbols
    }

    pub fn get_realized_pnl(&self, strategy: &str) -> Decimal {
        self.account(strategy)
            .map(|a| a.realized_pnl)
            .unwrap_or_default()
    }

    pub fn get_unrealized_pnl(&self, strategy: &str, prices: &HashMap<String, Decimal>) -> Decimal {
        self.account(strategy)
            .map(|a| a.unrealized_pnl(prices))
            .unwrap_or_default()
    }

    pub fn get_total_pnl(&self, strategy: &str, prices: &HashMap<String, Decimal>) -> Decimal {
        self.get_realized_pnl(strategy) + self.get_unrealized_pnl(strategy, prices)
    }

    /// Strategies ranked by total P&L, best first
    ///
    /// Ties keep first-seen order.
    pub fn leaderboard(&self, prices: &HashMap<String, Decimal>) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .accounts
            .iter()
            .map(|account| {
                let unrealized = account.unrealized_pnl(prices);
                LeaderboardEntry {
                    strategy: account.strategy.clone(),
                    total_pnl: account.realized_pnl + unrealized,
                    realized_pnl: account.realized_pnl,
                    unrealized_pnl: unrealized,
                    trade_count: account.trade_count,
                    simulated_trades: account.simulated_trades,
                    positions: account.open_positions(),
                }
            })
            .collect();

        // sort_by is stable
        entries.sort_by(|a, b| b.total_pnl.cmp(&a.total_pnl));
        entries
    }

    /// Snapshot the state in its persisted layout
    pub fn to_document(&self) -> LedgerDocument {
        let mut document = LedgerDocument {
            trades: self.trades.clone(),
            last_updated: self.last_updated,
            ..Default::default()
        };

        for account in &self.accounts {
            let positions = document
                .positions
                .entry(account.strategy.clone())
                .or_default();
            let entries = document
                .entry_prices
                .entry(account.strategy.clone())
                .or_default();
            for (symbol, position) in &account.positions {
                positions.insert(symbol.clone(), position.quantity());
                entries.insert(symbol.clone(), position.entry_price());
            }
            document
                .realized_pnl
                .insert(account.strategy.clone(), account.realized_pnl);
        }

        document
    }

    /// Rebuild a ledger from its persisted layout
    ///
    /// First-seen order follows the first appearance of each strategy in the
    /// trade history; strategies without trades follow in name order.
    pub fn from_document(document: LedgerDocument) -> Result<Self> {
        let mut order: Vec<String> = Vec::new();
        let names = document
            .trades
            .iter()
            .map(|t| &t.strategy)
            .chain(document.positions.keys())
            .chain(document.realized_pnl.keys());
        for name in names {
            if !order.contains(name) {
                order.push(name.clone());
            }
        }

        let mut accounts = Vec::with_capacity(order.len());
        for strategy in order {
            let mut account = StrategyAccount::new(&strategy);
            account.realized_pnl = document
                .realized_pnl
                .get(&strategy)
                .copied()
                .unwrap_or_default();

            if let Some(positions) = document.positions.get(&strategy) {
                let entries = document.entry_prices.get(&strategy);
                for (symbol, quantity) in positions {
                    let entry = entries.and_then(|e| e.get(symbol)).copied().flatten();
                    let position = Position::from_parts(*quantity, entry).map_err(|e| {
                        ArenaError::InvalidTrade(format!("{} / {}: {}", strategy, symbol, e))
                    })?;
                    account.positions.insert(symbol.clone(), position);
                }
            }

            let trades = document.trades.iter().filter(|t| t.strategy == strategy);
            account.trade_count = trades.clone().count();
            account.simulated_trades = trades.filter(|t| t.simulated).count();
            accounts.push(account);
        }

        Ok(Self {
            trades: document.trades,
            accounts,
            last_updated: document.last_updated,
            store: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn prices(pairs: &[(&str, Decimal)]) -> HashMap<String, Decimal> {
        pairs.iter().map(|(s, p)| (s.to_string(), *p)).collect()
    }

    #[test]
    fn test_record_trade_updates_position_and_history() {
        let mut ledger = Ledger::in_memory();
        let record = ledger
            .record_trade("Buy & Hold", "SPY", Side::Buy, 100, dec!(10))
            .unwrap();

        assert_eq!(record.realized_pnl, None);
        assert_eq!(ledger.trades().len(), 1);
        assert_eq!(ledger.position("Buy & Hold", "SPY").quantity(), 100);
        assert_eq!(ledger.get_realized_pnl("Buy & Hold"), Decimal::ZERO);
    }

    #[test]
    fn test_weighted_entry_then_full_exit() {
        let mut ledger = Ledger::in_memory();
        ledger.record_trade("s", "SPY", Side::Buy, 100, dec!(10)).unwrap();
        ledger.record_trade("s", "SPY", Side::Buy, 50, dec!(20)).unwrap();

        let position = ledger.position("s", "SPY");
        assert_eq!(position.quantity(), 150);
        assert_eq!(position.entry_price().unwrap().round_dp(6), dec!(13.333333));

        let record = ledger.record_trade("s", "SPY", Side::Sell, 150, dec!(15)).unwrap();
        assert_eq!(record.realized_pnl.unwrap().round_dp(8), dec!(250));
        assert_eq!(ledger.get_realized_pnl("s").round_dp(8), dec!(250));
        assert_eq!(ledger.position("s", "SPY").entry_price(), None);
    }

    #[test]
    fn test_flip_records_only_closed_portion() {
        let mut ledger = Ledger::in_memory();
        ledger.record_trade("s", "EURUSD", Side::Buy, 50, dec!(10)).unwrap();
        let record = ledger
            .record_trade("s", "EURUSD", Side::Sell, 80, dec!(12))
            .unwrap();

        assert_eq!(record.realized_pnl, Some(dec!(100)));
        let position = ledger.position("s", "EURUSD");
        assert_eq!(position.quantity(), -30);
        assert_eq!(position.entry_price(), Some(dec!(12)));

        // short 30 @ 12 marked at 11
        let marks = prices(&[("EURUSD", dec!(11))]);
        assert_eq!(ledger.get_unrealized_pnl("s", &marks), dec!(30));
        assert_eq!(ledger.get_total_pnl("s", &marks), dec!(130));
    }

    #[test]
    fn test_zero_quantity_rejected_without_mutation() {
        let mut ledger = Ledger::in_memory();
        let err = ledger.record_trade("s", "SPY", Side::Buy, 0, dec!(10)).unwrap_err();

        assert!(matches!(err, ArenaError::InvalidTrade(_)));
        assert!(ledger.trades().is_empty());
        assert!(ledger.accounts().is_empty());
    }

    #[test]
    fn test_quantity_beyond_position_range_rejected() {
        let mut ledger = Ledger::in_memory();
        ledger.record_trade("s", "SPY", Side::Buy, 10, dec!(100)).unwrap();

        let err = ledger
            .record_trade("s", "SPY", Side::Buy, u64::MAX, dec!(100))
            .unwrap_err();
        assert!(matches!(err, ArenaError::InvalidTrade(_)));

        let err = ledger
            .record_trade("fresh", "SPY", Side::Sell, i64::MAX as u64 + 1, dec!(100))
            .unwrap_err();
        assert!(matches!(err, ArenaError::InvalidTrade(_)));

        assert_eq!(ledger.trades().len(), 1);
        assert_eq!(ledger.position("s", "SPY").quantity(), 10);
        assert_eq!(ledger.account("s").unwrap().trade_count, 1);
        assert!(ledger.account("fresh").is_none());
    }

    #[test]
    fn test_missing_price_contributes_zero() {
        let mut ledger = Ledger::in_memory();
        ledger.record_trade("s", "AAPL", Side::Buy, 10, dec!(100)).unwrap();
        ledger.record_trade("s", "MSFT", Side::Buy, 10, dec!(200)).unwrap();

        let marks = prices(&[("AAPL", dec!(110))]);
        assert_eq!(ledger.get_unrealized_pnl("s", &marks), dec!(100));
        assert_eq!(ledger.get_unrealized_pnl("unknown", &marks), Decimal::ZERO);
    }

    #[test]
    fn test_leaderboard_sorted_with_stable_ties() {
        let mut ledger = Ledger::in_memory();
        ledger.record_trade("alpha", "SPY", Side::Buy, 10, dec!(100)).unwrap();
        ledger.record_trade("beta", "SPY", Side::Buy, 20, dec!(100)).unwrap();
        ledger.record_trade("gamma", "SPY", Side::Buy, 10, dec!(100)).unwrap();
        ledger.record_trade("delta", "QQQ", Side::Buy, 1, dec!(50)).unwrap();

        let board = ledger.leaderboard(&prices(&[("SPY", dec!(101)), ("QQQ", dec!(50))]));
        let order: Vec<&str> = board.iter().map(|e| e.strategy.as_str()).collect();

        // beta +20, alpha/gamma tied at +10 in first-seen order, delta 0
        assert_eq!(order, vec!["beta", "alpha", "gamma", "delta"]);
        assert_eq!(board[0].total_pnl, dec!(20));
        assert_eq!(board[0].positions.get("SPY"), Some(&20));
        assert_eq!(board[3].trade_count, 1);
    }

    #[test]
    fn test_simulated_fills_are_counted() {
        let mut ledger = Ledger::in_memory();
        let fill = Fill {
            symbol: "SPY".to_string(),
            side: Side::Buy,
            quantity: 3,
            price: dec!(500),
            order_id: None,
            simulated: true,
            filled_at: Utc::now(),
        };
        let record = ledger.record_fill("dry", &fill).unwrap();

        assert!(record.simulated);
        let board = ledger.leaderboard(&HashMap::new());
        assert!(board[0].has_simulated_fills());
    }

    #[test]
    fn test_persisted_ledger_reloads_equivalently() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arena_data.json");

        let mut ledger = Ledger::open(&path).unwrap();
        ledger.record_trade("zeta", "SPY", Side::Buy, 100, dec!(10)).unwrap();
        ledger.record_trade("alpha", "SPY", Side::Sell, 5, dec!(11)).unwrap();
        ledger.record_trade("zeta", "SPY", Side::Buy, 50, dec!(20)).unwrap();
        ledger.record_trade("zeta", "SPY", Side::Sell, 150, dec!(15)).unwrap();
        ledger.record_trade("alpha", "AAPL", Side::Buy, 7, dec!(180.5)).unwrap();

        let reloaded = Ledger::open(&path).unwrap();

        assert_eq!(reloaded.to_document(), ledger.to_document());
        assert_eq!(reloaded.accounts(), ledger.accounts());
        let order: Vec<&str> = reloaded.accounts().iter().map(|a| a.strategy.as_str()).collect();
        assert_eq!(order, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_last_updated_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arena_data.json");

        let mut ledger = Ledger::open(&path).unwrap();
        assert_eq!(ledger.last_updated(), None);
        let record = ledger.record_trade("s", "SPY", Side::Buy, 10, dec!(100)).unwrap();
        assert_eq!(ledger.last_updated(), Some(record.timestamp));

        let reloaded = Ledger::open(&path).unwrap();
        assert!(reloaded.last_updated().is_some());
        assert_eq!(reloaded.last_updated(), ledger.last_updated());
        assert_eq!(reloaded.to_document().last_updated, ledger.last_updated());
    }

    #[test]
    fn test_failed_persist_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arena_data.json");

        let mut ledger = Ledger::open(&path).unwrap();
        ledger.record_trade("s", "SPY", Side::Buy, 10, dec!(100)).unwrap();

        // Make the target unwritable by replacing the directory contents
        drop(dir);

        let err = ledger.record_trade("s", "SPY", Side::Sell, 10, dec!(110)).unwrap_err();
        assert!(matches!(err, ArenaError::Persistence { .. }));
        assert_eq!(ledger.trades().len(), 1);
        assert_eq!(ledger.position("s", "SPY").quantity(), 10);
        assert_eq!(ledger.get_realized_pnl("s"), Decimal::ZERO);
        assert_eq!(ledger.last_updated(), Some(ledger.trades()[0].timestamp));

        let err = ledger.record_trade("new", "SPY", Side::Buy, 1, dec!(100)).unwrap_err();
        assert!(matches!(err, ArenaError::Persistence { .. }));
        assert!(ledger.account("new").is_none());
    }
}
