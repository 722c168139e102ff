//! Plain-text views of ledger state
//!
//! Read-only projections; nothing here writes back into the ledger.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt::Write as _;

use crate::ledger::{LeaderboardEntry, Ledger};

/// Signed money, two decimals: `+$12.50`, `-$3.00`
pub fn money(amount: Decimal) -> String {
    let sign = if amount.is_sign_negative() && !amount.round_dp(2).is_zero() {
        "-"
    } else {
        "+"
    };
    format!("{}${:.2}", sign, amount.abs())
}

/// Leaderboard table, best first
pub fn render_leaderboard(entries: &[LeaderboardEntry]) -> String {
    let mut out = String::from("LEADERBOARD\n");
    if entries.is_empty() {
        out.push_str("  (no trades yet)\n");
        return out;
    }

    let _ = writeln!(
        out,
        "{:<5} {:<20} {:>14} {:>14} {:>14} {:>7} {:>5}",
        "Rank", "Strategy", "Total", "Realized", "Unrealized", "Trades", "Sim"
    );
    for (rank, entry) in entries.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:<5} {:<20} {:>14} {:>14} {:>14} {:>7} {:>5}",
            format!("{}.", rank + 1),
            truncate(&entry.strategy, 20),
            money(entry.total_pnl),
            money(entry.realized_pnl),
            money(entry.unrealized_pnl),
            entry.trade_count,
            entry.simulated_trades,
        );
    }
    if entries.iter().any(LeaderboardEntry::has_simulated_fills) {
        out.push_str("  Sim: trades filled by dry-run simulation, not a live broker\n");
    }
    out
}

/// Open positions per strategy with entry price and mark-to-market P&L
pub fn render_positions(ledger: &Ledger, prices: &HashMap<String, Decimal>) -> String {
    let mut out = String::from("OPEN POSITIONS\n");
    let mut any = false;

    for account in ledger.accounts() {
        let open: Vec<_> = account
            .positions
            .iter()
            .filter(|(_, p)| !p.is_flat())
            .collect();
        if open.is_empty() {
            continue;
        }
        any = true;

        let _ = writeln!(out, "  {}", account.strategy);
        for (symbol, position) in open {
            let direction = if position.is_long() { "LONG" } else { "SHORT" };
            let entry = position
                .entry_price()
                .map(|p| format!("{:.4}", p))
                .unwrap_or_else(|| "?".to_string());
            let pnl = match prices.get(symbol) {
                Some(price) => money(position.unrealized_pnl(*price)),
                None => "no price".to_string(),
            };
            let _ = writeln!(
                out,
                "    {:<8} {:<5} {:>8} @ {:>12}  P&L {}",
                symbol,
                direction,
                position.quantity().unsigned_abs(),
                entry,
                pnl
            );
        }
    }

    if !any {
        out.push_str("  (no open positions)\n");
    }
    out
}

/// Most recent trades, newest first
pub fn render_recent_trades(ledger: &Ledger, limit: usize) -> String {
    let mut out = String::from("RECENT TRADES\n");
    let trades = ledger.recent_trades(limit);
    if trades.is_empty() {
        out.push_str("  (no trades yet)\n");
        return out;
    }

    for trade in trades {
        let pnl = trade
            .realized_pnl
            .map(money)
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "  {} {:<20} {:<4} {:>8} {:<8} @ {:>12.4}  P&L {}{}",
            trade.timestamp.format("%Y-%m-%d %H:%M:%S"),
            truncate(&trade.strategy, 20),
            trade.side.to_string(),
            trade.quantity,
            trade.symbol,
            trade.price,
            pnl,
            if trade.simulated { "  [SIMULATED]" } else { "" }
        );
    }
    out
}

/// Full report: leaderboard, positions, recent trades
pub fn render_report(ledger: &Ledger, prices: &HashMap<String, Decimal>, recent: usize) -> String {
    format!(
        "{}\n{}\n{}",
        render_leaderboard(&ledger.leaderboard(prices)),
        render_positions(ledger, prices),
        render_recent_trades(ledger, recent)
    )
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let cut: String = text.chars().take(width.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Side;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn sample_ledger() -> Ledger {
        let mut ledger = Ledger::in_memory();
        ledger.record_trade("Buy & Hold", "SPY", Side::Buy, 20, dec!(500)).unwrap();
        ledger.record_trade("Mean Reversion", "SPY", Side::Buy, 10, dec!(490)).unwrap();
        ledger.record_trade("Mean Reversion", "SPY", Side::Sell, 10, dec!(510)).unwrap();
        ledger
    }

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(dec!(12.5)), "+$12.50");
        assert_eq!(money(dec!(-3)), "-$3.00");
        assert_eq!(money(Decimal::ZERO), "+$0.00");
        assert_eq!(money(dec!(-0.001)), "+$0.00");
    }

    #[test]
    fn test_leaderboard_rows_in_rank_order() {
        let ledger = sample_ledger();
        let prices: HashMap<String, Decimal> = [("SPY".to_string(), dec!(505))].into_iter().collect();
        let text = render_leaderboard(&ledger.leaderboard(&prices));

        let mean = text.find("Mean Reversion").unwrap();
        let hold = text.find("Buy & Hold").unwrap();
        assert!(mean < hold);
        assert!(text.contains("+$200.00"));
        assert!(text.contains("+$100.00"));
        assert!(!text.contains("dry-run"));
    }

    #[test]
    fn test_positions_and_trades() {
        let ledger = sample_ledger();
        let prices: HashMap<String, Decimal> = HashMap::new();

        let positions = render_positions(&ledger, &prices);
        assert!(positions.contains("Buy & Hold"));
        assert!(positions.contains("LONG"));
        assert!(positions.contains("no price"));
        assert!(!positions.contains("Mean Reversion"));

        let trades = render_recent_trades(&ledger, 2);
        let lines: Vec<&str> = trades.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("SELL"));
        assert!(lines[1].contains("+$200.00"));
    }

    #[test]
    fn test_empty_views() {
        let ledger = Ledger::in_memory();
        let report = render_report(&ledger, &HashMap::new(), 20);
        assert!(report.contains("(no trades yet)"));
        assert!(report.contains("(no open positions)"));
    }
}
