//! One decision cycle: fetch, decide, execute, record, rank

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::common::errors::Result;
use crate::common::traits::{BoxedBroker, MarketDataProvider};
use crate::common::types::{Fill, MarketSnapshot, OrderRequest};
use crate::ledger::{LeaderboardEntry, SharedLedger, TradeRecord};
use crate::strategy::{Action, Decision, Strategy, StrategyContext};

/// A fill the broker executed but the ledger has not durably recorded
#[derive(Debug, Clone, PartialEq)]
pub struct PendingFill {
    pub strategy: String,
    pub fill: Fill,
    pub last_error: String,
}

/// What happened to one decision after it left the strategy
#[derive(Debug, Clone, PartialEq)]
pub enum Execution {
    /// HOLD, or a trade with nothing to trade
    NoOrder,
    /// Broker rejected the order, it did not fill in time, or it errored
    NotFilled,
    /// Fill recorded in the ledger
    Recorded(TradeRecord),
    /// Fill executed but could not be persisted; kept for retry
    Unrecorded { fill: Fill, reason: String },
}

/// Outcome for one (strategy, instrument) pair in a cycle
#[derive(Debug, Clone, PartialEq)]
pub struct PairOutcome {
    pub strategy: String,
    pub symbol: String,
    pub decision: Decision,
    pub execution: Execution,
}

/// Summary of one completed cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Instruments skipped this cycle with the reason
    pub skipped: Vec<(String, String)>,
    pub outcomes: Vec<PairOutcome>,
    /// Prices used for the leaderboard
    pub prices: HashMap<String, Decimal>,
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Executed fills still waiting to be recorded
    pub pending_fills: usize,
}

impl CycleReport {
    pub fn trades_recorded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.execution, Execution::Recorded(_)))
            .count()
    }

    /// Decision count by action, for log summaries
    pub fn tally(&self) -> HashMap<Action, usize> {
        let mut tally = HashMap::new();
        for outcome in &self.outcomes {
            *tally.entry(outcome.decision.action).or_insert(0) += 1;
        }
        tally
    }
}

/// Drives strategies against market data, the broker and the ledger
///
/// Pairs are processed one at a time so ledger mutations happen in a fixed
/// order: strategies in configuration order, instruments in each strategy's
/// configured order.
pub struct Arena {
    strategies: Vec<Strategy>,
    market_data: Arc<dyn MarketDataProvider>,
    broker: BoxedBroker,
    ledger: SharedLedger,
    order_timeout: Duration,
    pending: Vec<PendingFill>,
    cycles: u64,
}

impl Arena {
    pub fn new(
        strategies: Vec<Strategy>,
        market_data: Arc<dyn MarketDataProvider>,
        broker: BoxedBroker,
        ledger: SharedLedger,
        order_timeout: Duration,
    ) -> Self {
        Self {
            strategies,
            market_data,
            broker,
            ledger,
            order_timeout,
            pending: Vec::new(),
            cycles: 0,
        }
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    pub fn pending_fills(&self) -> &[PendingFill] {
        &self.pending
    }

    pub fn broker_name(&self) -> &'static str {
        self.broker.broker_name()
    }

    /// Connect the broker; on failure the arena keeps running degraded
    pub async fn connect(&mut self) -> bool {
        let connected = self.broker.connect().await;
        if connected {
            info!(broker = self.broker.broker_name(), "Broker connected");
        } else {
            warn!(
                broker = self.broker.broker_name(),
                "Broker unavailable, continuing in degraded mode (fills may be simulated)"
            );
        }
        connected
    }

    /// Union of every strategy's instruments, in first-appearance order
    pub fn universe(&self) -> Vec<String> {
        let mut universe: Vec<String> = Vec::new();
        for symbol in self.strategies.iter().flat_map(|s| s.instruments()) {
            if !universe.contains(symbol) {
                universe.push(symbol.clone());
            }
        }
        universe
    }

    /// Run one full cycle
    ///
    /// Never fails as a whole: per-instrument data errors skip the
    /// instrument, per-strategy errors become HOLD, and unpersisted fills are
    /// carried to the next cycle.
    #[instrument(skip(self), fields(cycle = self.cycles + 1))]
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.cycles += 1;
        let started_at = Utc::now();
        info!("Starting decision cycle");

        self.retry_pending().await;

        let (snapshots, skipped) = self.fetch_snapshots().await;
        let mut outcomes = Vec::new();

        for index in 0..self.strategies.len() {
            let instruments = self.strategies[index].instruments().to_vec();
            for symbol in instruments {
                let Some(snapshot) = snapshots.get(&symbol) else {
                    continue;
                };
                outcomes.push(self.run_pair(index, snapshot).await);
            }
        }

        let prices = self.leaderboard_prices(&snapshots).await;
        let leaderboard = self.ledger.read().await.leaderboard(&prices);

        let report = CycleReport {
            cycle: self.cycles,
            started_at,
            finished_at: Utc::now(),
            skipped,
            outcomes,
            prices,
            leaderboard,
            pending_fills: self.pending.len(),
        };
        info!(
            trades = report.trades_recorded(),
            skipped = report.skipped.len(),
            pending = report.pending_fills,
            "Cycle complete"
        );
        report
    }

    async fn fetch_snapshots(&self) -> (HashMap<String, MarketSnapshot>, Vec<(String, String)>) {
        let mut snapshots = HashMap::new();
        let mut skipped = Vec::new();

        for symbol in self.universe() {
            match self.market_data.fetch(&symbol).await {
                Ok(snapshot) if snapshot.current_price > Decimal::ZERO => {
                    debug!(symbol = %symbol, price = %snapshot.current_price, "Snapshot fetched");
                    snapshots.insert(symbol, snapshot);
                }
                Ok(snapshot) => {
                    let reason = format!("unusable price {}", snapshot.current_price);
                    warn!(symbol = %symbol, reason = %reason, "Skipping instrument this cycle");
                    skipped.push((symbol, reason));
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Skipping instrument this cycle");
                    skipped.push((symbol, e.to_string()));
                }
            }
        }

        (snapshots, skipped)
    }

    async fn run_pair(&mut self, index: usize, snapshot: &MarketSnapshot) -> PairOutcome {
        let name = self.strategies[index].name().to_string();
        let symbol = snapshot.symbol.clone();
        let ctx = self.context_for(&name).await;

        let decision = match self.strategies[index].decide(snapshot, &ctx).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(strategy = %name, symbol = %symbol, error = %e, "Strategy failed, treating as HOLD");
                Decision::unavailable(format!("Strategy error: {}", e))
            }
        };
        info!(
            strategy = %name,
            symbol = %symbol,
            action = %decision.action,
            quantity = ?decision.quantity,
            confidence = decision.confidence,
            rationale = %decision.rationale,
            "Decision"
        );

        let execution = match decision.order() {
            Some((side, quantity)) => {
                let order = OrderRequest::new(symbol.clone(), side, quantity, &name)
                    .with_reference_price(snapshot.current_price);
                self.execute_and_record(&name, &order).await
            }
            None => Execution::NoOrder,
        };

        PairOutcome {
            strategy: name,
            symbol,
            decision,
            execution,
        }
    }

    async fn execute_and_record(&mut self, strategy: &str, order: &OrderRequest) -> Execution {
        let fill = match tokio::time::timeout(self.order_timeout, self.broker.execute(order)).await {
            Ok(Some(fill)) => fill,
            Ok(None) => {
                info!(strategy, symbol = %order.symbol, side = %order.side, "Order not filled, ledger unchanged");
                return Execution::NotFilled;
            }
            Err(_) => {
                warn!(strategy, symbol = %order.symbol, timeout = ?self.order_timeout, "Order wait exceeded timeout, ledger unchanged");
                return Execution::NotFilled;
            }
        };

        let recorded = self.ledger.write().await.record_fill(strategy, &fill);
        match recorded {
            Ok(record) => {
                info!(
                    strategy,
                    symbol = %record.symbol,
                    side = %record.side,
                    quantity = record.quantity,
                    price = %record.price,
                    realized = ?record.realized_pnl,
                    simulated = record.simulated,
                    "{}Trade recorded",
                    if record.simulated { "[SIMULATED] " } else { "" }
                );
                Execution::Recorded(record)
            }
            Err(e) => {
                error!(strategy, symbol = %fill.symbol, error = %e, "Executed fill NOT recorded, will retry");
                let reason = e.to_string();
                self.pending.push(PendingFill {
                    strategy: strategy.to_string(),
                    fill: fill.clone(),
                    last_error: reason.clone(),
                });
                Execution::Unrecorded { fill, reason }
            }
        }
    }

    /// Ledger positions plus any executed-but-unrecorded fills
    async fn context_for(&self, strategy: &str) -> StrategyContext {
        let mut positions = self.ledger.read().await.positions_for(strategy);
        for pending in self.pending.iter().filter(|p| p.strategy == strategy) {
            let signed = pending.fill.side.signum() * pending.fill.quantity as i64;
            *positions.entry(pending.fill.symbol.clone()).or_insert(0) += signed;
        }
        StrategyContext { positions }
    }

    /// Try again to record fills that failed to persist
    ///
    /// Returns how many are still pending.
    pub async fn retry_pending(&mut self) -> usize {
        if self.pending.is_empty() {
            return 0;
        }

        let mut ledger = self.ledger.write().await;
        let mut still_pending = Vec::new();
        for mut pending in self.pending.drain(..) {
            match ledger.record_fill(&pending.strategy, &pending.fill) {
                Ok(record) => info!(
                    strategy = %record.strategy,
                    symbol = %record.symbol,
                    "Recorded previously pending fill"
                ),
                Err(e) => {
                    warn!(strategy = %pending.strategy, error = %e, "Pending fill still not recorded");
                    pending.last_error = e.to_string();
                    still_pending.push(pending);
                }
            }
        }
        self.pending = still_pending;
        self.pending.len()
    }

    async fn leaderboard_prices(&self, snapshots: &HashMap<String, MarketSnapshot>) -> HashMap<String, Decimal> {
        let mut symbols = self.universe();
        for symbol in self.ledger.read().await.open_symbols() {
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
        self.fetch_prices(&symbols, snapshots).await
    }

    /// Current prices for `symbols`, falling back to this cycle's snapshots
    async fn fetch_prices(
        &self,
        symbols: &[String],
        snapshots: &HashMap<String, MarketSnapshot>,
    ) -> HashMap<String, Decimal> {
        let mut prices = HashMap::new();
        for symbol in symbols {
            match self.market_data.latest_price(symbol).await {
                Ok(price) if price > Decimal::ZERO => {
                    prices.insert(symbol.clone(), price);
                }
                outcome => {
                    if let Some(snapshot) = snapshots.get(symbol) {
                        prices.insert(symbol.clone(), snapshot.current_price);
                    } else if let Err(e) = outcome {
                        warn!(symbol = %symbol, error = %e, "No price for leaderboard, unrealized P&L counts as zero");
                    }
                }
            }
        }
        prices
    }

    /// Fresh prices for every instrument the ledger or strategies care about
    pub async fn current_prices(&self) -> HashMap<String, Decimal> {
        self.leaderboard_prices(&HashMap::new()).await
    }

    /// Retry pending fills, flush the ledger and disconnect the broker
    pub async fn shutdown(&mut self) -> Result<Vec<LeaderboardEntry>> {
        info!("Shutting down arena");
        let remaining = self.retry_pending().await;
        if remaining > 0 {
            error!(remaining, "Executed fills could not be recorded before shutdown");
            for pending in &self.pending {
                error!(
                    strategy = %pending.strategy,
                    symbol = %pending.fill.symbol,
                    side = %pending.fill.side,
                    quantity = pending.fill.quantity,
                    price = %pending.fill.price,
                    error = %pending.last_error,
                    "Unrecorded fill"
                );
            }
        }

        let flushed = self.ledger.read().await.flush();
        self.broker.disconnect().await;

        let prices = self.current_prices().await;
        let leaderboard = self.ledger.read().await.leaderboard(&prices);
        flushed?;
        Ok(leaderboard)
    }
}
