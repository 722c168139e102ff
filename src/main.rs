//! StrategyArena - Main Entry Point
//!
//! Runs the trading strategy competition on a fixed schedule, or prints the
//! current standings from the persisted ledger.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use strategy_arena::arena::report::{render_leaderboard, render_report};
use strategy_arena::arena::{Arena, CycleReport, Scheduler};
use strategy_arena::broker::{AlpacaBroker, SimulatedBroker};
use strategy_arena::common::channels::create_shutdown_channel;
use strategy_arena::common::traits::{BoxedBroker, CompletionClient, MarketDataProvider};
use strategy_arena::config::{load_config, AppConfig};
use strategy_arena::ledger::{self, Ledger};
use strategy_arena::llm::OpenAiCompatClient;
use strategy_arena::market::YahooMarketData;
use strategy_arena::strategy::Strategy;

/// Slack on top of the broker's own fill wait before the arena gives up
const ORDER_TIMEOUT_GRACE: Duration = Duration::from_secs(5);

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "arena.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error); defaults to arena.log_level
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Simulate every fill instead of using the broker
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Run cycles on the configured interval until Ctrl-C (default)
    Run,
    /// Run a single cycle and exit
    Once,
    /// Print leaderboard, open positions and recent trades
    Report,
}

fn init_logging(level: &str) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn build_arena(config: &AppConfig, dry_run: bool) -> Result<Arena> {
    let market_data: Arc<dyn MarketDataProvider> =
        Arc::new(YahooMarketData::new(config.market_data.clone())?);
    let llm: Arc<dyn CompletionClient> = Arc::new(OpenAiCompatClient::new(config.llm.clone())?);

    let order_timeout = Duration::from_secs(config.arena.order_timeout_seconds);
    let broker: BoxedBroker = if dry_run {
        info!("Dry run: all fills are simulated");
        Box::new(SimulatedBroker::default())
    } else {
        Box::new(AlpacaBroker::new(config.broker.clone(), order_timeout)?)
    };

    let ledger = Ledger::open(&config.arena.ledger_path)
        .with_context(|| format!("opening ledger {}", config.arena.ledger_path))?;

    let strategies: Vec<Strategy> = config
        .strategies
        .iter()
        .map(|s| Strategy::from_config(s, &config.arena, llm.clone()))
        .collect();
    for strategy in &strategies {
        info!(strategy = strategy.name(), instruments = ?strategy.instruments(), "Strategy loaded");
    }

    Ok(Arena::new(
        strategies,
        market_data,
        broker,
        ledger::shared(ledger),
        order_timeout + ORDER_TIMEOUT_GRACE,
    ))
}

fn print_cycle(report: &CycleReport) {
    let tally = report.tally();
    info!(
        cycle = report.cycle,
        decisions = report.outcomes.len(),
        trades = report.trades_recorded(),
        actions = ?tally,
        "Cycle summary"
    );
    for (symbol, reason) in &report.skipped {
        info!(symbol = %symbol, reason = %reason, "Instrument skipped");
    }
    if report.pending_fills > 0 {
        error!(pending = report.pending_fills, "Executed fills awaiting ledger write");
    }
    println!("\n[cycle {}] {}", report.cycle, report.finished_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("{}", render_leaderboard(&report.leaderboard));
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    let command = args.command.unwrap_or(Command::Run);

    let config = load_config(Some(args.config.as_str()))
        .with_context(|| format!("loading configuration from {}", args.config))?;

    // Initialize logging
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.arena.log_level.clone());
    init_logging(&level)?;

    info!("Starting StrategyArena");
    info!("Configuration file: {}", args.config);

    let mut arena = build_arena(&config, args.dry_run)?;

    match command {
        Command::Report => {
            let prices = arena.current_prices().await;
            let ledger = arena.ledger().read().await;
            println!("{}", render_report(&ledger, &prices, config.arena.recent_trades_shown));
            return Ok(());
        }
        Command::Once => {
            arena.connect().await;
            let report = arena.run_cycle().await;
            print_cycle(&report);
        }
        Command::Run => {
            arena.connect().await;

            let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => info!("Received shutdown signal, finishing current cycle..."),
                    Err(e) => error!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
                }
                let _ = shutdown_tx.send(true);
            });

            let scheduler = Scheduler::from_minutes(config.arena.interval_minutes)?;
            info!(
                interval_minutes = config.arena.interval_minutes,
                broker = arena.broker_name(),
                "Arena running, press Ctrl-C to stop"
            );
            scheduler.run(&mut arena, shutdown_rx, print_cycle).await;
        }
    }

    let standings = arena.shutdown().await?;
    println!("\nFINAL STANDINGS");
    println!("{}", render_leaderboard(&standings));
    info!("Shutdown complete");

    Ok(())
}
