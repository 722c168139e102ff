//! Configuration types

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cycle scheduling, sizing and ledger settings
    #[serde(default)]
    pub arena: ArenaSettings,
    /// Brokerage connection
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Language model endpoint
    #[serde(default)]
    pub llm: LlmConfig,
    /// Market data and indicator settings
    #[serde(default)]
    pub market_data: MarketDataConfig,
    /// Competing strategies, in leaderboard tie-break order
    #[serde(default = "default_strategies")]
    pub strategies: Vec<StrategyConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            arena: ArenaSettings::default(),
            broker: BrokerConfig::default(),
            llm: LlmConfig::default(),
            market_data: MarketDataConfig::default(),
            strategies: default_strategies(),
        }
    }
}

/// General arena settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaSettings {
    /// Minutes between decision cycles
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
    /// Default notional per BUY, in account currency
    #[serde(default = "default_position_size")]
    pub position_size: Decimal,
    /// Instrument traded by the baseline strategies
    #[serde(default = "default_benchmark_symbol")]
    pub benchmark_symbol: String,
    /// Path of the persisted ledger document
    #[serde(default = "default_ledger_path")]
    pub ledger_path: String,
    /// Upper bound on waiting for one order to fill
    #[serde(default = "default_order_timeout")]
    pub order_timeout_seconds: u64,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Number of trades shown by the report
    #[serde(default = "default_recent_trades_shown")]
    pub recent_trades_shown: usize,
}

impl Default for ArenaSettings {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            position_size: default_position_size(),
            benchmark_symbol: default_benchmark_symbol(),
            ledger_path: default_ledger_path(),
            order_timeout_seconds: default_order_timeout(),
            log_level: default_log_level(),
            recent_trades_shown: default_recent_trades_shown(),
        }
    }
}

fn default_interval_minutes() -> u64 {
    15
}

fn default_position_size() -> Decimal {
    dec!(10000)
}

fn default_benchmark_symbol() -> String {
    "SPY".to_string()
}

fn default_ledger_path() -> String {
    "arena_data.json".to_string()
}

fn default_order_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_recent_trades_shown() -> usize {
    20
}

/// Brokerage (Alpaca-compatible REST) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Base URL of the trading API
    #[serde(default = "default_broker_url")]
    pub base_url: String,
    /// API key id
    #[serde(default)]
    pub api_key: Option<String>,
    /// API secret
    #[serde(default)]
    pub api_secret: Option<String>,
    /// Simulate fills when the broker is unreachable
    #[serde(default = "default_true")]
    pub dry_run_when_disconnected: bool,
    /// Delay between order status polls in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            base_url: default_broker_url(),
            api_key: None,
            api_secret: None,
            dry_run_when_disconnected: true,
            poll_interval_ms: default_poll_interval(),
        }
    }
}

fn default_broker_url() -> String {
    "https://paper-api.alpaca.markets".to_string()
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    500
}

/// OpenAI-compatible completion endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API base URL (the `/chat/completions` path is appended)
    #[serde(default = "default_llm_url")]
    pub base_url: String,
    /// Model name
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Bearer token, if the endpoint needs one
    #[serde(default)]
    pub api_key: Option<String>,
    /// Maximum tokens in response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_url(),
            model: default_llm_model(),
            api_key: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_seconds: default_llm_timeout(),
        }
    }
}

fn default_llm_url() -> String {
    "http://localhost:8000/v1".to_string()
}

fn default_llm_model() -> String {
    "meta-llama/Llama-3.1-70B-Instruct".to_string()
}

fn default_max_tokens() -> u32 {
    500
}

fn default_temperature() -> f32 {
    0.3
}

fn default_llm_timeout() -> u64 {
    60
}

/// Market data source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDataConfig {
    /// Chart endpoint; the symbol is appended as a path segment
    #[serde(default = "default_chart_url")]
    pub chart_url: String,
    /// History window requested from the chart endpoint
    #[serde(default = "default_range")]
    pub range: String,
    /// Bar interval requested from the chart endpoint
    #[serde(default = "default_bar_interval")]
    pub interval: String,
    /// NewsAPI endpoint
    #[serde(default = "default_news_url")]
    pub news_url: String,
    /// NewsAPI key; headlines are skipped without one
    #[serde(default)]
    pub news_api_key: Option<String>,
    /// Maximum headlines attached to a snapshot
    #[serde(default = "default_headline_limit")]
    pub headline_limit: usize,
    #[serde(default = "default_sma_short")]
    pub sma_short: usize,
    #[serde(default = "default_sma_long")]
    pub sma_long: usize,
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    /// Request timeout in seconds
    #[serde(default = "default_market_timeout")]
    pub timeout_seconds: u64,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            chart_url: default_chart_url(),
            range: default_range(),
            interval: default_bar_interval(),
            news_url: default_news_url(),
            news_api_key: None,
            headline_limit: default_headline_limit(),
            sma_short: default_sma_short(),
            sma_long: default_sma_long(),
            rsi_period: default_rsi_period(),
            timeout_seconds: default_market_timeout(),
        }
    }
}

fn default_chart_url() -> String {
    "https://query1.finance.yahoo.com/v8/finance/chart".to_string()
}

fn default_range() -> String {
    "5d".to_string()
}

fn default_bar_interval() -> String {
    "15m".to_string()
}

fn default_news_url() -> String {
    "https://newsapi.org/v2/everything".to_string()
}

fn default_headline_limit() -> usize {
    5
}

fn default_sma_short() -> usize {
    10
}

fn default_sma_long() -> usize {
    50
}

fn default_rsi_period() -> usize {
    14
}

fn default_market_timeout() -> u64 {
    10
}

/// Reference statistic used by the mean-reversion strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReversionSignal {
    /// Fractional deviation of price from its simple moving average
    SmaDeviation { lookback: usize, threshold: Decimal },
    /// Relative strength index bands
    Rsi { oversold: Decimal, overbought: Decimal },
}

/// SMA(20) with a 0.2% band, as the arena has always run it
impl Default for ReversionSignal {
    fn default() -> Self {
        ReversionSignal::SmaDeviation {
            lookback: 20,
            threshold: dec!(0.002),
        }
    }
}

/// One competing strategy
///
/// The variant is fixed here, at construction time; nothing downstream
/// inspects the strategy name to decide behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    BuyAndHold {
        name: String,
        #[serde(default)]
        instruments: Vec<String>,
        #[serde(default)]
        notional: Option<Decimal>,
    },
    MeanReversion {
        name: String,
        #[serde(default)]
        instruments: Vec<String>,
        #[serde(default)]
        notional: Option<Decimal>,
        #[serde(default)]
        signal: ReversionSignal,
        #[serde(default = "default_confidence_scale")]
        confidence_scale: f64,
    },
    MaCrossover {
        name: String,
        #[serde(default)]
        instruments: Vec<String>,
        #[serde(default)]
        notional: Option<Decimal>,
    },
    Llm {
        name: String,
        #[serde(default = "default_llm_universe")]
        instruments: Vec<String>,
        #[serde(default)]
        notional: Option<Decimal>,
    },
}

impl StrategyConfig {
    pub fn name(&self) -> &str {
        match self {
            StrategyConfig::BuyAndHold { name, .. }
            | StrategyConfig::MeanReversion { name, .. }
            | StrategyConfig::MaCrossover { name, .. }
            | StrategyConfig::Llm { name, .. } => name,
        }
    }
}

fn default_confidence_scale() -> f64 {
    0.5
}

fn default_llm_universe() -> Vec<String> {
    ["AAPL", "MSFT", "NVDA", "AMZN", "GOOGL"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_strategies() -> Vec<StrategyConfig> {
    vec![
        StrategyConfig::Llm {
            name: "Llama-70B".to_string(),
            instruments: default_llm_universe(),
            notional: None,
        },
        StrategyConfig::BuyAndHold {
            name: "Buy & Hold".to_string(),
            instruments: Vec::new(),
            notional: None,
        },
        StrategyConfig::MeanReversion {
            name: "Mean Reversion".to_string(),
            instruments: Vec::new(),
            notional: None,
            signal: ReversionSignal::default(),
            confidence_scale: default_confidence_scale(),
        },
        StrategyConfig::MaCrossover {
            name: "Trend Following".to_string(),
            instruments: Vec::new(),
            notional: None,
        },
    ]
}
