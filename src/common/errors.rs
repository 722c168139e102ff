//! Error types for the application

use thiserror::Error;

/// Result type alias using our ArenaError
pub type Result<T> = std::result::Result<T, ArenaError>;

/// Main error type for arena operations
#[derive(Error, Debug)]
pub enum ArenaError {
    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid API response
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Market data could not be fetched or was unusable
    #[error("Market data unavailable for {symbol}: {reason}")]
    MarketData { symbol: String, reason: String },

    /// Broker rejected or failed an operation
    #[error("Broker error: {0}")]
    Broker(String),

    /// A strategy's decision could not be parsed
    #[error("Decision parse error: {0}")]
    DecisionParse(String),

    /// A trade violated ledger preconditions
    #[error("Invalid trade: {0}")]
    InvalidTrade(String),

    /// Ledger state could not be written or read
    #[error("Ledger persistence error at {path}: {reason}")]
    Persistence { path: String, reason: String },

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ArenaError {
    /// Shorthand for a market data failure on a symbol
    pub fn market_data(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        ArenaError::MarketData {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a persistence failure at a path
    pub fn persistence(path: impl AsRef<std::path::Path>, reason: impl ToString) -> Self {
        ArenaError::Persistence {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<config::ConfigError> for ArenaError {
    fn from(err: config::ConfigError) -> Self {
        ArenaError::Configuration(err.to_string())
    }
}

impl From<url::ParseError> for ArenaError {
    fn from(err: url::ParseError) -> Self {
        ArenaError::Configuration(format!("invalid URL: {}", err))
    }
}
