//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::{ArenaError, Result};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with ARENA_, `__` between sections)
/// 2. Configuration file (TOML format)
/// 3. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    // Pick up a .env file before reading the environment
    dotenvy::dotenv().ok();

    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("ARENA")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| ArenaError::Configuration(e.to_string()))?;

    let app: AppConfig = config
        .try_deserialize()
        .map_err(|e| ArenaError::Configuration(e.to_string()))?;

    validate(&app)?;
    Ok(app)
}

/// Reject configurations the arena cannot run with
pub fn validate(config: &AppConfig) -> Result<()> {
    if config.arena.interval_minutes == 0 {
        return Err(ArenaError::Configuration(
            "arena.interval_minutes must be positive".to_string(),
        ));
    }
    if config.arena.position_size <= rust_decimal::Decimal::ZERO {
        return Err(ArenaError::Configuration(
            "arena.position_size must be positive".to_string(),
        ));
    }

    let mut seen = std::collections::HashSet::new();
    for strategy in &config.strategies {
        if !seen.insert(strategy.name()) {
            return Err(ArenaError::Configuration(format!(
                "duplicate strategy name: {}",
                strategy.name()
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::StrategyConfig;
    use std::io::Write;

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[arena]
interval_minutes = 5
benchmark_symbol = "QQQ"

[[strategies]]
kind = "buy_and_hold"
name = "HODL"
instruments = ["QQQ"]
"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = load_config(Some(path.as_str())).unwrap();

        assert_eq!(config.arena.interval_minutes, 5);
        assert_eq!(config.arena.benchmark_symbol, "QQQ");
        assert_eq!(config.arena.order_timeout_seconds, 30);
        assert_eq!(config.strategies.len(), 1);
        assert!(matches!(
            &config.strategies[0],
            StrategyConfig::BuyAndHold { name, .. } if name == "HODL"
        ));
    }

    #[test]
    fn test_duplicate_strategy_names_rejected() {
        let mut config = AppConfig::default();
        let first = config.strategies[0].clone();
        config.strategies.push(first);

        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate strategy name"));
    }
}
