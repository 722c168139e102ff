use rust_decimal::Decimal;
use std::sync::Arc;

use crate::common::errors::Result;
use crate::common::traits::CompletionClient;
use crate::common::types::MarketSnapshot;
use crate::config::types::{ArenaSettings, StrategyConfig};
use crate::strategy::buy_hold::BuyAndHold;
use crate::strategy::crossover::MaCrossover;
use crate::strategy::llm::LlmStrategy;
use crate::strategy::mean_reversion::MeanReversion;
use crate::strategy::sizing::PositionSizer;
use crate::strategy::types::{Decision, StrategyContext};

/// Behavior of one competitor, fixed at construction
#[derive(Debug)]
pub enum StrategyKind {
    BuyAndHold(BuyAndHold),
    MeanReversion(MeanReversion),
    MaCrossover(MaCrossover),
    Llm(LlmStrategy),
}

/// A named competitor with its instrument universe
#[derive(Debug)]
pub struct Strategy {
    name: String,
    instruments: Vec<String>,
    kind: StrategyKind,
}

impl Strategy {
    pub fn new(name: impl Into<String>, instruments: Vec<String>, kind: StrategyKind) -> Self {
        Self {
            name: name.into(),
            instruments,
            kind,
        }
    }

    /// Build a strategy from its configuration entry
    ///
    /// Missing instruments fall back to the benchmark symbol and a missing
    /// notional to `arena.position_size`.
    pub fn from_config(
        config: &StrategyConfig,
        arena: &ArenaSettings,
        llm_client: Arc<dyn CompletionClient>,
    ) -> Self {
        let sizer_for = |notional: &Option<Decimal>| {
            PositionSizer::new(notional.unwrap_or(arena.position_size))
        };
        let universe = |instruments: &Vec<String>| {
            if instruments.is_empty() {
                vec![arena.benchmark_symbol.clone()]
            } else {
                instruments.clone()
            }
        };

        match config {
            StrategyConfig::BuyAndHold {
                name,
                instruments,
                notional,
            } => Self::new(
                name.clone(),
                universe(instruments),
                StrategyKind::BuyAndHold(BuyAndHold::new(sizer_for(notional))),
            ),
            StrategyConfig::MeanReversion {
                name,
                instruments,
                notional,
                signal,
                confidence_scale,
            } => Self::new(
                name.clone(),
                universe(instruments),
                StrategyKind::MeanReversion(MeanReversion::new(
                    sizer_for(notional),
                    signal.clone(),
                    *confidence_scale,
                )),
            ),
            StrategyConfig::MaCrossover {
                name,
                instruments,
                notional,
            } => Self::new(
                name.clone(),
                universe(instruments),
                StrategyKind::MaCrossover(MaCrossover::new(sizer_for(notional))),
            ),
            StrategyConfig::Llm {
                name,
                instruments,
                notional,
            } => Self::new(
                name.clone(),
                universe(instruments),
                StrategyKind::Llm(LlmStrategy::new(sizer_for(notional), llm_client)),
            ),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    pub fn kind(&self) -> &StrategyKind {
        &self.kind
    }

    pub fn trades(&self, symbol: &str) -> bool {
        self.instruments.iter().any(|s| s == symbol)
    }

    /// Decide for one instrument
    ///
    /// An `Err` means the strategy could not reach a decision at all; the
    /// orchestrator treats it as an implicit HOLD.
    pub async fn decide(&mut self, snapshot: &MarketSnapshot, ctx: &StrategyContext) -> Result<Decision> {
        match &mut self.kind {
            StrategyKind::BuyAndHold(s) => s.decide(snapshot, ctx),
            StrategyKind::MeanReversion(s) => s.decide(snapshot, ctx),
            StrategyKind::MaCrossover(s) => s.decide(snapshot, ctx),
            StrategyKind::Llm(s) => s.decide(snapshot, ctx).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::errors::ArenaError;
    use crate::config::types::AppConfig;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    struct NoLlm;

    #[async_trait]
    impl CompletionClient for NoLlm {
        async fn complete(&self, _: &str, _: &str) -> Result<String> {
            Err(ArenaError::Configuration("no llm in tests".into()))
        }
    }

    #[test]
    fn test_default_roster() {
        let config = AppConfig::default();
        let client: Arc<dyn CompletionClient> = Arc::new(NoLlm);
        let strategies: Vec<Strategy> = config
            .strategies
            .iter()
            .map(|c| Strategy::from_config(c, &config.arena, client.clone()))
            .collect();

        assert!(matches!(strategies[0].kind(), StrategyKind::Llm(_)));
        assert_eq!(strategies[0].instruments().len(), 5);
        assert!(matches!(strategies[1].kind(), StrategyKind::BuyAndHold(_)));
        assert_eq!(strategies[1].instruments(), &["SPY".to_string()]);
        assert!(strategies[3].trades("SPY"));
        assert!(!strategies[3].trades("AAPL"));
    }

    #[tokio::test]
    async fn test_llm_error_is_a_hold_not_an_err() {
        let config = StrategyConfig::Llm {
            name: "model".into(),
            instruments: vec!["AAPL".into()],
            notional: Some(dec!(1000)),
        };
        let mut strategy = Strategy::from_config(&config, &ArenaSettings::default(), Arc::new(NoLlm));

        let decision = strategy
            .decide(&MarketSnapshot::new("AAPL", dec!(200)), &StrategyContext::new())
            .await
            .unwrap();
        assert!(decision.is_hold());
        assert_eq!(decision.confidence, 0.0);
    }
}
