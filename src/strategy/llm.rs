use std::fmt::Write as _;
use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use tracing::{debug, warn};

use crate::common::errors::{ArenaError, Result};
use crate::common::traits::CompletionClient;
use crate::common::types::MarketSnapshot;
use crate::strategy::sizing::PositionSizer;
use crate::strategy::types::{clamp_confidence, Action, Decision, StrategyContext};

const MAX_HEADLINES: usize = 5;
const RECENT_PERIODS: usize = 10;

const SYSTEM_PROMPT: &str = r#"You are an AI stock trader managing a portfolio. You analyze price data and news to make trading decisions on individual stocks.

You must respond with valid JSON in this exact format:
{
    "action": "BUY" | "SELL" | "HOLD",
    "confidence": 0.0 to 1.0,
    "reasoning": "Brief explanation of your decision (1-2 sentences)"
}

Consider:
- Recent price momentum and trends
- News sentiment and catalysts
- Technical levels (RSI, moving averages)
- Risk management - don't chase, cut losers
- Your current position in this stock

Be decisive but prudent. Respond ONLY with the JSON object."#;

/// Parsed model reply, before sizing
#[derive(Debug, Clone, PartialEq)]
pub struct ModelVerdict {
    pub action: Action,
    pub confidence: f64,
    pub reasoning: String,
}

/// Strategy that asks a language model for each decision
///
/// Never fails past its own boundary: transport errors and malformed replies
/// both become a zero-confidence HOLD carrying the reason.
pub struct LlmStrategy {
    sizer: PositionSizer,
    client: Arc<dyn CompletionClient>,
}

impl std::fmt::Debug for LlmStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmStrategy")
            .field("sizer", &self.sizer)
            .finish_non_exhaustive()
    }
}

impl LlmStrategy {
    pub fn new(sizer: PositionSizer, client: Arc<dyn CompletionClient>) -> Self {
        Self { sizer, client }
    }

    pub fn system_prompt() -> &'static str {
        SYSTEM_PROMPT
    }

    pub async fn decide(&self, snapshot: &MarketSnapshot, ctx: &StrategyContext) -> Result<Decision> {
        let prompt = build_prompt(snapshot, ctx.get_position(&snapshot.symbol));

        let raw = match self.client.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(symbol = %snapshot.symbol, error = %e, "LLM call failed");
                return Ok(Decision::unavailable(format!("Error calling LLM: {}", e)));
            }
        };

        let verdict = match parse_verdict(&raw) {
            Ok(verdict) => verdict,
            Err(e) => {
                let preview: String = raw.chars().take(200).collect();
                warn!(symbol = %snapshot.symbol, response = %preview, "Failed to parse LLM response");
                return Ok(Decision::unavailable(format!("Failed to parse response: {}", e)));
            }
        };
        debug!(symbol = %snapshot.symbol, action = %verdict.action, confidence = verdict.confidence, "LLM verdict");

        self.size(verdict, snapshot, ctx)
    }

    fn size(&self, verdict: ModelVerdict, snapshot: &MarketSnapshot, ctx: &StrategyContext) -> Result<Decision> {
        let ModelVerdict {
            action,
            confidence,
            reasoning,
        } = verdict;

        match action {
            Action::Hold => Ok(Decision::hold(confidence, reasoning)),
            Action::Buy => {
                let quantity = self.sizer.buy_quantity(snapshot)?;
                if quantity == 0 {
                    return Ok(Decision::hold(
                        0.0,
                        format!("{} (notional buys less than one unit)", reasoning),
                    ));
                }
                Ok(Decision::buy(quantity, confidence, reasoning))
            }
            Action::Sell => {
                let quantity = self.sizer.exit_quantity(ctx, &snapshot.symbol);
                if quantity == 0 {
                    return Ok(Decision::hold(
                        0.0,
                        format!("{} (no long position to sell)", reasoning),
                    ));
                }
                Ok(Decision::sell(quantity, confidence, reasoning))
            }
        }
    }
}

/// Extract and validate the JSON verdict from a free-form reply
///
/// Takes the span from the first `{` to the last `}` so chatter around the
/// object is ignored.
pub fn parse_verdict(raw: &str) -> Result<ModelVerdict> {
    let body = match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => raw.trim(),
    };
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ArenaError::DecisionParse(format!("invalid JSON: {}", e)))?;

    let action = match value.get("action").and_then(Value::as_str) {
        Some(action) => match action.trim().to_uppercase().as_str() {
            "BUY" => Action::Buy,
            "SELL" => Action::Sell,
            "HOLD" => Action::Hold,
            other => {
                return Err(ArenaError::DecisionParse(format!(
                    "unknown action '{}'",
                    other
                )))
            }
        },
        None => return Err(ArenaError::DecisionParse("missing 'action'".to_string())),
    };

    let confidence = match value.get("confidence") {
        None | Some(Value::Null) => 0.5,
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.5),
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| {
            ArenaError::DecisionParse(format!("confidence '{}' is not a number", s))
        })?,
        Some(other) => {
            return Err(ArenaError::DecisionParse(format!(
                "confidence {} is not a number",
                other
            )))
        }
    };

    let reasoning = value
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or("No reasoning provided")
        .to_string();

    Ok(ModelVerdict {
        action,
        confidence: clamp_confidence(confidence),
        reasoning,
    })
}

/// Render the user prompt for one snapshot
///
/// Deterministic for a given snapshot and holding.
pub fn build_prompt(snapshot: &MarketSnapshot, holding: i64) -> String {
    let price = snapshot.current_price;
    let closes = snapshot.primary_closes();

    let (recent_change, window_change) = match (closes.first(), closes.last()) {
        (Some(first), Some(last)) if closes.len() >= 2 => {
            let recent = if closes.len() >= RECENT_PERIODS {
                pct_change(closes[closes.len() - RECENT_PERIODS], *last)
            } else {
                Decimal::ZERO
            };
            (recent, pct_change(*first, *last))
        }
        _ => (Decimal::ZERO, Decimal::ZERO),
    };
    let high = closes.iter().copied().max().unwrap_or(price);
    let low = closes.iter().copied().min().unwrap_or(price);

    let mut technicals = String::new();
    if let Some(rsi) = snapshot.indicators.rsi {
        let _ = write!(technicals, "\nRSI: {}", rsi.round_dp(1));
    }
    if let (Some(short), Some(long)) = (snapshot.indicators.sma_short, snapshot.indicators.sma_long) {
        let trend = if short > long { "bullish" } else { "bearish" };
        let _ = write!(
            technicals,
            "\nSMA short: ${}, SMA long: ${} ({})",
            short.round_dp(2),
            long.round_dp(2),
            trend
        );
    }

    let position = if holding == 0 {
        "None".to_string()
    } else {
        format!(
            "{} shares (${})",
            holding,
            (Decimal::from(holding) * price).round_dp(0)
        )
    };

    let mut news = String::new();
    if !snapshot.news_headlines.is_empty() {
        news.push_str("\n\nRecent News:");
        for headline in snapshot.news_headlines.iter().take(MAX_HEADLINES) {
            let _ = write!(news, "\n• {}", headline);
        }
    }

    format!(
        "Analyze {symbol} and decide whether to BUY, SELL, or HOLD.

=== PRICE DATA ===
Current Price: ${price}
Recent Change ({periods} periods): {recent}%
Window Change: {window}%
Window High: ${high}
Window Low: ${low}
{technicals}

=== YOUR POSITION ===
Current holding: {position}
{news}

Make your trading decision as JSON.",
        symbol = snapshot.symbol,
        price = price.round_dp(2),
        periods = RECENT_PERIODS,
        recent = signed(recent_change),
        window = signed(window_change),
        high = high.round_dp(2),
        low = low.round_dp(2),
        technicals = technicals,
        position = position,
        news = news,
    )
}

fn pct_change(from: Decimal, to: Decimal) -> Decimal {
    if from.is_zero() {
        return Decimal::ZERO;
    }
    (to - from) / from * dec!(100)
}

fn signed(value: Decimal) -> String {
    let value = value.round_dp(2);
    if value.is_sign_negative() && !value.is_zero() {
        value.to_string()
    } else {
        format!("+{}", value.abs())
    }
}
