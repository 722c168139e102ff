//! Strategy module for trade decision making
//!
//! Each competitor is a [`Strategy`]: a name, an instrument universe and one
//! variant from the closed [`StrategyKind`] set, chosen from configuration at
//! construction time.
//!
//! # Decision flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Orchestrator                                               │
//! │    - Builds StrategyContext from the ledger (read-only)     │
//! │       │                                                     │
//! │       ▼                                                     │
//! │  Strategy.decide(snapshot, ctx) → Decision                  │
//! │    - Variant keeps only its own memory (flags, trend)       │
//! │    - PositionSizer turns notional into whole units          │
//! │       │                                                     │
//! │       ▼ (BUY / SELL with quantity > 0)                      │
//! │  Broker → Fill → Ledger                                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`Decision`]: BUY / SELL / HOLD with confidence and rationale
//! - [`StrategyContext`]: ledger positions for the deciding strategy
//! - [`PositionSizer`]: `floor(notional / price)` buys, full-long exits
//! - [`BuyAndHold`], [`MeanReversion`], [`MaCrossover`], [`LlmStrategy`]: the variants

mod buy_hold;
mod crossover;
mod kind;
mod llm;
mod mean_reversion;
mod sizing;
mod types;

pub use buy_hold::{BuyAndHold, BuyHoldState};
pub use crossover::{MaCrossover, TrendState};
pub use kind::{Strategy, StrategyKind};
pub use llm::{build_prompt, parse_verdict, LlmStrategy, ModelVerdict};
pub use mean_reversion::MeanReversion;
pub use sizing::PositionSizer;
pub use types::{clamp_confidence, Action, Decision, StrategyContext};
