//! Cycle orchestration
//!
//! # Components
//!
//! - [`Arena`]: runs one decision cycle across every strategy and instrument
//! - [`Scheduler`]: fires cycles on a fixed interval until shutdown
//! - [`report`]: text rendering of leaderboard, positions and recent trades

mod cycle;
pub mod report;
mod scheduler;

pub use cycle::{Arena, CycleReport, Execution, PairOutcome, PendingFill};
pub use scheduler::Scheduler;
