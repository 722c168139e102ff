//! Fixed-interval cycle scheduling with cooperative shutdown

use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use super::cycle::{Arena, CycleReport};
use crate::common::channels::{is_shutdown, ShutdownReceiver};
use crate::common::errors::{ArenaError, Result};

/// Fires cycles on a wall-clock interval
///
/// The first cycle runs immediately. Later ticks are spaced from the start of
/// the schedule rather than from the end of the previous cycle; a tick missed
/// because a cycle overran is skipped, so cycles never overlap or bunch up.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    period: Duration,
}

impl Scheduler {
    pub fn new(period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(ArenaError::Configuration(
                "cycle interval must be positive".to_string(),
            ));
        }
        Ok(Self { period })
    }

    pub fn from_minutes(minutes: u64) -> Result<Self> {
        Self::new(Duration::from_secs(minutes.saturating_mul(60)))
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run cycles until shutdown is signalled; returns the number run
    ///
    /// Shutdown is observed between cycles. A cycle in progress always
    /// finishes, since in-flight orders cannot be cancelled.
    pub async fn run<F>(&self, arena: &mut Arena, mut shutdown: ShutdownReceiver, mut on_cycle: F) -> u64
    where
        F: FnMut(&CycleReport),
    {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut completed = 0;

        info!(period = ?self.period, "Scheduler started");
        loop {
            if is_shutdown(&shutdown) {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    if is_shutdown(&shutdown) {
                        break;
                    }
                    let report = arena.run_cycle().await;
                    completed += 1;
                    on_cycle(&report);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        warn!("Shutdown sender dropped, stopping scheduler");
                        break;
                    }
                }
            }
        }

        info!(cycles = completed, "Scheduler stopped");
        completed
    }
}
