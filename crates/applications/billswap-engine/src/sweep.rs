use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::engine::SwapEngine;
use crate::error::SwapResult;

/// Outcome of one sweep pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub transitioned: usize,
    pub errors: usize,
}

/// Background safety net for elapsed deadlines
///
/// Deadlines are already applied lazily on every load, so the sweep only
/// bounds how stale an untouched swap can get. Every transition it takes is
/// idempotent and conflict-checked, so overlapping with user traffic is
/// harmless.
pub struct DeadlineSweeper {
    engine: Arc<SwapEngine>,
}

impl DeadlineSweeper {
    pub fn new(engine: Arc<SwapEngine>) -> Self {
        Self { engine }
    }

    /// Visit every open swap once, applying elapsed transitions
    pub async fn run_once(&self) -> SwapResult<SweepReport> {
        let open = self.engine.store.list_open_swaps().await?;
        let mut report = SweepReport {
            examined: open.len(),
            ..Default::default()
        };
        for swap in open {
            let before = swap.version;
            match self.engine.sweep_swap(swap.id).await {
                Ok(after) if after.version > before => report.transitioned += 1,
                Ok(_) => {}
                Err(e) => {
                    warn!(swap_id = %swap.id, error = %e, "Sweep pass failed for swap");
                    report.errors += 1;
                }
            }
        }
        info!(
            examined = report.examined,
            transitioned = report.transitioned,
            errors = report.errors,
            "Deadline sweep complete"
        );
        Ok(report)
    }

    /// Run the sweep forever at a fixed cadence
    pub async fn run(self, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once().await {
                warn!(error = %e, "Deadline sweep errored");
            }
        }
    }
}
