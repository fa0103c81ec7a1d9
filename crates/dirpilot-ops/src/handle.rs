//! Background execution of a batch.

use std::path::PathBuf;
use std::sync::Arc;

use dirpilot_core::{ItemError, OpsConfig};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::cpmv::{BatchContext, BatchOutcome, BatchPlan, run_batch};
use crate::ledger::{ErrorLedger, ErrorRecord};
use crate::progress::{ProgressEstimate, ProgressSnapshot};

enum HandleState {
    Running(JoinHandle<BatchOutcome>),
    Finished(BatchOutcome),
}

/// Caller-side handle to a batch running on another context.
///
/// The handle only reads the shared estimate and ledger, and sets the
/// cancellation flag.
pub struct BatchHandle {
    estimate: Arc<ProgressEstimate>,
    ledger: Arc<ErrorLedger>,
    state: HandleState,
}

impl BatchHandle {
    /// Wrap a batch that already ran to completion in the foreground.
    pub fn finished(
        estimate: Arc<ProgressEstimate>,
        ledger: Arc<ErrorLedger>,
        outcome: BatchOutcome,
    ) -> Self {
        Self {
            estimate,
            ledger,
            state: HandleState::Finished(outcome),
        }
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.estimate.snapshot()
    }

    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.ledger.snapshot()
    }

    pub fn ledger(&self) -> &Arc<ErrorLedger> {
        &self.ledger
    }

    /// Ask the batch to stop after the item or chunk in progress.
    pub fn cancel(&self) {
        self.estimate.cancel();
    }

    pub fn is_finished(&self) -> bool {
        match &self.state {
            HandleState::Running(join) => join.is_finished(),
            HandleState::Finished(_) => true,
        }
    }

    /// Outcome of a batch that is already known to be finished.
    pub fn outcome(&self) -> Option<&BatchOutcome> {
        match &self.state {
            HandleState::Finished(outcome) => Some(outcome),
            HandleState::Running(_) => None,
        }
    }

    /// Wait for the batch to finish.
    pub async fn wait(self) -> BatchOutcome {
        match self.state {
            HandleState::Finished(outcome) => outcome,
            HandleState::Running(join) => match join.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("batch task failed: {e}");
                    self.ledger.record(
                        PathBuf::new(),
                        None,
                        ItemError::Io {
                            path: PathBuf::new(),
                            message: e.to_string(),
                        },
                    );
                    BatchOutcome::aborted(1)
                }
            },
        }
    }
}

impl std::fmt::Debug for BatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchHandle")
            .field("progress", &self.estimate.snapshot())
            .field("errors", &self.ledger.len())
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Start a batch on Tokio's blocking pool and return immediately.
///
/// Must be called from within a Tokio runtime.
pub fn start_batch(plan: BatchPlan, config: OpsConfig) -> BatchHandle {
    let ctx = BatchContext::new(config);
    let estimate = Arc::clone(&ctx.estimate);
    let ledger = Arc::clone(&ctx.ledger);

    info!(kind = %plan.kind, items = plan.len(), "starting background batch");
    let join = tokio::task::spawn_blocking(move || run_batch(&plan, &ctx, |_, _| {}));

    BatchHandle {
        estimate,
        ledger,
        state: HandleState::Running(join),
    }
}
