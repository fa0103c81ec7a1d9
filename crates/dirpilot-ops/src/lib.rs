//! File operation engine for dirpilot.
//!
//! Single filesystem primitives are described by [`IoOperation`] and run by
//! the [`OperationExecutor`]. Copy, move and link of whole selections are
//! planned with [`plan_batch`] and executed either in the foreground with
//! [`run_batch`] or in the background with [`start_batch`]. Both report into
//! a shared [`ProgressEstimate`] and [`ErrorLedger`].

mod conflict;
mod cpmv;
mod estimate;
mod executor;
mod handle;
mod ledger;
mod operation;
mod progress;

pub use conflict::{ConflictStrategy, DestinationState, Resolution, removal_set, resolve};
pub use cpmv::{
    BatchContext, BatchOutcome, BatchPlan, BatchRequest, BatchStatus, PlannedItem, TransformKind,
    normalize, plan_batch, relative_path, run_batch,
};
pub use estimate::{Totals, batch_totals, path_totals};
pub use executor::OperationExecutor;
pub use handle::{BatchHandle, start_batch};
pub use ledger::{ErrorLedger, ErrorRecord};
pub use operation::{Confirm, IoArgs, IoOperation, IoOutcome, OperationKind};
pub use progress::{ProgressEstimate, ProgressSnapshot};
