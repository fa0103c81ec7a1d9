//! Copy, move and link of a view's selection.

use std::path::Path;
use std::sync::Arc;

use dirpilot_core::{OpsConfig, PlanningError};
use dirpilot_ops::{
    BatchContext, BatchHandle, BatchRequest, Confirm, ConflictStrategy, IoOutcome,
    TransformKind, plan_batch, run_batch,
};
use tracing::debug;

use crate::view::FileView;

/// Options of one [`cpmv_files`] call.
#[derive(Clone, Default)]
pub struct TransferOptions {
    /// Destination basenames, one per selected entry.
    pub names: Option<Vec<String>>,
    pub strategy: ConflictStrategy,
    pub confirm: Option<Arc<dyn Confirm>>,
    pub config: OpsConfig,
}

impl std::fmt::Debug for TransferOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferOptions")
            .field("names", &self.names)
            .field("strategy", &self.strategy)
            .field("confirm", &self.confirm.is_some())
            .finish()
    }
}

/// Copy, move or link the selection of `view` into `destination`, blocking
/// until done.
///
/// Moved entries disappear from `view` as soon as each of them is moved. The
/// returned handle is already finished and carries progress and errors.
pub fn cpmv_files(
    view: &mut FileView,
    destination: &Path,
    kind: TransformKind,
    options: TransferOptions,
) -> Result<BatchHandle, PlanningError> {
    let mut request = BatchRequest::new(view.selected_paths(), destination, kind)
        .with_strategy(options.strategy);
    if let Some(names) = options.names {
        request = request.with_names(names);
    }
    if let Some(confirm) = options.confirm {
        request = request.with_confirm(confirm);
    }
    let plan = plan_batch(request)?;

    let ctx = BatchContext::new(options.config);
    let outcome = run_batch(&plan, &ctx, |item, result| {
        if kind == TransformKind::Move && result == IoOutcome::Done {
            debug!(path = %item.source.display(), "dropping moved entry from view");
            view.remove_path(&item.source);
        }
    });

    Ok(BatchHandle::finished(ctx.estimate, ctx.ledger, outcome))
}
