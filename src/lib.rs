//! dirpilot - file operation engine and directory change watcher for
//! terminal file managers.
//!
//! The [`Engine`] is the surface a UI talks to: it submits copy/move/link
//! batches, polls their progress, collects their errors and owns the
//! directory watchers. Everything it hands out is addressed by an id, so the
//! UI never holds executor state itself.
//!
//! ```no_run
//! use dirpilot::{BatchRequest, Engine, TransformKind};
//! use std::path::PathBuf;
//!
//! let engine = Engine::new();
//! let request = BatchRequest::new(vec![PathBuf::from("/tmp/a")], "/tmp/b", TransformKind::Copy);
//! let id = engine.submit_batch(request, false).unwrap();
//! println!("{}", engine.poll_progress(id).unwrap().summary());
//! ```

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use dashmap::DashMap;
use tracing::{debug, warn};

pub use dirpilot_core::{
    Decorations, DirEntry, EntryKind, InodeInfo, ItemError, OpError, OpsConfig, PlanningError,
    SortKey, SortSpec, ViewConfig, ViewError, WatchConfig, WatchError,
};
pub use dirpilot_ops::{
    BatchHandle, BatchOutcome, BatchPlan, BatchRequest, BatchStatus, Confirm, ConflictStrategy,
    ErrorLedger, ErrorRecord, IoArgs, IoOperation, IoOutcome, OperationExecutor,
    ProgressEstimate, ProgressSnapshot, TransformKind,
};
pub use dirpilot_view::{
    CustomList, FileView, LocalFilter, Registers, TransferOptions, cpmv_files, expand_macros,
};
pub use dirpilot_watch::{FsWatcher, IdentitySource, WatchState};

/// Identifies a submitted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(u64);

/// Identifies a live watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatcherId(u64);

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch#{}", self.0)
    }
}

impl fmt::Display for WatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watcher#{}", self.0)
    }
}

struct BatchEntry {
    handle: BatchHandle,
    /// Ledger records already handed out by `drain_errors`.
    drained: usize,
}

/// Registry of running batches and live watchers.
///
/// Unknown ids are answered with `None` or ignored.
pub struct Engine {
    ops_config: OpsConfig,
    watch_config: WatchConfig,
    next_id: AtomicU64,
    batches: DashMap<BatchId, BatchEntry>,
    watchers: DashMap<WatcherId, Mutex<FsWatcher>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(OpsConfig::default(), WatchConfig::default())
    }

    pub fn with_config(ops_config: OpsConfig, watch_config: WatchConfig) -> Self {
        Self {
            ops_config,
            watch_config,
            next_id: AtomicU64::new(1),
            batches: DashMap::new(),
            watchers: DashMap::new(),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Plan and start a batch.
    ///
    /// A rejected plan returns the reason and creates nothing. In background
    /// mode the batch runs on the current Tokio runtime and this returns
    /// immediately; without a runtime it falls back to the foreground.
    pub fn submit_batch(
        &self,
        request: BatchRequest,
        background: bool,
    ) -> Result<BatchId, PlanningError> {
        let plan = dirpilot_ops::plan_batch(request)?;
        let id = BatchId(self.next_id());

        let handle = if background && tokio::runtime::Handle::try_current().is_ok() {
            dirpilot_ops::start_batch(plan, self.ops_config.clone())
        } else {
            if background {
                warn!(%id, "no async runtime, running batch in the foreground");
            }
            let ctx = dirpilot_ops::BatchContext::new(self.ops_config.clone());
            let outcome = dirpilot_ops::run_batch(&plan, &ctx, |_, _| {});
            BatchHandle::finished(ctx.estimate, ctx.ledger, outcome)
        };

        debug!(%id, "batch submitted");
        self.batches.insert(id, BatchEntry { handle, drained: 0 });
        Ok(id)
    }

    pub fn poll_progress(&self, id: BatchId) -> Option<ProgressSnapshot> {
        self.batches.get(&id).map(|entry| entry.handle.progress())
    }

    /// Request cancellation. Returns `false` for an unknown id.
    pub fn cancel(&self, id: BatchId) -> bool {
        match self.batches.get(&id) {
            Some(entry) => {
                entry.handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Errors recorded since the previous call for the same batch.
    pub fn drain_errors(&self, id: BatchId) -> Option<Vec<ErrorRecord>> {
        let mut entry = self.batches.get_mut(&id)?;
        let fresh = entry.handle.ledger().since(entry.drained);
        entry.drained += fresh.len();
        Some(fresh)
    }

    pub fn is_finished(&self, id: BatchId) -> Option<bool> {
        self.batches.get(&id).map(|entry| entry.handle.is_finished())
    }

    /// Wait for a batch and forget it.
    pub async fn finish_batch(&self, id: BatchId) -> Option<BatchOutcome> {
        let (_, entry) = self.batches.remove(&id)?;
        Some(entry.handle.wait().await)
    }

    /// Forget a batch without waiting. A running batch keeps going.
    pub fn release_batch(&self, id: BatchId) -> bool {
        self.batches.remove(&id).is_some()
    }

    pub fn watcher_create(&self, path: impl Into<PathBuf>) -> Result<WatcherId, WatchError> {
        let watcher = FsWatcher::new(path, self.watch_config.clone())?;
        let id = WatcherId(self.next_id());
        self.watchers.insert(id, Mutex::new(watcher));
        Ok(id)
    }

    /// `(changed, error)` of a watcher, or `None` for an unknown id.
    pub fn watcher_changed(&self, id: WatcherId) -> Option<(bool, bool)> {
        let entry = self.watchers.get(&id)?;
        let mut watcher = entry.lock().unwrap_or_else(PoisonError::into_inner);
        Some(watcher.changed())
    }

    pub fn watcher_free(&self, id: WatcherId) -> bool {
        self.watchers.remove(&id).is_some()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("batches", &self.batches.len())
            .field("watchers", &self.watchers.len())
            .finish()
    }
}
