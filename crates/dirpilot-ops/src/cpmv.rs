//! Batch copy, move and link of a selection.
//!
//! A [`BatchRequest`] is validated and turned into a [`BatchPlan`] without
//! touching the filesystem. [`run_batch`] then feeds the planned operations
//! to an [`OperationExecutor`] one by one.

use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use dirpilot_core::{ItemError, OpError, OpsConfig, PlanningError};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, info, instrument};

use crate::conflict::ConflictStrategy;
use crate::estimate::{Totals, batch_totals};
use crate::executor::OperationExecutor;
use crate::ledger::ErrorLedger;
use crate::operation::{Confirm, IoArgs, IoOperation, IoOutcome};
use crate::progress::ProgressEstimate;

/// Kind of transformation applied to every item of a batch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "kebab-case")]
pub enum TransformKind {
    Copy,
    Move,
    LinkRelative,
    LinkAbsolute,
}

impl TransformKind {
    pub fn is_link(&self) -> bool {
        matches!(self, Self::LinkRelative | Self::LinkAbsolute)
    }
}

/// A copy/move/link request over a selection.
#[derive(Clone)]
pub struct BatchRequest {
    pub sources: Vec<PathBuf>,
    /// Directory the items go into.
    pub destination: PathBuf,
    /// Destination basenames, one per source, in selection order.
    pub names: Option<Vec<String>>,
    pub kind: TransformKind,
    pub strategy: ConflictStrategy,
    pub confirm: Option<Arc<dyn Confirm>>,
}

impl BatchRequest {
    pub fn new(sources: Vec<PathBuf>, destination: impl Into<PathBuf>, kind: TransformKind) -> Self {
        Self {
            sources,
            destination: destination.into(),
            names: None,
            kind,
            strategy: ConflictStrategy::default(),
            confirm: None,
        }
    }

    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.names = Some(names);
        self
    }

    pub fn with_strategy(mut self, strategy: ConflictStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_confirm(mut self, confirm: Arc<dyn Confirm>) -> Self {
        self.confirm = Some(confirm);
        self
    }
}

impl fmt::Debug for BatchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchRequest")
            .field("sources", &self.sources)
            .field("destination", &self.destination)
            .field("names", &self.names)
            .field("kind", &self.kind)
            .field("strategy", &self.strategy)
            .field("confirm", &self.confirm.is_some())
            .finish()
    }
}

/// One source item and what will be done with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedItem {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub operation: IoOperation,
}

/// Validated, ordered list of operations for one batch.
#[derive(Clone)]
pub struct BatchPlan {
    pub kind: TransformKind,
    pub strategy: ConflictStrategy,
    pub items: Vec<PlannedItem>,
    pub confirm: Option<Arc<dyn Confirm>>,
}

impl BatchPlan {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Work the plan is expected to do, for pre-filling a progress estimate.
    ///
    /// Links count one item each and no bytes.
    pub fn totals(&self) -> Totals {
        if self.kind.is_link() {
            return Totals {
                items: self.items.len() as u64,
                bytes: 0,
            };
        }
        let sources: Vec<PathBuf> = self.items.iter().map(|i| i.source.clone()).collect();
        batch_totals(&sources)
    }
}

impl fmt::Debug for BatchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchPlan")
            .field("kind", &self.kind)
            .field("strategy", &self.strategy)
            .field("items", &self.items)
            .field("confirm", &self.confirm.is_some())
            .finish()
    }
}

/// Validate a request and compute every destination.
///
/// Nothing on disk is modified. Any error rejects the batch as a whole.
#[instrument(level = "debug", skip(request), fields(kind = %request.kind, count = request.sources.len()))]
pub fn plan_batch(request: BatchRequest) -> Result<BatchPlan, PlanningError> {
    if request.sources.is_empty() {
        return Err(PlanningError::EmptySelection);
    }

    let names = match &request.names {
        Some(names) => {
            if names.len() != request.sources.len() {
                return Err(PlanningError::NameCountMismatch {
                    expected: request.sources.len(),
                    got: names.len(),
                });
            }
            if let Some(bad) = names.iter().find(|name| !is_valid_name(name)) {
                return Err(PlanningError::InvalidName { name: bad.clone() });
            }
            Some(names)
        }
        None => None,
    };

    let destination_dir = normalize(&absolute(&request.destination));

    let mut pairs = Vec::with_capacity(request.sources.len());
    for (idx, source) in request.sources.iter().enumerate() {
        let source = normalize(&absolute(source));
        let name = match names {
            Some(names) => PathBuf::from(&names[idx]),
            None => match source.file_name() {
                Some(name) => PathBuf::from(name),
                None => {
                    return Err(PlanningError::InvalidName {
                        name: source.display().to_string(),
                    });
                }
            },
        };
        let destination = destination_dir.join(name);
        pairs.push((source, destination));
    }

    if let Some(path) = pairs.iter().map(|(_, dst)| dst).duplicates().next() {
        return Err(PlanningError::DuplicateDestination { path: path.clone() });
    }

    for (source, destination) in &pairs {
        // Parents are resolved so a path through a symlinked directory
        // cannot pass for a different one.
        let real_source = canonical_parent(source);
        let real_destination = canonical_parent(destination);
        if source == destination || real_source == real_destination {
            return Err(PlanningError::SelfCollision {
                path: source.clone(),
            });
        }
        if !request.kind.is_link()
            && (destination.starts_with(source) || real_destination.starts_with(&real_source))
        {
            return Err(PlanningError::IntoItself {
                path: source.clone(),
                destination: destination.clone(),
            });
        }
    }

    let pairs = order_pairs(pairs, request.kind)?;

    let items = pairs
        .into_iter()
        .map(|(source, destination)| {
            let operation = build_operation(&source, &destination, request.kind, request.strategy);
            PlannedItem {
                source,
                destination,
                operation,
            }
        })
        .collect::<Vec<_>>();

    debug!(items = items.len(), "batch planned");
    Ok(BatchPlan {
        kind: request.kind,
        strategy: request.strategy,
        items,
        confirm: request.confirm,
    })
}

/// Reject destinations that land on another source of the batch.
///
/// For a move this is fine as long as that other source moves away first,
/// so the pairs are reordered accordingly. A cycle cannot be ordered.
fn order_pairs(
    pairs: Vec<(PathBuf, PathBuf)>,
    kind: TransformKind,
) -> Result<Vec<(PathBuf, PathBuf)>, PlanningError> {
    let sources: HashSet<&PathBuf> = pairs.iter().map(|(src, _)| src).collect();
    let clobbering = pairs.iter().find(|(_, dst)| sources.contains(dst));
    let Some((_, clobbered)) = clobbering else {
        return Ok(pairs);
    };
    if kind != TransformKind::Move {
        return Err(PlanningError::SelfCollision {
            path: clobbered.clone(),
        });
    }

    let mut pending: Vec<(PathBuf, PathBuf)> = pairs;
    let mut ordered = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let waiting: HashSet<&PathBuf> = pending.iter().map(|(src, _)| src).collect();
        let ready = pending
            .iter()
            .position(|(_, dst)| !waiting.contains(dst));
        match ready {
            Some(idx) => ordered.push(pending.remove(idx)),
            None => {
                return Err(PlanningError::SelfCollision {
                    path: pending[0].1.clone(),
                });
            }
        }
    }
    Ok(ordered)
}

fn build_operation(
    source: &Path,
    destination: &Path,
    kind: TransformKind,
    strategy: ConflictStrategy,
) -> IoOperation {
    match kind {
        TransformKind::Copy => IoOperation::Copy {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            strategy,
        },
        TransformKind::Move => IoOperation::Move {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            strategy,
        },
        TransformKind::LinkAbsolute => IoOperation::LinkAbsolute {
            target: std::fs::canonicalize(source).unwrap_or_else(|_| source.to_path_buf()),
            destination: destination.to_path_buf(),
            strategy,
        },
        TransformKind::LinkRelative => {
            let link_dir = destination.parent().unwrap_or(Path::new("/"));
            let link_dir = std::fs::canonicalize(link_dir).unwrap_or_else(|_| link_dir.to_path_buf());
            IoOperation::LinkRelative {
                target: relative_path(&link_dir, &canonical_parent(source)),
                destination: destination.to_path_buf(),
                strategy,
            }
        }
    }
}

/// `path` with its parent directory resolved, keeping the last component
/// as is so a link to a link points at the link.
fn canonical_parent(path: &Path) -> PathBuf {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => std::fs::canonicalize(parent)
            .unwrap_or_else(|_| parent.to_path_buf())
            .join(name),
        _ => path.to_path_buf(),
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains(std::path::MAIN_SEPARATOR)
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Resolve `.` and `..` components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out
}

/// Path leading from directory `base` to `target`. Both must be absolute.
pub fn relative_path(base: &Path, target: &Path) -> PathBuf {
    let base: Vec<Component<'_>> = base.components().collect();
    let target: Vec<Component<'_>> = target.components().collect();
    let common = base
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base.len() {
        relative.push("..");
    }
    for component in &target[common..] {
        relative.push(component);
    }
    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    relative
}

/// Aggregate status of a finished batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum BatchStatus {
    Completed,
    #[strum(serialize = "Completed with errors")]
    CompletedWithErrors,
    /// A collision under the `Fail` strategy stopped the remaining items.
    Aborted,
    Cancelled,
}

/// Result of running a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub status: BatchStatus,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// `(source, destination)` of every item moved away from its source.
    pub moved: Vec<(PathBuf, PathBuf)>,
}

impl BatchOutcome {
    pub fn aborted(failed: usize) -> Self {
        Self {
            status: BatchStatus::Aborted,
            succeeded: 0,
            skipped: 0,
            failed,
            moved: Vec::new(),
        }
    }
}

/// Shared state one batch reports into.
#[derive(Debug, Clone)]
pub struct BatchContext {
    pub executor: OperationExecutor,
    pub estimate: Arc<ProgressEstimate>,
    pub ledger: Arc<ErrorLedger>,
}

impl BatchContext {
    pub fn new(config: OpsConfig) -> Self {
        Self {
            executor: OperationExecutor::with_config(config),
            estimate: ProgressEstimate::shared(),
            ledger: ErrorLedger::shared(),
        }
    }
}

/// Execute a plan item by item, blocking until done or cancelled.
///
/// `on_item_done` is called after every item that did not fail.
pub fn run_batch<F>(plan: &BatchPlan, ctx: &BatchContext, mut on_item_done: F) -> BatchOutcome
where
    F: FnMut(&PlannedItem, IoOutcome),
{
    let totals = plan.totals();
    ctx.estimate.add_totals(totals.items, totals.bytes);

    let mut outcome = BatchOutcome {
        status: BatchStatus::Completed,
        succeeded: 0,
        skipped: 0,
        failed: 0,
        moved: Vec::new(),
    };

    for item in &plan.items {
        if ctx.estimate.is_cancelled() {
            outcome.status = BatchStatus::Cancelled;
            break;
        }
        ctx.estimate.set_current(Some(item.source.clone()));

        let mut args = IoArgs::new(item.operation.clone(), Arc::clone(&ctx.ledger))
            .with_estimate(Arc::clone(&ctx.estimate));
        if let Some(confirm) = &plan.confirm {
            args = args.with_confirm(Arc::clone(confirm));
        }

        match ctx.executor.execute(&args) {
            Ok(IoOutcome::Done) => {
                outcome.succeeded += 1;
                if plan.kind == TransformKind::Move {
                    outcome
                        .moved
                        .push((item.source.clone(), item.destination.clone()));
                }
                on_item_done(item, IoOutcome::Done);
            }
            Ok(IoOutcome::Skipped) => {
                outcome.skipped += 1;
                on_item_done(item, IoOutcome::Skipped);
            }
            Ok(IoOutcome::Partial) => {
                outcome.failed += 1;
                on_item_done(item, IoOutcome::Partial);
            }
            Err(OpError::Cancelled) => {
                outcome.status = BatchStatus::Cancelled;
                break;
            }
            Err(OpError::Item(ItemError::DestinationExists { .. }))
                if plan.strategy == ConflictStrategy::Fail =>
            {
                outcome.failed += 1;
                ctx.ledger.give_up();
                outcome.status = BatchStatus::Aborted;
                break;
            }
            Err(OpError::Item(_)) => outcome.failed += 1,
        }
    }
    ctx.estimate.set_current(None);

    if outcome.status == BatchStatus::Completed && outcome.failed > 0 {
        outcome.status = BatchStatus::CompletedWithErrors;
    }
    info!(
        kind = %plan.kind,
        status = %outcome.status,
        succeeded = outcome.succeeded,
        skipped = outcome.skipped,
        failed = outcome.failed,
        "batch finished"
    );
    outcome
}
