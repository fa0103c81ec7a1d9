//! IO operation descriptors.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::conflict::ConflictStrategy;
use crate::ledger::ErrorLedger;
use crate::progress::ProgressEstimate;

/// One filesystem primitive to be executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IoOperation {
    /// Copy a file, link or directory tree.
    Copy {
        source: PathBuf,
        destination: PathBuf,
        strategy: ConflictStrategy,
    },
    /// Move a file, link or directory tree.
    Move {
        source: PathBuf,
        destination: PathBuf,
        strategy: ConflictStrategy,
    },
    /// Create a symbolic link whose target is relative.
    LinkRelative {
        target: PathBuf,
        destination: PathBuf,
        strategy: ConflictStrategy,
    },
    /// Create a symbolic link whose target is absolute.
    LinkAbsolute {
        target: PathBuf,
        destination: PathBuf,
        strategy: ConflictStrategy,
    },
    /// Delete a file, link or directory tree.
    Remove { path: PathBuf },
    /// Create a directory, optionally with its missing parents.
    MakeDir {
        path: PathBuf,
        process_parents: bool,
        mode: u32,
    },
    /// Change permission bits.
    Chmod {
        path: PathBuf,
        mode: u32,
        recursive: bool,
    },
    /// Change owner and/or group. `None` leaves the id unchanged.
    Chown {
        path: PathBuf,
        uid: Option<u32>,
        gid: Option<u32>,
    },
}

/// Tag of an [`IoOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum OperationKind {
    Copy,
    Move,
    #[strum(serialize = "Link (relative)")]
    LinkRelative,
    #[strum(serialize = "Link (absolute)")]
    LinkAbsolute,
    Remove,
    #[strum(serialize = "Make directory")]
    MakeDir,
    Chmod,
    Chown,
}

impl IoOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Copy { .. } => OperationKind::Copy,
            Self::Move { .. } => OperationKind::Move,
            Self::LinkRelative { .. } => OperationKind::LinkRelative,
            Self::LinkAbsolute { .. } => OperationKind::LinkAbsolute,
            Self::Remove { .. } => OperationKind::Remove,
            Self::MakeDir { .. } => OperationKind::MakeDir,
            Self::Chmod { .. } => OperationKind::Chmod,
            Self::Chown { .. } => OperationKind::Chown,
        }
    }

    /// Path the operation reads from or acts on.
    ///
    /// For links this is the link target.
    pub fn source(&self) -> &Path {
        match self {
            Self::Copy { source, .. } | Self::Move { source, .. } => source,
            Self::LinkRelative { target, .. } | Self::LinkAbsolute { target, .. } => target,
            Self::Remove { path }
            | Self::MakeDir { path, .. }
            | Self::Chmod { path, .. }
            | Self::Chown { path, .. } => path,
        }
    }

    /// Path the operation writes to, if different from the source.
    pub fn destination(&self) -> Option<&Path> {
        match self {
            Self::Copy { destination, .. }
            | Self::Move { destination, .. }
            | Self::LinkRelative { destination, .. }
            | Self::LinkAbsolute { destination, .. } => Some(destination),
            _ => None,
        }
    }
}

/// Overwrite confirmation prompt.
///
/// Returning `false` skips the item.
pub trait Confirm: Send + Sync {
    fn confirm(&self, source: &Path, destination: &Path) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&Path, &Path) -> bool + Send + Sync,
{
    fn confirm(&self, source: &Path, destination: &Path) -> bool {
        self(source, destination)
    }
}

/// An operation together with everything the executor reports into.
#[derive(Clone)]
pub struct IoArgs {
    pub operation: IoOperation,
    /// Whether cancellation requests on `estimate` are honoured.
    pub cancellable: bool,
    /// Asked before overwrites the strategy did not pre-authorise.
    pub confirm: Option<Arc<dyn Confirm>>,
    /// Progress to update; `None` disables estimation.
    pub estimate: Option<Arc<ProgressEstimate>>,
    /// Receives every failure.
    pub ledger: Arc<ErrorLedger>,
}

impl IoArgs {
    /// Create args with no confirmation, no estimate and no cancellation.
    pub fn new(operation: IoOperation, ledger: Arc<ErrorLedger>) -> Self {
        Self {
            operation,
            cancellable: false,
            confirm: None,
            estimate: None,
            ledger,
        }
    }

    /// Report into `estimate` and honour its cancellation flag.
    pub fn with_estimate(mut self, estimate: Arc<ProgressEstimate>) -> Self {
        self.estimate = Some(estimate);
        self.cancellable = true;
        self
    }

    pub fn with_confirm(mut self, confirm: Arc<dyn Confirm>) -> Self {
        self.confirm = Some(confirm);
        self
    }

    pub fn cancellable(mut self, cancellable: bool) -> Self {
        self.cancellable = cancellable;
        self
    }
}

impl fmt::Debug for IoArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoArgs")
            .field("operation", &self.operation)
            .field("cancellable", &self.cancellable)
            .field("confirm", &self.confirm.is_some())
            .field("estimate", &self.estimate.is_some())
            .finish()
    }
}

/// Successful result of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IoOutcome {
    /// Fully done.
    Done,
    /// Left alone because of the strategy or a declined confirmation.
    Skipped,
    /// Some nested items failed and were recorded in the ledger.
    Partial,
}
