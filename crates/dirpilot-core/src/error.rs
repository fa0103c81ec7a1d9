//! Error taxonomy for planning, executing and watching.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A batch was rejected before any mutation took place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanningError {
    /// Nothing was selected.
    #[error("Nothing to operate on")]
    EmptySelection,

    /// A destination is the very item it would be produced from.
    #[error("Source and destination are the same: {path}")]
    SelfCollision { path: PathBuf },

    /// Two sources would end up at the same destination.
    #[error("Several items would be written to {path}")]
    DuplicateDestination { path: PathBuf },

    /// A directory would be placed inside itself.
    #[error("Cannot put {path} inside itself ({destination})")]
    IntoItself { path: PathBuf, destination: PathBuf },

    /// Explicit destination names do not match the selection.
    #[error("Expected {expected} names, got {got}")]
    NameCountMismatch { expected: usize, got: usize },

    /// An explicit destination name is not a plain file name.
    #[error("Invalid name: {name:?}")]
    InvalidName { name: String },
}

/// Failure of a single item, recorded in the error ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ItemError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Rename across filesystems.
    #[error("Cannot rename across devices: {path}")]
    CrossDevice { path: PathBuf },

    /// Destination exists and the strategy forbids touching it.
    #[error("Destination already exists: {path}")]
    DestinationExists { path: PathBuf },

    /// Operation not available on this platform.
    #[error("Operation not supported: {path}")]
    Unsupported { path: PathBuf },

    /// Any other I/O failure.
    #[error("I/O error at {path}: {message}")]
    Io { path: PathBuf, message: String },
}

impl ItemError {
    /// Translate an OS error into the typed set.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let path = path.into();
        match source.kind() {
            ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            ErrorKind::NotFound => Self::NotFound { path },
            ErrorKind::CrossesDevices => Self::CrossDevice { path },
            ErrorKind::AlreadyExists => Self::DestinationExists { path },
            ErrorKind::Unsupported => Self::Unsupported { path },
            _ => Self::Io {
                path,
                message: source.to_string(),
            },
        }
    }

    /// Path the failure refers to.
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::PermissionDenied { path }
            | Self::NotFound { path }
            | Self::CrossDevice { path }
            | Self::DestinationExists { path }
            | Self::Unsupported { path }
            | Self::Io { path, .. } => path,
        }
    }
}

/// Result of executing one IO operation that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpError {
    /// The item failed.
    #[error(transparent)]
    Item(#[from] ItemError),

    /// Cancellation was observed.
    #[error("Operation cancelled")]
    Cancelled,
}

/// Errors from listing views and custom lists.
#[derive(Debug, Error)]
pub enum ViewError {
    /// A custom list was finished without entries.
    #[error("Custom list is empty")]
    EmptyCustomList,

    /// A custom list operation was issued outside `start`/`finish`.
    #[error("No custom list is being built")]
    NotCustom,

    /// Reading a directory failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while setting up a watcher.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The native notification source could not be created.
    #[error("Failed to create watcher: {message}")]
    Create { message: String },

    /// The path could not be watched.
    #[error("Failed to watch {path}: {message}")]
    WatchPath { path: PathBuf, message: String },
}
