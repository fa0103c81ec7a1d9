//! Per-item failure records of one operation.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use dirpilot_core::ItemError;
use serde::{Deserialize, Serialize};

/// One failed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Item being processed.
    pub source: PathBuf,
    /// Where it was going, if anywhere.
    pub destination: Option<PathBuf>,
    /// What went wrong.
    pub error: ItemError,
}

impl ErrorRecord {
    /// Message suitable for an error list.
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

impl std::fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.destination {
            Some(dst) => write!(
                f,
                "{} -> {}: {}",
                self.source.display(),
                dst.display(),
                self.error
            ),
            None => write!(f, "{}: {}", self.source.display(), self.error),
        }
    }
}

/// Append-only list of failures, written by the executing context and read
/// by anyone holding the `Arc`.
#[derive(Debug, Default)]
pub struct ErrorLedger {
    records: RwLock<Vec<ErrorRecord>>,
    give_up: AtomicBool,
}

impl ErrorLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Append a failure.
    pub fn record(&self, source: PathBuf, destination: Option<PathBuf>, error: ItemError) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ErrorRecord {
                source,
                destination,
                error,
            });
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of all records so far.
    pub fn snapshot(&self) -> Vec<ErrorRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Records appended after the first `offset` ones.
    ///
    /// Lets a poller render new failures incrementally.
    pub fn since(&self, offset: usize) -> Vec<ErrorRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .skip(offset)
            .cloned()
            .collect()
    }

    /// Note that the remaining items were abandoned.
    pub fn give_up(&self) {
        self.give_up.store(true, Ordering::Release);
    }

    pub fn gave_up(&self) -> bool {
        self.give_up.load(Ordering::Acquire)
    }
}
