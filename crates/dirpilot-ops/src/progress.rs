//! Shared progress estimate for a running operation.
//!
//! One context performs the work and updates the counters; another polls
//! [`ProgressEstimate::snapshot`] and may request cancellation. Counters are
//! atomics, so neither side ever waits on the other.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use humansize::{DECIMAL, format_size};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Mutable counters of one operation plus its cancellation flag.
#[derive(Debug, Default)]
pub struct ProgressEstimate {
    total_items: AtomicU64,
    items_done: AtomicU64,
    total_bytes: AtomicU64,
    bytes_done: AtomicU64,
    current_item: Mutex<Option<PathBuf>>,
    cancel: CancellationToken,
}

impl ProgressEstimate {
    /// Create an empty estimate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an estimate ready to be shared between contexts.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Add planned work.
    pub fn add_totals(&self, items: u64, bytes: u64) {
        self.total_items.fetch_add(items, Ordering::Relaxed);
        self.total_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record copied bytes of the item in progress.
    pub fn add_bytes(&self, bytes: u64) {
        let done = self.bytes_done.fetch_add(bytes, Ordering::Relaxed) + bytes;
        self.total_bytes.fetch_max(done, Ordering::Relaxed);
    }

    /// Mark one item as finished.
    pub fn complete_item(&self) {
        self.advance(1, 0);
    }

    /// Mark several items and their bytes as finished at once.
    ///
    /// Used when a whole subtree is handled by one call, such as a rename.
    pub fn advance(&self, items: u64, bytes: u64) {
        let done = self.items_done.fetch_add(items, Ordering::Relaxed) + items;
        self.total_items.fetch_max(done, Ordering::Relaxed);
        if bytes > 0 {
            self.add_bytes(bytes);
        }
    }

    /// Update the item in progress.
    pub fn set_current(&self, path: Option<PathBuf>) {
        *self
            .current_item
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = path;
    }

    /// Request cancellation. The request cannot be withdrawn.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token observing this estimate's cancellation flag.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Consistent-enough copy of the counters for display.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let items_done = self.items_done.load(Ordering::Relaxed);
        let bytes_done = self.bytes_done.load(Ordering::Relaxed);
        ProgressSnapshot {
            total_items: self.total_items.load(Ordering::Relaxed).max(items_done),
            items_done,
            total_bytes: self.total_bytes.load(Ordering::Relaxed).max(bytes_done),
            bytes_done,
            current_item: self
                .current_item
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            cancelled: self.is_cancelled(),
        }
    }
}

/// Point-in-time view of a [`ProgressEstimate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub total_items: u64,
    pub items_done: u64,
    pub total_bytes: u64,
    pub bytes_done: u64,
    pub current_item: Option<PathBuf>,
    pub cancelled: bool,
}

impl ProgressSnapshot {
    /// Get the progress as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        if self.total_bytes > 0 {
            (self.bytes_done as f64 / self.total_bytes as f64) * 100.0
        } else if self.total_items > 0 {
            (self.items_done as f64 / self.total_items as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Human-readable one-line summary.
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{}/{} items, {} of {}",
            self.items_done,
            self.total_items,
            format_size(self.bytes_done, DECIMAL),
            format_size(self.total_bytes, DECIMAL)
        );
        if self.cancelled {
            line.push_str(" (cancelling)");
        }
        line
    }
}
