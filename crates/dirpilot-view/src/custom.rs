//! Ad-hoc lists of entries shown in place of a real directory.

use std::path::{Path, PathBuf};

use indexmap::IndexSet;

use crate::view::absolute_path;

/// A custom list being assembled between `start` and `finish`.
#[derive(Debug, Clone, Default)]
pub(crate) struct PendingCustomList {
    pub(crate) title: String,
    pub(crate) orig_dir: PathBuf,
    pub(crate) paths: IndexSet<PathBuf>,
}

impl PendingCustomList {
    pub(crate) fn new(title: impl Into<String>, orig_dir: PathBuf) -> Self {
        Self {
            title: title.into(),
            orig_dir,
            paths: IndexSet::new(),
        }
    }

    /// Insert `path` made absolute. Returns `false` for a duplicate.
    pub(crate) fn add(&mut self, path: &Path) -> bool {
        self.paths.insert(absolute_path(path.to_path_buf()))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// A custom list installed as a view's listing.
#[derive(Debug, Clone)]
pub struct CustomList {
    pub title: String,
    /// Directory the view showed when the list was started.
    pub orig_dir: PathBuf,
    /// Every path of the list, filtered out or not, in insertion order.
    pub paths: IndexSet<PathBuf>,
    /// Entries keep insertion order instead of the view's sort.
    pub unsorted: bool,
}

impl CustomList {
    pub(crate) fn from_pending(pending: PendingCustomList, unsorted: bool) -> Self {
        Self {
            title: pending.title,
            orig_dir: pending.orig_dir,
            paths: pending.paths,
            unsorted,
        }
    }

    /// Forget a path, e.g. after the item was moved away.
    pub fn remove(&mut self, path: &Path) -> bool {
        self.paths.shift_remove(path)
    }
}
