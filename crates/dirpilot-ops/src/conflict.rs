//! Conflict detection and resolution for file operations.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// What to do when a destination already exists.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "kebab-case")]
pub enum ConflictStrategy {
    /// Abort if the destination exists.
    #[default]
    Fail,
    /// Replace existing items and remove destination items the source lacks.
    ReplaceAll,
    /// Overwrite existing files, merge into existing directories.
    ReplaceFiles,
    /// Continue an interrupted operation by appending the rest of each file.
    AppendToFiles,
}

/// What currently occupies a destination path.
///
/// Symbolic links are not followed and count as files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DestinationState {
    Absent,
    File,
    Directory,
}

impl DestinationState {
    /// Inspect `path` without following a final symlink.
    pub fn probe(path: &Path) -> Self {
        match std::fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => Self::Directory,
            Ok(_) => Self::File,
            Err(_) => Self::Absent,
        }
    }

    pub fn exists(&self) -> bool {
        !matches!(self, Self::Absent)
    }
}

/// Per-item decision of the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// Nothing in the way, or a directory to merge into.
    Proceed,
    /// Remove the destination, then write.
    Overwrite,
    /// Leave the destination alone.
    Skip,
    /// Append the remaining source bytes to the destination file.
    Append,
    /// Fail this item and stop the batch.
    Abort,
}

/// Decide how to treat one destination.
///
/// `Proceed` over an existing directory means "merge into it". Removing the
/// destination children a `ReplaceAll` merge leaves behind is decided
/// separately by [`removal_set`].
pub fn resolve(
    strategy: ConflictStrategy,
    source_is_dir: bool,
    destination: DestinationState,
) -> Resolution {
    use ConflictStrategy::*;
    use DestinationState::*;

    match (strategy, source_is_dir, destination) {
        (_, _, Absent) => Resolution::Proceed,
        (Fail, _, _) => Resolution::Abort,

        (ReplaceAll, true, Directory) => Resolution::Proceed,
        (ReplaceAll, _, _) => Resolution::Overwrite,

        (ReplaceFiles, true, Directory) => Resolution::Proceed,
        (ReplaceFiles, false, Directory) => Resolution::Skip,
        (ReplaceFiles, _, File) => Resolution::Overwrite,

        (AppendToFiles, true, Directory) => Resolution::Proceed,
        (AppendToFiles, false, File) => Resolution::Append,
        (AppendToFiles, _, _) => Resolution::Skip,
    }
}

/// Destination children without a counterpart among the source children.
///
/// Order follows `destination_children`.
pub fn removal_set<D, S>(destination_children: D, source_children: S) -> Vec<OsString>
where
    D: IntoIterator<Item = OsString>,
    S: IntoIterator<Item = OsString>,
{
    let keep: HashSet<OsString> = source_children.into_iter().collect();
    destination_children
        .into_iter()
        .filter(|name| !keep.contains(name))
        .collect()
}
