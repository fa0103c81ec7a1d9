//! Pre-flight size estimation.

use std::ops::Add;
use std::path::{Path, PathBuf};

use jwalk::{Parallelism, WalkDir};
use rayon::prelude::*;

/// Item and byte counts of a set of paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    /// Files, links and directories, each counted once.
    pub items: u64,
    /// Bytes of regular files.
    pub bytes: u64,
}

impl Add for Totals {
    type Output = Totals;

    fn add(self, other: Totals) -> Totals {
        Totals {
            items: self.items + other.items,
            bytes: self.bytes + other.bytes,
        }
    }
}

/// Count everything under `path` without following links.
///
/// A missing path counts as nothing.
pub fn path_totals(path: &Path) -> Totals {
    let Ok(metadata) = std::fs::symlink_metadata(path) else {
        return Totals::default();
    };
    if !metadata.is_dir() {
        return Totals {
            items: 1,
            bytes: if metadata.is_file() { metadata.len() } else { 0 },
        };
    }

    // Serial: callers already fan out over sources on the rayon pool.
    WalkDir::new(path)
        .parallelism(Parallelism::Serial)
        .skip_hidden(false)
        .follow_links(false)
        .into_iter()
        .flatten()
        .fold(Totals::default(), |acc, entry| {
            let bytes = if entry.file_type().is_file() {
                entry.metadata().map(|m| m.len()).unwrap_or(0)
            } else {
                0
            };
            acc + Totals { items: 1, bytes }
        })
}

/// Count several sources in parallel.
pub fn batch_totals(paths: &[PathBuf]) -> Totals {
    paths
        .par_iter()
        .map(|path| path_totals(path))
        .reduce(Totals::default, Add::add)
}
