//! Sort keys and the entry comparator shared by real and custom listings.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::entry::DirEntry;

/// Attribute a listing can be ordered by.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum SortKey {
    /// Byte-wise file name.
    Name,
    /// Case-insensitive file name.
    #[strum(serialize = "iname")]
    NameIgnoreCase,
    /// Extension, then name.
    Extension,
    /// Size in bytes.
    Size,
    /// Modification time.
    Modified,
    /// Directories before everything else.
    Kind,
}

/// A sort key with its direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    #[serde(default)]
    pub descending: bool,
}

impl SortSpec {
    pub fn ascending(key: SortKey) -> Self {
        Self {
            key,
            descending: false,
        }
    }

    pub fn descending(key: SortKey) -> Self {
        Self {
            key,
            descending: true,
        }
    }
}

impl From<SortKey> for SortSpec {
    fn from(key: SortKey) -> Self {
        Self::ascending(key)
    }
}

/// Compare two entries by a list of keys, most significant first.
///
/// Names are compared undecorated. Ties fall back to name and then to the
/// origin directory so that custom lists holding equal names from different
/// directories still have a stable order.
pub fn compare_entries(a: &DirEntry, b: &DirEntry, keys: &[SortSpec]) -> Ordering {
    keys.iter()
        .map(|spec| {
            let ord = compare_by(a, b, spec.key);
            if spec.descending { ord.reverse() } else { ord }
        })
        .find(|ord| ord.is_ne())
        .unwrap_or_else(|| {
            a.name
                .as_str()
                .cmp(b.name.as_str())
                .then_with(|| a.origin.cmp(&b.origin))
        })
}

/// Sort entries in place.
pub fn sort_entries(entries: &mut [DirEntry], keys: &[SortSpec]) {
    entries.sort_by(|a, b| compare_entries(a, b, keys));
}

fn compare_by(a: &DirEntry, b: &DirEntry, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.name.as_str().cmp(b.name.as_str()),
        SortKey::NameIgnoreCase => a
            .name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.as_str().cmp(b.name.as_str())),
        SortKey::Extension => a
            .extension()
            .cmp(b.extension())
            .then_with(|| a.name.as_str().cmp(b.name.as_str())),
        SortKey::Size => a.size.cmp(&b.size),
        SortKey::Modified => a.modified.cmp(&b.modified),
        SortKey::Kind => b.kind.is_dir().cmp(&a.kind.is_dir()),
    }
}
