//! Directory entry types shared by real and custom listings.

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Stable identity of a filesystem object (device + inode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InodeInfo {
    /// Inode number.
    pub inode: u64,
    /// Device ID.
    pub device: u64,
}

impl InodeInfo {
    /// Create new inode info.
    pub fn new(inode: u64, device: u64) -> Self {
        Self { inode, device }
    }

    /// Extract identity from metadata.
    ///
    /// Returns `None` on platforms without a stable inode primitive.
    #[cfg(unix)]
    pub fn from_metadata(metadata: &Metadata) -> Option<Self> {
        Some(Self::new(metadata.ino(), metadata.dev()))
    }

    #[cfg(not(unix))]
    pub fn from_metadata(_metadata: &Metadata) -> Option<Self> {
        None
    }
}

/// Type of a listed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// Regular file.
    File {
        /// Whether the file is executable.
        executable: bool,
    },
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink {
        /// Whether the link target is missing.
        broken: bool,
    },
    /// Sockets, devices, fifos.
    Other,
}

impl EntryKind {
    /// Classify an entry from its `lstat` metadata.
    pub fn from_metadata(path: &Path, metadata: &Metadata) -> Self {
        let file_type = metadata.file_type();
        if file_type.is_symlink() {
            EntryKind::Symlink {
                broken: std::fs::metadata(path).is_err(),
            }
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File {
                executable: is_executable(metadata),
            }
        } else {
            EntryKind::Other
        }
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::File { .. })
    }

    /// Check if this is a symlink.
    pub fn is_symlink(&self) -> bool {
        matches!(self, EntryKind::Symlink { .. })
    }
}

/// Suffixes appended to names when entries are displayed.
///
/// Decorations are presentation only and never take part in sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Decorations {
    /// Appended to directory names, usually `/`.
    #[serde(default)]
    pub dir_suffix: Option<char>,
    /// Appended to symbolic link names, usually `@`.
    #[serde(default)]
    pub link_suffix: Option<char>,
}

/// A single row of a directory listing.
///
/// `origin` is the directory the entry lives in. For a real listing it equals
/// the view's current directory; entries of a custom list each carry their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirEntry {
    /// File name (not full path).
    pub name: CompactString,
    /// Directory containing the entry.
    pub origin: PathBuf,
    /// Entry type.
    pub kind: EntryKind,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
    /// Identity, when the platform provides one.
    pub inode: Option<InodeInfo>,
    /// Whether the user marked the entry for an operation.
    pub marked: bool,
}

impl DirEntry {
    /// Stat `path` without following a final symlink and build an entry.
    ///
    /// Dangling links are returned as `EntryKind::Symlink { broken: true }`.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let metadata = std::fs::symlink_metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let origin = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));
        let kind = EntryKind::from_metadata(path, &metadata);

        Ok(Self {
            name: name.into(),
            origin,
            kind,
            size: if kind.is_dir() { 0 } else { metadata.len() },
            modified: metadata.modified().unwrap_or(std::time::UNIX_EPOCH),
            inode: InodeInfo::from_metadata(&metadata),
            marked: false,
        })
    }

    /// Full path of the entry.
    pub fn path(&self) -> PathBuf {
        self.origin.join(self.name.as_str())
    }

    /// Name with display decorations applied.
    pub fn decorated_name(&self, decorations: &Decorations) -> String {
        let suffix = match self.kind {
            EntryKind::Directory => decorations.dir_suffix,
            EntryKind::Symlink { .. } => decorations.link_suffix,
            _ => None,
        };
        match suffix {
            Some(c) => format!("{}{c}", self.name),
            None => self.name.to_string(),
        }
    }

    /// Extension used by the extension sort key (without the dot).
    pub fn extension(&self) -> &str {
        let name = self.name.as_str();
        match name.rfind('.') {
            Some(0) | None => "",
            Some(idx) => &name[idx + 1..],
        }
    }
}

#[cfg(unix)]
fn is_executable(metadata: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &Metadata) -> bool {
    false
}
