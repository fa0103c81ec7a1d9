//! Stable identity of filesystem entries.

use std::path::Path;

use dirpilot_core::InodeInfo;

/// Result of looking up one path's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Present(InodeInfo),
    Absent,
    /// The platform offers no stable identity token.
    Unsupported,
}

/// Source of identity fingerprints.
///
/// A source that answers [`Probe::Unsupported`] makes every notification
/// count as structural, which disables suppression.
pub trait IdentitySource: Send + Sync {
    fn probe(&self, path: &Path) -> Probe;
}

/// Device and inode pair, without following a final symlink.
#[derive(Debug, Clone, Copy, Default)]
pub struct InodeIdentity;

impl IdentitySource for InodeIdentity {
    fn probe(&self, path: &Path) -> Probe {
        match std::fs::symlink_metadata(path) {
            Ok(metadata) => match InodeInfo::from_metadata(&metadata) {
                Some(info) => Probe::Present(info),
                None => Probe::Unsupported,
            },
            Err(_) => Probe::Absent,
        }
    }
}

/// Identity source for platforms without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIdentity;

impl IdentitySource for NoIdentity {
    fn probe(&self, _path: &Path) -> Probe {
        Probe::Unsupported
    }
}

/// Best identity source available on this platform.
pub fn platform_identity() -> Box<dyn IdentitySource> {
    if cfg!(unix) {
        Box::new(InodeIdentity)
    } else {
        Box::new(NoIdentity)
    }
}
