//! Per-directory change watcher.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};

use dirpilot_core::{InodeInfo, WatchConfig, WatchError};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, trace, warn};

use crate::identity::{IdentitySource, Probe, platform_identity};

/// Observable state of a watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// No metadata-only bursts since the last structural change.
    Idle,
    /// Counting consecutive metadata-only bursts.
    Accumulating,
    /// Metadata-only bursts are no longer reported.
    Suppressed,
}

/// What one `changed()` call drained.
#[derive(Debug, Default)]
struct Burst {
    any: bool,
    structural: bool,
    error: bool,
}

/// Watches the direct children of one directory.
///
/// Native notifications are buffered by a background thread owned by
/// `notify`; [`FsWatcher::changed`] only drains what is already there.
pub struct FsWatcher {
    path: PathBuf,
    config: WatchConfig,
    // Dropping the native watcher stops delivery.
    _native: RecommendedWatcher,
    events: Receiver<notify::Result<Event>>,
    identity: Box<dyn IdentitySource>,
    root: Probe,
    known: HashMap<PathBuf, InodeInfo>,
    uneventful: u32,
    suppressed: bool,
    broken: bool,
}

impl FsWatcher {
    /// Start watching `path` with the platform's identity source.
    pub fn new(path: impl Into<PathBuf>, config: WatchConfig) -> Result<Self, WatchError> {
        Self::with_identity(path, config, platform_identity())
    }

    /// Start watching `path` with an explicit identity source.
    pub fn with_identity(
        path: impl Into<PathBuf>,
        config: WatchConfig,
        identity: Box<dyn IdentitySource>,
    ) -> Result<Self, WatchError> {
        let path = path.into();
        let root = identity.probe(&path);
        if root == Probe::Absent {
            return Err(WatchError::WatchPath {
                path,
                message: "directory does not exist".to_string(),
            });
        }

        let (tx, rx) = mpsc::channel();
        let mut native = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })
        .map_err(|e| WatchError::Create {
            message: e.to_string(),
        })?;
        native
            .watch(&path, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::WatchPath {
                path: path.clone(),
                message: e.to_string(),
            })?;

        debug!(path = %path.display(), "watcher created");
        Ok(Self {
            path,
            config,
            _native: native,
            events: rx,
            identity,
            root,
            known: HashMap::new(),
            uneventful: 0,
            suppressed: false,
            broken: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> WatchState {
        if self.suppressed {
            WatchState::Suppressed
        } else if self.uneventful > 0 {
            WatchState::Accumulating
        } else {
            WatchState::Idle
        }
    }

    /// Drain pending notifications.
    ///
    /// Returns `(changed, error)`. `changed` is true at most once per burst
    /// of notifications. `error` reports that the watch itself became
    /// invalid; the caller should recreate the watcher.
    pub fn changed(&mut self) -> (bool, bool) {
        let mut burst = Burst::default();
        loop {
            match self.events.try_recv() {
                Ok(Ok(event)) => self.absorb(event, &mut burst),
                Ok(Err(e)) => {
                    warn!(path = %self.path.display(), "watch error: {e}");
                    burst.error = true;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    burst.error = true;
                    break;
                }
            }
        }
        if burst.error {
            self.broken = true;
        }
        let error = self.broken;

        if !burst.any {
            return (false, error);
        }
        if burst.structural {
            if self.suppressed {
                debug!(path = %self.path.display(), "structural change, lifting suppression");
            }
            self.suppressed = false;
            self.uneventful = 0;
            return (true, error);
        }

        self.uneventful = self.uneventful.saturating_add(1);
        if self.uneventful > self.config.ban_threshold && !self.suppressed {
            debug!(
                path = %self.path.display(),
                bursts = self.uneventful,
                "suppressing metadata-only changes"
            );
            self.suppressed = true;
        }
        (!self.suppressed, error)
    }

    fn absorb(&mut self, event: Event, burst: &mut Burst) {
        trace!(?event, "native event");
        let structural_kind = match event.kind {
            EventKind::Access(_) => return,
            EventKind::Modify(ModifyKind::Name(_)) => true,
            // Data and metadata alike keep the entry's identity.
            EventKind::Modify(_) => false,
            _ => true,
        };

        if event.paths.is_empty() {
            burst.any = true;
            burst.structural = true;
            return;
        }

        for path in &event.paths {
            if *path == self.path {
                if self.root_changed() {
                    burst.error = true;
                } else {
                    burst.any = true;
                }
                continue;
            }

            burst.any = true;
            if structural_kind {
                burst.structural = true;
            }
            match self.identity.probe(path) {
                Probe::Present(info) => {
                    if let Some(previous) = self.known.insert(path.clone(), info) {
                        if previous != info {
                            burst.structural = true;
                        }
                    }
                }
                Probe::Absent => {
                    self.known.remove(path);
                    burst.structural = true;
                }
                Probe::Unsupported => burst.structural = true,
            }
        }
    }

    /// The watched directory was removed or replaced.
    fn root_changed(&self) -> bool {
        match self.identity.probe(&self.path) {
            Probe::Absent => true,
            current @ Probe::Present(_) => current != self.root,
            Probe::Unsupported => false,
        }
    }
}

impl std::fmt::Debug for FsWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsWatcher")
            .field("path", &self.path)
            .field("state", &self.state())
            .field("uneventful", &self.uneventful)
            .field("broken", &self.broken)
            .finish()
    }
}

impl Drop for FsWatcher {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "watcher freed");
    }
}
