//! Execution of single IO operations.

use std::cell::{Cell, RefCell};
use std::ffi::OsString;
use std::fs::{self, File, Metadata, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use dirpilot_core::{ItemError, OpError, OpsConfig};
use tracing::{debug, warn};

use crate::conflict::{ConflictStrategy, DestinationState, Resolution, removal_set, resolve};
use crate::estimate::path_totals;
use crate::operation::{IoArgs, IoOperation, IoOutcome};

type OpResult = Result<IoOutcome, OpError>;

/// Executes [`IoOperation`]s against the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct OperationExecutor {
    config: OpsConfig,
}

impl OperationExecutor {
    /// Create a new executor with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an executor with explicit settings.
    pub fn with_config(config: OpsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OpsConfig {
        &self.config
    }

    /// Execute one operation.
    ///
    /// Failures are returned and also appended to `args.ledger`. Failures of
    /// nested items inside a directory tree only go to the ledger and turn
    /// the outcome into [`IoOutcome::Partial`].
    pub fn execute(&self, args: &IoArgs) -> OpResult {
        let run = Run {
            args,
            config: &self.config,
            nested_failures: Cell::new(0),
            left_behind: RefCell::new(Vec::new()),
        };

        let result = match &args.operation {
            IoOperation::Copy {
                source,
                destination,
                strategy,
            } => run.copy(source, destination, *strategy),
            IoOperation::Move {
                source,
                destination,
                strategy,
            } => run.move_item(source, destination, *strategy),
            IoOperation::LinkRelative {
                target,
                destination,
                strategy,
            }
            | IoOperation::LinkAbsolute {
                target,
                destination,
                strategy,
            } => run.link(target, destination, *strategy),
            IoOperation::Remove { path } => run.remove(path),
            IoOperation::MakeDir {
                path,
                process_parents,
                mode,
            } => run.make_dir(path, *process_parents, *mode),
            IoOperation::Chmod {
                path,
                mode,
                recursive,
            } => run.chmod(path, *mode, *recursive),
            IoOperation::Chown { path, uid, gid } => run.chown(path, *uid, *gid),
        };

        match &result {
            Err(OpError::Item(err)) => {
                warn!(
                    kind = %args.operation.kind(),
                    source = %args.operation.source().display(),
                    error = %err,
                    "operation failed"
                );
                args.ledger.record(
                    args.operation.source().to_path_buf(),
                    args.operation.destination().map(Path::to_path_buf),
                    err.clone(),
                );
            }
            Err(OpError::Cancelled) => {
                debug!(source = %args.operation.source().display(), "operation cancelled");
            }
            Ok(_) => {}
        }
        result
    }
}

/// State of one `execute` call.
struct Run<'a> {
    args: &'a IoArgs,
    config: &'a OpsConfig,
    nested_failures: Cell<usize>,
    /// Source children that failed or were skipped. A move must not delete
    /// them.
    left_behind: RefCell<Vec<PathBuf>>,
}

impl Run<'_> {
    fn check_cancelled(&self) -> Result<(), OpError> {
        let cancelled = self.args.cancellable
            && self
                .args
                .estimate
                .as_ref()
                .is_some_and(|estimate| estimate.is_cancelled());
        if cancelled {
            Err(OpError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn add_bytes(&self, bytes: u64) {
        if let Some(estimate) = &self.args.estimate {
            estimate.add_bytes(bytes);
        }
    }

    fn complete_item(&self) {
        if let Some(estimate) = &self.args.estimate {
            estimate.complete_item();
        }
    }

    fn set_current(&self, path: &Path) {
        if let Some(estimate) = &self.args.estimate {
            estimate.set_current(Some(path.to_path_buf()));
        }
    }

    /// Overwrites under `ReplaceAll` are authorised by the strategy itself.
    fn confirmed(&self, strategy: ConflictStrategy, source: &Path, destination: &Path) -> bool {
        if strategy == ConflictStrategy::ReplaceAll {
            return true;
        }
        self.args
            .confirm
            .as_ref()
            .is_none_or(|confirm| confirm.confirm(source, destination))
    }

    /// Record a failure below the top-level item and keep going.
    fn nested_failure(&self, source: &Path, destination: Option<&Path>, error: ItemError) {
        warn!(source = %source.display(), error = %error, "nested item failed");
        self.args.ledger.record(
            source.to_path_buf(),
            destination.map(Path::to_path_buf),
            error,
        );
        self.nested_failures.set(self.nested_failures.get() + 1);
        self.leave_behind(source);
    }

    fn leave_behind(&self, source: &Path) {
        self.left_behind.borrow_mut().push(source.to_path_buf());
    }

    fn outcome(&self) -> IoOutcome {
        if self.nested_failures.get() > 0 {
            IoOutcome::Partial
        } else {
            IoOutcome::Done
        }
    }

    fn copy(&self, source: &Path, destination: &Path, strategy: ConflictStrategy) -> OpResult {
        self.check_cancelled()?;
        let metadata = lstat(source)?;
        let state = DestinationState::probe(destination);

        match resolve(strategy, metadata.is_dir(), state) {
            Resolution::Abort => Err(destination_exists(destination)),
            Resolution::Skip => Ok(IoOutcome::Skipped),
            Resolution::Overwrite => {
                if !self.confirmed(strategy, source, destination) {
                    return Ok(IoOutcome::Skipped);
                }
                self.overwrite(source, destination, &metadata, state, strategy)?;
                Ok(self.outcome())
            }
            Resolution::Append => {
                self.copy_file(source, destination, &metadata, true)?;
                Ok(self.outcome())
            }
            Resolution::Proceed => {
                self.copy_entry(source, destination, &metadata, strategy)?;
                Ok(self.outcome())
            }
        }
    }

    /// Replace an occupied destination with a copy of `source`.
    ///
    /// A regular file replacing a file is staged next to the destination and
    /// renamed over it, so a failed copy leaves the old version in place.
    fn overwrite(
        &self,
        source: &Path,
        destination: &Path,
        metadata: &Metadata,
        state: DestinationState,
        strategy: ConflictStrategy,
    ) -> Result<(), OpError> {
        if metadata.is_file() && state == DestinationState::File {
            return self.replace_file(source, destination, metadata);
        }
        remove_path(destination)?;
        self.copy_entry(source, destination, metadata, strategy)
    }

    fn replace_file(
        &self,
        source: &Path,
        destination: &Path,
        metadata: &Metadata,
    ) -> Result<(), OpError> {
        let staging = staging_path(destination);
        if let Err(err) = self.copy_file(source, &staging, metadata, false) {
            let _ = fs::remove_file(&staging);
            return Err(err);
        }
        fs::rename(&staging, destination).map_err(|e| {
            let _ = fs::remove_file(&staging);
            OpError::from(ItemError::io(destination, e))
        })
    }

    /// Copy one entry whose destination is free or is a directory to merge
    /// into.
    fn copy_entry(
        &self,
        source: &Path,
        destination: &Path,
        metadata: &Metadata,
        strategy: ConflictStrategy,
    ) -> Result<(), OpError> {
        let file_type = metadata.file_type();
        if file_type.is_symlink() {
            let target = fs::read_link(source).map_err(|e| ItemError::io(source, e))?;
            create_symlink(&target, destination)?;
            self.complete_item();
            Ok(())
        } else if file_type.is_dir() {
            self.copy_dir(source, destination, metadata, strategy)
        } else if file_type.is_file() {
            self.copy_file(source, destination, metadata, false)
        } else {
            Err(ItemError::Unsupported {
                path: source.to_path_buf(),
            }
            .into())
        }
    }

    fn copy_dir(
        &self,
        source: &Path,
        destination: &Path,
        metadata: &Metadata,
        strategy: ConflictStrategy,
    ) -> Result<(), OpError> {
        let merging = DestinationState::probe(destination) == DestinationState::Directory;
        if !merging {
            fs::create_dir(destination).map_err(|e| ItemError::io(destination, e))?;
        }

        let source_names = match self.copy_children(source, destination, strategy) {
            Ok(names) => names,
            Err(err) => {
                // A tree this call created is rolled back; a merge target
                // keeps what it had.
                if !merging {
                    let _ = fs::remove_dir_all(destination);
                }
                return Err(err);
            }
        };

        if merging && strategy == ConflictStrategy::ReplaceAll {
            self.remove_excess(destination, source_names);
        }

        self.preserve_metadata(destination, metadata);
        self.complete_item();
        Ok(())
    }

    /// Copy every child of `source`, returning the names seen.
    fn copy_children(
        &self,
        source: &Path,
        destination: &Path,
        strategy: ConflictStrategy,
    ) -> Result<Vec<OsString>, OpError> {
        let entries = fs::read_dir(source).map_err(|e| ItemError::io(source, e))?;
        let mut source_names = Vec::new();
        for entry in entries {
            self.check_cancelled()?;
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.nested_failure(source, None, ItemError::io(source, e));
                    continue;
                }
            };
            let name = entry.file_name();
            let child_source = entry.path();
            let child_destination = destination.join(&name);
            source_names.push(name);

            self.set_current(&child_source);
            match self.copy_child(&child_source, &child_destination, strategy) {
                Ok(()) => {}
                Err(OpError::Cancelled) => return Err(OpError::Cancelled),
                Err(OpError::Item(err)) => {
                    self.nested_failure(&child_source, Some(&child_destination), err);
                }
            }
        }
        Ok(source_names)
    }

    /// Resolve and copy one child of a directory being copied.
    fn copy_child(
        &self,
        source: &Path,
        destination: &Path,
        strategy: ConflictStrategy,
    ) -> Result<(), OpError> {
        let metadata = lstat(source)?;
        let state = DestinationState::probe(destination);
        match resolve(strategy, metadata.is_dir(), state) {
            Resolution::Abort => Err(destination_exists(destination)),
            Resolution::Skip => {
                self.leave_behind(source);
                Ok(())
            }
            Resolution::Overwrite => {
                if self.confirmed(strategy, source, destination) {
                    self.overwrite(source, destination, &metadata, state, strategy)
                } else {
                    self.leave_behind(source);
                    Ok(())
                }
            }
            Resolution::Append => self.copy_file(source, destination, &metadata, true),
            Resolution::Proceed => self.copy_entry(source, destination, &metadata, strategy),
        }
    }

    fn remove_excess(&self, destination: &Path, source_names: Vec<std::ffi::OsString>) {
        let existing = match fs::read_dir(destination) {
            Ok(entries) => entries.flatten().map(|e| e.file_name()).collect::<Vec<_>>(),
            Err(e) => {
                self.nested_failure(destination, None, ItemError::io(destination, e));
                return;
            }
        };
        for name in removal_set(existing, source_names) {
            let path = destination.join(&name);
            debug!(path = %path.display(), "removing item absent from source");
            if let Err(err) = remove_path(&path) {
                self.nested_failure(&path, None, err);
            }
        }
    }

    /// Stream a regular file in `chunk_size` blocks.
    ///
    /// A cancelled partial file is removed, unless it was being appended to.
    fn copy_file(
        &self,
        source: &Path,
        destination: &Path,
        metadata: &Metadata,
        append: bool,
    ) -> Result<(), OpError> {
        let mut reader = File::open(source).map_err(|e| ItemError::io(source, e))?;

        let mut writer = if append {
            let writer = OpenOptions::new()
                .append(true)
                .open(destination)
                .map_err(|e| ItemError::io(destination, e))?;
            let offset = writer
                .metadata()
                .map_err(|e| ItemError::io(destination, e))?
                .len();
            self.add_bytes(offset.min(metadata.len()));
            if offset >= metadata.len() {
                self.complete_item();
                return Ok(());
            }
            reader
                .seek(SeekFrom::Start(offset))
                .map_err(|e| ItemError::io(source, e))?;
            writer
        } else {
            File::create(destination).map_err(|e| ItemError::io(destination, e))?
        };

        // A zero chunk would read nothing and end the copy at once.
        let mut buf = vec![0u8; self.config.chunk_size.max(1)];
        loop {
            if let Err(cancelled) = self.check_cancelled() {
                drop(writer);
                if !append {
                    let _ = fs::remove_file(destination);
                }
                return Err(cancelled);
            }
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ItemError::io(source, e).into()),
            };
            writer
                .write_all(&buf[..n])
                .map_err(|e| ItemError::io(destination, e))?;
            self.add_bytes(n as u64);
        }
        writer.flush().map_err(|e| ItemError::io(destination, e))?;

        if self.config.preserve_timestamps {
            if let Ok(modified) = metadata.modified() {
                let _ = writer.set_modified(modified);
            }
        }
        drop(writer);
        if self.config.preserve_permissions {
            let _ = fs::set_permissions(destination, metadata.permissions());
        }

        self.complete_item();
        Ok(())
    }

    /// Best effort: a destination that refuses new times or bits is still a
    /// successful copy.
    fn preserve_metadata(&self, destination: &Path, metadata: &Metadata) {
        if self.config.preserve_timestamps {
            if let Ok(modified) = metadata.modified() {
                let _ = File::open(destination).and_then(|f| f.set_modified(modified));
            }
        }
        if self.config.preserve_permissions {
            let _ = fs::set_permissions(destination, metadata.permissions());
        }
    }

    fn move_item(&self, source: &Path, destination: &Path, strategy: ConflictStrategy) -> OpResult {
        self.check_cancelled()?;
        let metadata = lstat(source)?;
        let state = DestinationState::probe(destination);

        match resolve(strategy, metadata.is_dir(), state) {
            Resolution::Abort => Err(destination_exists(destination)),
            Resolution::Skip => Ok(IoOutcome::Skipped),
            Resolution::Overwrite => {
                if !self.confirmed(strategy, source, destination) {
                    return Ok(IoOutcome::Skipped);
                }
                // rename replaces a file atomically
                if metadata.is_dir() || state == DestinationState::Directory {
                    remove_path(destination)?;
                }
                self.rename_or_copy(source, destination, &metadata, strategy)
            }
            Resolution::Append => {
                self.copy_file(source, destination, &metadata, true)?;
                remove_path(source)?;
                Ok(IoOutcome::Done)
            }
            Resolution::Proceed if state == DestinationState::Directory => {
                // Directory onto directory: merge, then drop what made it.
                self.copy_dir(source, destination, &metadata, strategy)?;
                self.finish_move(source)
            }
            Resolution::Proceed => self.rename_or_copy(source, destination, &metadata, strategy),
        }
    }

    /// Rename, falling back to copy + remove across filesystems.
    fn rename_or_copy(
        &self,
        source: &Path,
        destination: &Path,
        metadata: &Metadata,
        strategy: ConflictStrategy,
    ) -> OpResult {
        let totals_before = self.args.estimate.as_ref().map(|_| path_totals(source));
        match fs::rename(source, destination) {
            Ok(()) => {
                if let (Some(estimate), Some(totals)) = (&self.args.estimate, totals_before) {
                    estimate.advance(totals.items, totals.bytes);
                }
                Ok(IoOutcome::Done)
            }
            Err(e) if e.kind() == ErrorKind::CrossesDevices => {
                debug!(source = %source.display(), "cross-device move, copying");
                let state = DestinationState::probe(destination);
                if metadata.is_file() && state == DestinationState::File {
                    self.replace_file(source, destination, metadata)?;
                } else {
                    self.copy_entry(source, destination, metadata, strategy)?;
                }
                self.finish_move(source)
            }
            Err(e) => Err(ItemError::io(source, e).into()),
        }
    }

    /// Remove the source of a copied move.
    ///
    /// Children that were skipped or failed stay, together with the
    /// directories leading to them, and the item is `Partial`.
    fn finish_move(&self, source: &Path) -> OpResult {
        if self.left_behind.borrow().is_empty() {
            remove_path(source)?;
            return Ok(IoOutcome::Done);
        }
        debug!(
            source = %source.display(),
            kept = self.left_behind.borrow().len(),
            "leaving untransferred children at the source"
        );
        self.prune_transferred(source)?;
        Ok(IoOutcome::Partial)
    }

    fn prune_transferred(&self, path: &Path) -> Result<(), ItemError> {
        let (keep, holds_kept) = {
            let kept = self.left_behind.borrow();
            (
                kept.iter().any(|k| k == path),
                kept.iter().any(|k| k.starts_with(path)),
            )
        };
        if keep {
            return Ok(());
        }
        if !holds_kept {
            return remove_path(path);
        }
        for entry in fs::read_dir(path).map_err(|e| ItemError::io(path, e))? {
            let entry = entry.map_err(|e| ItemError::io(path, e))?;
            self.prune_transferred(&entry.path())?;
        }
        Ok(())
    }

    fn link(&self, target: &Path, destination: &Path, strategy: ConflictStrategy) -> OpResult {
        self.check_cancelled()?;
        let state = DestinationState::probe(destination);

        match resolve(strategy, false, state) {
            Resolution::Abort => return Err(destination_exists(destination)),
            Resolution::Skip | Resolution::Append => return Ok(IoOutcome::Skipped),
            Resolution::Overwrite => {
                if !self.confirmed(strategy, target, destination) {
                    return Ok(IoOutcome::Skipped);
                }
                remove_path(destination)?;
            }
            Resolution::Proceed => {}
        }

        create_symlink(target, destination)?;
        self.complete_item();
        Ok(IoOutcome::Done)
    }

    fn remove(&self, path: &Path) -> OpResult {
        self.check_cancelled()?;
        lstat(path)?;
        let totals = path_totals(path);

        if self.config.use_trash {
            trash::delete(path).map_err(|e| ItemError::Io {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        } else {
            remove_path(path)?;
        }

        if let Some(estimate) = &self.args.estimate {
            estimate.advance(totals.items, totals.bytes);
        }
        Ok(IoOutcome::Done)
    }

    fn make_dir(&self, path: &Path, process_parents: bool, mode: u32) -> OpResult {
        self.check_cancelled()?;
        let mut builder = fs::DirBuilder::new();
        builder.recursive(process_parents);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;

        builder.create(path).map_err(|e| ItemError::io(path, e))?;
        self.complete_item();
        Ok(IoOutcome::Done)
    }

    fn chmod(&self, path: &Path, mode: u32, recursive: bool) -> OpResult {
        self.check_cancelled()?;
        let metadata = lstat(path)?;

        // Children first, so a mode without search permission on the parent
        // does not lock us out of the subtree.
        if recursive && metadata.is_dir() {
            let entries = fs::read_dir(path).map_err(|e| ItemError::io(path, e))?;
            for entry in entries.flatten() {
                match self.chmod(&entry.path(), mode, true) {
                    Ok(_) => {}
                    Err(OpError::Cancelled) => return Err(OpError::Cancelled),
                    Err(OpError::Item(err)) => self.nested_failure(&entry.path(), None, err),
                }
            }
        }

        set_mode(path, mode)?;
        self.complete_item();
        Ok(self.outcome())
    }

    fn chown(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> OpResult {
        self.check_cancelled()?;
        change_owner(path, uid, gid)?;
        self.complete_item();
        Ok(IoOutcome::Done)
    }
}

fn lstat(path: &Path) -> Result<Metadata, ItemError> {
    fs::symlink_metadata(path).map_err(|e| ItemError::io(path, e))
}

fn destination_exists(destination: &Path) -> OpError {
    ItemError::DestinationExists {
        path: destination.to_path_buf(),
    }
    .into()
}

/// Hidden sibling a replacement is written to before it takes the
/// destination's place.
fn staging_path(destination: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(destination.file_name().unwrap_or_default());
    name.push(".dirpilot-part");
    destination.with_file_name(name)
}

/// Remove a file, link or whole directory tree without following links.
fn remove_path(path: &Path) -> Result<(), ItemError> {
    let metadata = lstat(path)?;
    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| ItemError::io(path, e))
}

#[cfg(unix)]
fn create_symlink(target: &Path, destination: &Path) -> Result<(), ItemError> {
    std::os::unix::fs::symlink(target, destination).map_err(|e| ItemError::io(destination, e))
}

#[cfg(windows)]
fn create_symlink(target: &Path, destination: &Path) -> Result<(), ItemError> {
    let resolved: std::path::PathBuf = match destination.parent() {
        Some(parent) => parent.join(target),
        None => target.to_path_buf(),
    };
    let result = if resolved.is_dir() {
        std::os::windows::fs::symlink_dir(target, destination)
    } else {
        std::os::windows::fs::symlink_file(target, destination)
    };
    result.map_err(|e| ItemError::io(destination, e))
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(_target: &Path, destination: &Path) -> Result<(), ItemError> {
    Err(ItemError::Unsupported {
        path: destination.to_path_buf(),
    })
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), ItemError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| ItemError::io(path, e))
}

#[cfg(not(unix))]
fn set_mode(path: &Path, _mode: u32) -> Result<(), ItemError> {
    Err(ItemError::Unsupported {
        path: path.to_path_buf(),
    })
}

#[cfg(unix)]
fn change_owner(path: &Path, uid: Option<u32>, gid: Option<u32>) -> Result<(), ItemError> {
    std::os::unix::fs::lchown(path, uid, gid).map_err(|e| ItemError::io(path, e))
}

#[cfg(not(unix))]
fn change_owner(path: &Path, _uid: Option<u32>, _gid: Option<u32>) -> Result<(), ItemError> {
    Err(ItemError::Unsupported {
        path: path.to_path_buf(),
    })
}
