//! Directory change watcher for dirpilot.
//!
//! An [`FsWatcher`] turns the native notifications for one directory into a
//! polled yes/no "changed since last check" answer. Bursts that only touch
//! metadata of entries whose identity is unchanged are counted, and once too
//! many arrive in a row they stop being reported until something is created,
//! removed or replaced.

mod identity;
mod watcher;

pub use identity::{IdentitySource, InodeIdentity, NoIdentity, Probe, platform_identity};
pub use watcher::{FsWatcher, WatchState};
