//! Core types and configuration for dirpilot.
//!
//! This crate provides the data structures shared by the operation engine,
//! the change watcher and the listing views: directory entries, sort keys,
//! configuration and the error taxonomy.

mod config;
mod entry;
mod error;
mod sort;

pub use config::{
    OpsConfig, OpsConfigBuilder, ViewConfig, ViewConfigBuilder, WatchConfig, WatchConfigBuilder,
};
pub use entry::{Decorations, DirEntry, EntryKind, InodeInfo};
pub use error::{ItemError, OpError, PlanningError, ViewError, WatchError};
pub use sort::{SortKey, SortSpec, compare_entries, sort_entries};
