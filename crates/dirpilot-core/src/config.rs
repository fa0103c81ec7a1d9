//! Configuration types for operations, watchers and views.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::entry::Decorations;
use crate::sort::{SortKey, SortSpec};

/// Configuration for IO operations.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct OpsConfig {
    /// Size of a single read/write block when copying file contents.
    #[builder(default = "64 * 1024")]
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Copy modification times onto the destination.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub preserve_timestamps: bool,

    /// Copy permission bits onto the destination.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub preserve_permissions: bool,

    /// Move removed items to the trash instead of unlinking them.
    #[builder(default = "false")]
    #[serde(default)]
    pub use_trash: bool,
}

fn default_true() -> bool {
    true
}

fn default_chunk_size() -> usize {
    64 * 1024
}

impl OpsConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.chunk_size == Some(0) {
            return Err("Chunk size must be positive".to_string());
        }
        Ok(())
    }
}

impl OpsConfig {
    /// Create a new ops config builder.
    pub fn builder() -> OpsConfigBuilder {
        OpsConfigBuilder::default()
    }
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            preserve_timestamps: true,
            preserve_permissions: true,
            use_trash: false,
        }
    }
}

/// Configuration for filesystem watchers.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct WatchConfig {
    /// Number of consecutive identity-preserving bursts tolerated before the
    /// watcher stops reporting them.
    ///
    /// A burst is what one `changed()` call drains. Ten consecutive
    /// metadata-only redraws is well past anything interactive use produces,
    /// while a process flipping permissions in a loop hits it in well under a
    /// second.
    ///
    /// Content writes keep an entry's identity too, so a file appended to in
    /// a loop is suppressed the same way. Suppression ends at the next
    /// create, remove or rename.
    #[builder(default = "10")]
    #[serde(default = "default_ban_threshold")]
    pub ban_threshold: u32,
}

fn default_ban_threshold() -> u32 {
    10
}

impl WatchConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.ban_threshold == Some(0) {
            return Err("Ban threshold must be positive".to_string());
        }
        Ok(())
    }
}

impl WatchConfig {
    /// Create a new watch config builder.
    pub fn builder() -> WatchConfigBuilder {
        WatchConfigBuilder::default()
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            ban_threshold: default_ban_threshold(),
        }
    }
}

/// Configuration for listing views.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into))]
pub struct ViewConfig {
    /// Display decorations.
    #[builder(default)]
    #[serde(default)]
    pub decorations: Decorations,

    /// Initial sort keys, most significant first.
    #[builder(default = "vec![SortSpec::ascending(SortKey::Name)]")]
    #[serde(default = "default_sort")]
    pub sort: Vec<SortSpec>,
}

fn default_sort() -> Vec<SortSpec> {
    vec![SortSpec::ascending(SortKey::Name)]
}

impl ViewConfig {
    /// Create a new view config builder.
    pub fn builder() -> ViewConfigBuilder {
        ViewConfigBuilder::default()
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            decorations: Decorations::default(),
            sort: default_sort(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ops_config_builder() {
        let config = OpsConfig::builder()
            .chunk_size(4096usize)
            .use_trash(true)
            .build()
            .unwrap();

        assert_eq!(config.chunk_size, 4096);
        assert!(config.use_trash);
        assert!(config.preserve_timestamps);
    }

    #[test]
    fn test_ops_config_rejects_zero_chunk() {
        assert!(OpsConfig::builder().chunk_size(0usize).build().is_err());
    }

    #[test]
    fn test_watch_config_default() {
        let config = WatchConfig::default();
        assert_eq!(config.ban_threshold, 10);
        assert!(WatchConfig::builder().ban_threshold(0u32).build().is_err());
    }

    #[test]
    fn test_view_config_builder() {
        let config = ViewConfig::builder()
            .decorations(Decorations {
                dir_suffix: Some('/'),
                link_suffix: None,
            })
            .build()
            .unwrap();

        assert_eq!(config.decorations.dir_suffix, Some('/'));
        assert_eq!(config.sort, vec![SortSpec::ascending(SortKey::Name)]);
    }
}
