//! Configuration module for Watchlink.
//!
//! Provides the typed configuration struct that maps to the YAML link
//! file, with loading, saving, validation, and the shared handle the
//! runtime components read through.
//!
//! All mutation goes through [`SyncConfig::add_link`] and
//! [`SyncConfig::remove_link`], which enforce the graph invariants in
//! memory BEFORE the caller persists anything. A hand-edited file can
//! still smuggle in violations, which is what [`SyncConfig::validate`]
//! catches at load time.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::domain::{AccountId, LinkError, SyncLink, SyncLinkSet};

// ---------------------------------------------------------------------------
// SyncConfig
// ---------------------------------------------------------------------------

/// Top-level configuration for Watchlink.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// The configured sync links, in creation order.
    pub links: SyncLinkSet,
}

/// Shared view of the configuration.
///
/// The mediator and the batch sweep take this handle at construction and
/// read the link set under the read lock; mutations (admin surface) take
/// the write lock. Snapshots are cheap clones, so no component holds the
/// lock across an await on the store.
pub type ConfigHandle = Arc<RwLock<SyncConfig>>;

// ---------------------------------------------------------------------------
// Loading and saving
// ---------------------------------------------------------------------------

impl SyncConfig {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SyncConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`SyncConfig::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Save configuration as YAML to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Platform-appropriate default path for the link file.
    ///
    /// Typically `$XDG_DATA_HOME/watchlink/links.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("watchlink")
            .join("links.yaml")
    }

    /// Wrap this configuration in the shared runtime handle.
    pub fn into_handle(self) -> ConfigHandle {
        Arc::new(RwLock::new(self))
    }
}

// ---------------------------------------------------------------------------
// Mutation surface
// ---------------------------------------------------------------------------

impl SyncConfig {
    /// Add a sync link, enforcing the graph invariants.
    ///
    /// # Errors
    /// Propagates [`LinkError`] from the link set; on error nothing
    /// changed and there is nothing to persist.
    pub fn add_link(&mut self, sync_from: AccountId, sync_to: AccountId) -> Result<(), LinkError> {
        self.links.add(SyncLink::new(sync_from, sync_to))
    }

    /// Remove a sync link if present.
    ///
    /// Returns `true` if a link was removed. Removing an absent link is
    /// not an error.
    pub fn remove_link(&mut self, sync_from: AccountId, sync_to: AccountId) -> bool {
        self.links.remove(sync_from, sync_to)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending entry, e.g. `"links[2]"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl SyncConfig {
    /// Validate the configuration and return all errors found.
    ///
    /// Deserialization accepts any list of pairs, so a hand-edited file
    /// may contain self-links, duplicates, or cycles. Validation replays
    /// the stored list through a fresh link set; an entry that a clean
    /// insertion sequence would have rejected is reported against its
    /// index. An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut replay = SyncLinkSet::new();

        for (index, link) in self.links.iter().enumerate() {
            if let Err(e) = replay.add(*link) {
                errors.push(ValidationError {
                    field: format!("links[{index}]"),
                    message: e.to_string(),
                });
            }
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
