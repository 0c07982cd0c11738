//! Media item domain entity
//!
//! Library records as the batch sweep sees them. The sweep only walks
//! playable leaf items; folders, collections, and other container types
//! never reach the core, which the catalog port guarantees by filtering
//! on [`MediaKind::is_playable`].

use serde::{Deserialize, Serialize};
use std::fmt;

use super::newtypes::ItemId;

/// Kind of a playable library item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// A feature film
    Movie,
    /// A single series episode
    Episode,
}

impl MediaKind {
    /// Whether items of this kind carry per-account watch state
    #[must_use]
    pub const fn is_playable(&self) -> bool {
        matches!(self, MediaKind::Movie | MediaKind::Episode)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Movie => write!(f, "movie"),
            MediaKind::Episode => write!(f, "episode"),
        }
    }
}

/// A playable item in the shared library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Unique identifier for this item
    id: ItemId,
    /// Display name for logging
    name: String,
    /// What kind of item this is
    kind: MediaKind,
}

impl MediaItem {
    /// Creates a new MediaItem
    pub fn new(id: ItemId, name: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
        }
    }

    /// Returns the item's unique identifier
    pub fn id(&self) -> &ItemId {
        &self.id
    }

    /// Returns the item's display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the item's kind
    pub fn kind(&self) -> MediaKind {
        self.kind
    }
}
