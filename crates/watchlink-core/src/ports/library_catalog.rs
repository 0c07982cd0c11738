//! Library catalog port (driven/secondary port)
//!
//! This module defines the interface the batch sweep uses to enumerate
//! the shared library. Only playable leaf items (movies, episodes) are
//! returned; containers and virtual items carry no per-account watch
//! state and must not reach the sweep.

use crate::domain::MediaItem;

/// Enumerates playable items in the shared library
#[async_trait::async_trait]
pub trait ILibraryCatalog: Send + Sync {
    /// Lists every playable item in the library
    ///
    /// The returned order is adapter-defined but must be stable within
    /// one call; the sweep derives per-item progress increments from the
    /// list length.
    async fn list_playable_items(&self) -> anyhow::Result<Vec<MediaItem>>;
}
