//! Playback state store port (driven/secondary port)
//!
//! This module defines the interface for reading and writing per-account
//! watch state. The host owns the records; the propagation core never
//! creates one from nothing, so an account with no record for an item is
//! left alone.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific.
//! - Records are read and written whole. The core computes a complete
//!   replacement state and saves it in one call; there is no partial
//!   field update.
//! - `save` takes the [`SaveReason`] the host should attach to the
//!   write. The core always writes with `SaveReason::PlaybackProgress`,
//!   which keeps its own writes from re-triggering the toggle-played
//!   event path.
//! - The cancellation token lets slow adapters abandon a write the
//!   caller no longer wants; adapters may ignore it.

use tokio_util::sync::CancellationToken;

use crate::domain::{AccountId, ItemId, PlaybackState, SaveReason};

/// Reads and writes per-account watch state records
#[async_trait::async_trait]
pub trait IPlaybackStateStore: Send + Sync {
    /// Retrieves the record for an (account, item) pair
    ///
    /// Returns `Ok(None)` when the account has no record for this item.
    async fn get(
        &self,
        account_id: &AccountId,
        item_id: &ItemId,
    ) -> anyhow::Result<Option<PlaybackState>>;

    /// Writes the record for an (account, item) pair
    async fn save(
        &self,
        account_id: &AccountId,
        item_id: &ItemId,
        state: &PlaybackState,
        reason: SaveReason,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()>;
}
