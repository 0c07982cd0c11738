//! Reconciliation service - orchestrates the merge decision over the store
//!
//! The service reads both sides through the playback state store port,
//! runs the pure decision, and persists the result. Missing records are
//! treated as "nothing to merge", never as errors; a link pointing at an
//! account that has no history for an item simply does nothing.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use watchlink_core::domain::{AccountId, ItemId, PlaybackState, SaveReason};
use watchlink_core::ports::IPlaybackStateStore;

use crate::decision::{MergeOutcome, MergePolicy, SkipReason};
use crate::error::ReconcileError;

/// What a merge attempt did to the target's record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeReport {
    /// One side had no record for the item; nothing to merge
    SkippedNoState,
    /// The decision found nothing worth writing
    Unchanged(SkipReason),
    /// The target's record was replaced with this state
    Updated(PlaybackState),
}

impl MergeReport {
    /// Whether the merge wrote a new record
    #[must_use]
    pub fn updated(&self) -> bool {
        matches!(self, MergeReport::Updated(_))
    }
}

/// Applies merge decisions and play events through the store port
pub struct ReconcileService {
    store: Arc<dyn IPlaybackStateStore>,
}

impl ReconcileService {
    pub fn new(store: Arc<dyn IPlaybackStateStore>) -> Self {
        Self { store }
    }

    /// Merge one account's record for an item into another's
    ///
    /// Reads both records, runs the merge decision, and persists the
    /// result with [`SaveReason::PlaybackProgress`]. Cancellation is
    /// honored at exactly one point: a decided write is abandoned if the
    /// token is already cancelled when the persist step is reached. A
    /// write that has started is never interrupted half-way.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn merge_from_peer(
        &self,
        source_account: &AccountId,
        target_account: &AccountId,
        item_id: &ItemId,
        cancel: &CancellationToken,
    ) -> Result<MergeReport, ReconcileError> {
        let Some(target) = self
            .store
            .get(target_account, item_id)
            .await
            .context("Failed to read target watch state")?
        else {
            debug!("Target has no record for this item");
            return Ok(MergeReport::SkippedNoState);
        };
        let Some(source) = self
            .store
            .get(source_account, item_id)
            .await
            .context("Failed to read source watch state")?
        else {
            debug!("Source has no record for this item");
            return Ok(MergeReport::SkippedNoState);
        };

        match MergePolicy::merge_decision(&target, &source) {
            MergeOutcome::Unchanged(reason) => {
                debug!(reason = %reason, "Nothing to merge");
                Ok(MergeReport::Unchanged(reason))
            }
            MergeOutcome::Write(next) => {
                if cancel.is_cancelled() {
                    return Err(ReconcileError::Cancelled);
                }

                self.store
                    .save(
                        target_account,
                        item_id,
                        &next,
                        SaveReason::PlaybackProgress,
                        cancel,
                    )
                    .await
                    .context("Failed to persist merged watch state")?;

                info!(
                    played = next.played,
                    position_ticks = next.position_ticks,
                    "Merged watch state from peer"
                );
                Ok(MergeReport::Updated(next))
            }
        }
    }

    /// Overwrite an account's record for an item from a live play event
    ///
    /// Returns `Ok(None)` when the account has no record for the item;
    /// the event cannot create history from nothing. Otherwise the new
    /// record is persisted with [`SaveReason::PlaybackProgress`] and
    /// returned. Cancellation is honored the same way as in
    /// [`ReconcileService::merge_from_peer`].
    #[tracing::instrument(skip(self, cancel))]
    pub async fn apply_play_event(
        &self,
        target_account: &AccountId,
        item_id: &ItemId,
        position_ticks: Option<i64>,
        played_to_completion: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<PlaybackState>, ReconcileError> {
        let Some(current) = self
            .store
            .get(target_account, item_id)
            .await
            .context("Failed to read target watch state")?
        else {
            debug!("Target has no record for this item");
            return Ok(None);
        };

        let next =
            MergePolicy::apply_play_event(&current, position_ticks, played_to_completion, Utc::now());

        if cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled);
        }

        self.store
            .save(
                target_account,
                item_id,
                &next,
                SaveReason::PlaybackProgress,
                cancel,
            )
            .await
            .context("Failed to persist applied watch state")?;

        info!(
            played = next.played,
            position_ticks = next.position_ticks,
            "Applied play event to linked account"
        );
        Ok(Some(next))
    }
}
