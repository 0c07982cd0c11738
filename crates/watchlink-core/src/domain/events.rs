//! Host playback events
//!
//! The host server publishes two event streams the mediator listens on:
//! a playback-stopped stream fired when a session ends, and a
//! user-data-saved stream fired on every write to an account's watch
//! state. Events are ephemeral; a dropped event is simply not propagated
//! until a later event for the same item fires.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::newtypes::{AccountId, ItemId};
use super::playback::PlaybackState;

// ============================================================================
// SaveReason
// ============================================================================

/// Why a watch-state record was written to the store
///
/// The propagation core writes with [`SaveReason::PlaybackProgress`] and
/// reacts only to [`SaveReason::TogglePlayed`] on the user-data stream;
/// the remaining variants exist so hosts can pass their full reason set
/// through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveReason {
    /// Periodic position update during playback
    PlaybackProgress,
    /// A playback session started
    PlaybackStart,
    /// A playback session ran to the end of the item
    PlaybackFinished,
    /// The user flipped the played flag by hand
    TogglePlayed,
    /// The user changed the item's rating
    UpdateUserRating,
    /// Watch state imported from an external source
    Import,
}

impl fmt::Display for SaveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveReason::PlaybackProgress => write!(f, "playback_progress"),
            SaveReason::PlaybackStart => write!(f, "playback_start"),
            SaveReason::PlaybackFinished => write!(f, "playback_finished"),
            SaveReason::TogglePlayed => write!(f, "toggle_played"),
            SaveReason::UpdateUserRating => write!(f, "update_user_rating"),
            SaveReason::Import => write!(f, "import"),
        }
    }
}

// ============================================================================
// Event payloads
// ============================================================================

/// Fired by the host when a playback session ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackStoppedEvent {
    /// Account the session belonged to
    pub account_id: AccountId,
    /// Item that was playing
    pub item_id: ItemId,
    /// Final resume position; None when the host could not report one
    pub position_ticks: Option<i64>,
    /// Whether the session reached the end of the item
    pub played_to_completion: bool,
}

/// Fired by the host on every watch-state write
///
/// The item and state are optional because some hosts emit save events
/// for aggregate records (folders, virtual items) that carry neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDataSavedEvent {
    /// Account whose record was written
    pub account_id: AccountId,
    /// Item the record belongs to, when the write targeted a single item
    pub item_id: Option<ItemId>,
    /// Why the host wrote the record
    pub reason: SaveReason,
    /// Snapshot of the record as written, when available
    pub state: Option<PlaybackState>,
}

// ============================================================================
// Tests
// ============================================================================
