//! Playback state record
//!
//! One record exists per (account, item) pair, owned by the external
//! store. The record is always read and written whole; the merge and
//! play-event paths compute a complete replacement rather than patching
//! individual fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-account watch state for a single library item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Resume position in ticks (100ns units), never negative
    pub position_ticks: i64,
    /// Whether the item counts as watched
    pub played: bool,
    /// How many times the item has been watched to completion
    pub play_count: u32,
    /// When the item was last played, if ever
    pub last_played: Option<DateTime<Utc>>,
    /// Selected audio track, if the user picked one
    pub audio_stream_index: Option<i32>,
    /// Selected subtitle track, if the user picked one
    pub subtitle_stream_index: Option<i32>,
}

impl PlaybackState {
    /// A record for an item that has never been played
    #[must_use]
    pub fn unplayed() -> Self {
        Self::default()
    }

    /// Whether this record carries any watch history at all
    #[must_use]
    pub fn is_untouched(&self) -> bool {
        self.position_ticks == 0
            && !self.played
            && self.play_count == 0
            && self.last_played.is_none()
    }
}
