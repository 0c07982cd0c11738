//! Playback event port (driving/primary port)
//!
//! This module defines the interface for subscribing to the host's
//! playback event streams. The mediator holds one receiver per stream
//! for the lifetime of its listen loop.
//!
//! ## Design Notes
//!
//! - Streams are `tokio::sync::broadcast` channels: the host fans the
//!   same events out to any number of consumers, and a slow consumer
//!   lags rather than blocking the host. A lagged receiver reports the
//!   skipped count and keeps receiving; delivery is best-effort by
//!   contract.
//! - `subscribe_*` can be called more than once; each call yields an
//!   independent receiver positioned at the current stream head.

use tokio::sync::broadcast;

use crate::domain::{PlaybackStoppedEvent, UserDataSavedEvent};

/// Subscribes to the host's playback event streams
pub trait IPlaybackEvents: Send + Sync {
    /// Subscribes to playback-stopped events
    fn subscribe_playback_stopped(&self) -> broadcast::Receiver<PlaybackStoppedEvent>;

    /// Subscribes to user-data-saved events
    fn subscribe_user_data_saved(&self) -> broadcast::Receiver<UserDataSavedEvent>;
}
