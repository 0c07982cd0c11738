//! Watchlink Sync - Live event mediation and scheduled sweep
//!
//! The delivery half of Watchlink. The mediator listens to the host's
//! playback streams and pushes each relevant event through the
//! reconciliation engine as it happens; the batch sweep walks the whole
//! library on a schedule and catches everything the live path missed.
//! Live events fan out in bursts, so the mediator funnels every spawned
//! application through a per-key dispatcher; the sweep applies its
//! merges inline, one at a time.
//!
//! ## Modules
//!
//! - [`dispatcher`] - Per-key try-lock serialization for spawned jobs
//! - [`mediator`] - Broadcast-stream listener fanning events out over links
//! - [`sweep`] - Full-library batch reconciliation with progress reporting
//! - [`task`] - Scheduled-task registration for the sweep

pub mod dispatcher;
pub mod mediator;
pub mod sweep;
pub mod task;
