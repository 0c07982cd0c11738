//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in the host integration
//! layer (or in test fixtures).
//!
//! ## Ports Overview
//!
//! - [`IAccountDirectory`] - Resolves account IDs against the host's user directory
//! - [`IPlaybackStateStore`] - Reads/writes per-account watch state records
//! - [`ILibraryCatalog`] - Enumerates playable items for the batch sweep
//! - [`IPlaybackEvents`] - Subscribes to the host's playback event streams
//! - [`IScheduledTask`] - Lets the host scheduler describe and run recurring work

pub mod account_directory;
pub mod library_catalog;
pub mod playback_events;
pub mod playback_store;
pub mod scheduled_task;

pub use account_directory::IAccountDirectory;
pub use library_catalog::ILibraryCatalog;
pub use playback_events::IPlaybackEvents;
pub use playback_store::IPlaybackStateStore;
pub use scheduled_task::{IScheduledTask, TaskDescriptor, TaskTrigger};
