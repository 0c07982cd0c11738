//! Domain entities and business logic
//!
//! This module contains the core domain types for Watchlink:
//! - Newtypes for type-safe account and item identifiers
//! - The directed sync-link graph with its DAG invariants
//! - Playback state records and host event payloads
//! - Account and media item records as the core sees them
//! - Domain-specific error types

pub mod account;
pub mod errors;
pub mod events;
pub mod item;
pub mod links;
pub mod newtypes;
pub mod playback;

// Re-export commonly used types
pub use account::Account;
pub use errors::{DomainError, LinkError};
pub use events::{PlaybackStoppedEvent, SaveReason, UserDataSavedEvent};
pub use item::{MediaItem, MediaKind};
pub use links::{SyncLink, SyncLinkSet};
pub use newtypes::{AccountId, ItemId, SyncKey};
pub use playback::PlaybackState;
