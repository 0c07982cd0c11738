//! Watchlink Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `SyncLink`, `SyncLinkSet`, `PlaybackState`, `Account`, `MediaItem`
//! - **Event payloads** - `PlaybackStoppedEvent`, `UserDataSavedEvent`, `SaveReason`
//! - **Port definitions** - Traits for host adapters: `IAccountDirectory`,
//!   `IPlaybackStateStore`, `ILibraryCatalog`, `IPlaybackEvents`, `IScheduledTask`
//! - **Configuration** - The persisted sync-link file and its shared runtime handle
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no external dependencies.
//! Ports define trait interfaces that the host integration implements.
//! The reconcile and sync crates orchestrate domain entities through the ports.

pub mod config;
pub mod domain;
pub mod ports;
