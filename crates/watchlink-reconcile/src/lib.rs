//! Watchlink Reconcile - Watch-state reconciliation engine
//!
//! Provides:
//! - The pure merge decision (last-write-wins across a sync link)
//! - Play-event application with transition-triggered play counting
//! - The orchestration service that reads, decides, and persists
//!   through the playback state store port

pub mod decision;
pub mod error;
pub mod service;

pub use decision::{MergeOutcome, MergePolicy, SkipReason};
pub use error::ReconcileError;
pub use service::{MergeReport, ReconcileService};
