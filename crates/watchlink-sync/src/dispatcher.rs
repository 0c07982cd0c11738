//! Per-key dispatch coordination for reconciliation jobs.
//!
//! Live playback events can fire in bursts for the same viewer and item
//! (a progress save right before the stop, a toggle right after it).
//! Running the resulting jobs concurrently would race on the target's
//! watch-state record, and queueing them would build a backlog of writes
//! that are already stale when they run. The [`SyncDispatcher`] does
//! neither: it keeps one mutex per (account, item) key and probes it
//! with a zero-wait try-lock.
//!
//! ```text
//! event --> try_dispatch(key, job) --> key free? --> spawn(job, guard)
//!                                         |
//!                                         +-- held --> drop job
//! ```
//!
//! Dropping the loser is safe: any later event for the same key carries
//! fresher state and triggers the merge again.

use std::{
    fmt,
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use dashmap::DashMap;
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, info};

use watchlink_core::domain::SyncKey;

// ============================================================================
// DispatchOutcome
// ============================================================================

/// What a dispatch probe did with the job it was handed
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The key was free; the job is running on the returned handle
    Started(JoinHandle<()>),
    /// Another job holds the key; this job was dropped unrun
    Contended,
    /// The dispatcher is shut down and accepts no new jobs
    ShutDown,
}

impl DispatchOutcome {
    /// Whether the probe started the job
    #[must_use]
    pub fn is_started(&self) -> bool {
        matches!(self, DispatchOutcome::Started(_))
    }
}

// ============================================================================
// SyncDispatcher
// ============================================================================

/// Serializes reconciliation jobs per (account, item) key
///
/// One `Mutex<()>` per key, created lazily on first dispatch and reused
/// for the dispatcher's lifetime. The key space is bounded by accounts
/// times items, so the table is never pruned while running.
pub struct SyncDispatcher {
    /// Per-key locks, created on first use
    locks: Arc<DashMap<SyncKey, Arc<Mutex<()>>>>,
    /// Set once by [`shutdown`](Self::shutdown); dispatches refuse afterwards
    shut_down: AtomicBool,
}

impl SyncDispatcher {
    /// Creates a dispatcher with an empty lock table
    #[must_use]
    pub fn new() -> Self {
        Self {
            locks: Arc::new(DashMap::new()),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Probes the key's lock and spawns `job` if it is free
    ///
    /// The probe never waits: when another job holds the key, the
    /// incoming job is dropped and [`DispatchOutcome::Contended`] is
    /// returned. On success the owned guard moves into the spawned task,
    /// so the key is released on every exit path, panics included.
    pub fn try_dispatch<F>(&self, key: SyncKey, job: F) -> DispatchOutcome
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.shut_down.load(Ordering::Acquire) {
            debug!(key = %key, "Dispatcher is shut down, refusing job");
            return DispatchOutcome::ShutDown;
        }

        let lock = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        match lock.try_lock_owned() {
            Ok(guard) => {
                let handle = tokio::spawn(async move {
                    let _guard = guard;
                    job.await;
                });
                DispatchOutcome::Started(handle)
            }
            Err(_) => {
                debug!(key = %key, "Key is busy, dropping contending job");
                DispatchOutcome::Contended
            }
        }
    }

    /// Stops accepting jobs and clears the lock table
    ///
    /// Jobs already running keep their guards and finish normally.
    /// Calling this more than once is a no-op.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let cleared = self.locks.len();
        self.locks.clear();
        info!(cleared, "Sync dispatcher shut down");
    }

    /// Number of keys currently tracked in the lock table
    #[must_use]
    pub fn active_keys(&self) -> usize {
        self.locks.len()
    }
}

impl Default for SyncDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SyncDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncDispatcher")
            .field("active_keys", &self.locks.len())
            .field("shut_down", &self.shut_down.load(Ordering::Acquire))
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
