//! Scheduled batch reconciliation across the whole library.
//!
//! The live mediator only sees events that fire while it is listening.
//! The [`BatchReconciler`] covers everything else: on a schedule it
//! walks every configured link and every playable item, merging the
//! source's watch state into the target through the reconciliation
//! engine.
//!
//! Progress is budgeted per link and subdivided per item, reported as a
//! percentage, and ends in exactly 100.0 on every exit path so host
//! progress bars never hang on a failed or cancelled run.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use watchlink_core::config::ConfigHandle;
use watchlink_core::domain::{Account, AccountId, SyncLink};
use watchlink_core::ports::{IAccountDirectory, ILibraryCatalog};
use watchlink_reconcile::{ReconcileError, ReconcileService};

// ============================================================================
// SweepError
// ============================================================================

/// Errors that abort a sweep
///
/// Every abort path reports terminal progress before returning, so a
/// failed sweep never leaves the host's progress bar mid-flight.
#[derive(Debug, Error)]
pub enum SweepError {
    /// The sweep observed cancellation between items
    #[error("sweep cancelled before completion")]
    Cancelled,
    /// The library could not be enumerated
    #[error("library query failed: {0}")]
    Catalog(#[from] anyhow::Error),
    /// A merge failed hard; skips are not errors and never land here
    #[error("merge failed: {0}")]
    Merge(#[from] ReconcileError),
}

// ============================================================================
// SweepSummary
// ============================================================================

/// Counters from one sweep run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Links whose accounts both resolved and whose items were walked
    pub links_processed: u32,
    /// Links dropped because an endpoint did not resolve
    pub links_skipped: u32,
    /// Item merges attempted across all processed links
    pub items_examined: u32,
    /// Item merges that wrote an update to the target
    pub items_updated: u32,
}

// ============================================================================
// BatchReconciler
// ============================================================================

/// Walks every link and every playable item in one pass
pub struct BatchReconciler {
    /// Shared link configuration
    config: ConfigHandle,
    /// Resolves link endpoints against the host directory
    directory: Arc<dyn IAccountDirectory>,
    /// Enumerates playable items
    catalog: Arc<dyn ILibraryCatalog>,
    /// Merge orchestration
    reconciler: Arc<ReconcileService>,
}

impl BatchReconciler {
    pub fn new(
        config: ConfigHandle,
        directory: Arc<dyn IAccountDirectory>,
        catalog: Arc<dyn ILibraryCatalog>,
        reconciler: Arc<ReconcileService>,
    ) -> Self {
        Self {
            config,
            directory,
            catalog,
            reconciler,
        }
    }

    /// Runs one full sweep
    ///
    /// Each link gets an equal share of the progress budget, subdivided
    /// over the items it covers. Skipped links forfeit their share; an
    /// empty library credits the whole share at once. The final report
    /// is exactly 100.0 whether the sweep completes, fails, or is
    /// cancelled.
    #[tracing::instrument(skip(self, progress, cancel))]
    pub async fn run(
        &self,
        progress: mpsc::UnboundedSender<f64>,
        cancel: CancellationToken,
    ) -> Result<SweepSummary, SweepError> {
        let mut summary = SweepSummary::default();

        let links: Vec<SyncLink> = {
            let config = self.config.read().await;
            config.links.iter().copied().collect()
        };

        if links.is_empty() {
            debug!("No sync links configured, nothing to sweep");
            let _ = progress.send(100.0);
            return Ok(summary);
        }

        info!(links = links.len(), "Starting watch-state sweep");
        let per_link = 100.0 / links.len() as f64;
        let mut current = 0.0_f64;

        for link in &links {
            let Some((source, target)) = self.resolve_link(link).await else {
                summary.links_skipped += 1;
                continue;
            };
            summary.links_processed += 1;

            let items = match self.catalog.list_playable_items().await {
                Ok(items) => items,
                Err(err) => {
                    error!(error = %err, "Library enumeration failed, aborting sweep");
                    let _ = progress.send(100.0);
                    return Err(SweepError::Catalog(err));
                }
            };

            if items.is_empty() {
                current = (current + per_link).min(100.0);
                let _ = progress.send(current);
                continue;
            }

            let per_item = per_link / items.len() as f64;
            for item in &items {
                if cancel.is_cancelled() {
                    warn!("Sweep cancelled, stopping early");
                    let _ = progress.send(100.0);
                    return Err(SweepError::Cancelled);
                }

                match self
                    .reconciler
                    .merge_from_peer(source.id(), target.id(), item.id(), &cancel)
                    .await
                {
                    Ok(report) => {
                        summary.items_examined += 1;
                        if report.updated() {
                            summary.items_updated += 1;
                        }
                    }
                    Err(ReconcileError::Cancelled) => {
                        warn!("Sweep cancelled mid-merge, stopping early");
                        let _ = progress.send(100.0);
                        return Err(SweepError::Cancelled);
                    }
                    Err(err) => {
                        error!(
                            source = source.name(),
                            target = target.name(),
                            item = %item.id(),
                            error = %err,
                            "Merge failed, aborting sweep",
                        );
                        let _ = progress.send(100.0);
                        return Err(err.into());
                    }
                }

                // Accumulated float increments must not overshoot the
                // terminal value.
                current = (current + per_item).min(100.0);
                let _ = progress.send(current);
            }
        }

        let _ = progress.send(100.0);
        info!(
            links_processed = summary.links_processed,
            links_skipped = summary.links_skipped,
            items_examined = summary.items_examined,
            items_updated = summary.items_updated,
            "Watch-state sweep completed",
        );
        Ok(summary)
    }

    /// Resolves both endpoints of a link, or reports why it is skipped
    async fn resolve_link(&self, link: &SyncLink) -> Option<(Account, Account)> {
        let source = self.lookup(&link.sync_from).await;
        let target = self.lookup(&link.sync_to).await;
        match (source, target) {
            (Some(source), Some(target)) => Some((source, target)),
            _ => {
                warn!(
                    sync_from = %link.sync_from,
                    sync_to = %link.sync_to,
                    "Could not resolve both link accounts, skipping link",
                );
                None
            }
        }
    }

    async fn lookup(&self, id: &AccountId) -> Option<Account> {
        match self.directory.resolve(id).await {
            Ok(found) => found,
            Err(err) => {
                warn!(account = %id, error = %err, "Account lookup failed");
                None
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
