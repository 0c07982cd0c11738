//! Scheduled-task registration for the batch sweep.
//!
//! Exposes the [`BatchReconciler`] to the host scheduler through the
//! [`IScheduledTask`] port. The descriptor key is the identity the host
//! stores operator trigger overrides under; renaming it would orphan
//! every schedule operators have customized, so it stays fixed while
//! the display name is free to change.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use watchlink_core::ports::{IScheduledTask, TaskDescriptor, TaskTrigger};

use crate::sweep::BatchReconciler;

#[async_trait]
impl IScheduledTask for BatchReconciler {
    fn descriptor(&self) -> TaskDescriptor {
        TaskDescriptor {
            name: "Sync watch state between accounts".to_string(),
            key: "Accounts Playback Sync".to_string(),
            description: "Sync watched states for media items between accounts.".to_string(),
            category: "Library".to_string(),
            enabled: true,
            hidden: false,
            logged: true,
        }
    }

    fn default_triggers(&self) -> Vec<TaskTrigger> {
        vec![TaskTrigger::Interval(chrono::Duration::hours(24))]
    }

    async fn execute(
        &self,
        progress: mpsc::UnboundedSender<f64>,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        self.run(progress, cancel).await?;
        Ok(())
    }
}
