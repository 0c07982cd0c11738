//! Scheduled task port (driving/primary port)
//!
//! This module defines the interface the host's task scheduler uses to
//! discover, describe, and run recurring maintenance work. The batch
//! sweep registers itself through this port.
//!
//! ## Design Notes
//!
//! - `descriptor().key` is the stable identity the scheduler persists
//!   trigger overrides under; renaming it orphans operator-configured
//!   schedules, so the display name may change but the key must not.
//! - Progress is reported as percent values from 0.0 to 100.0 over an
//!   unbounded channel. Implementations must send a terminal `100.0` on
//!   every exit path, success or not, so host progress bars never hang.
//! - Cancellation is cooperative through the token; a cancelled run
//!   still reports its terminal progress value.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use serde::{Deserialize, Serialize};

// ============================================================================
// Task metadata
// ============================================================================

/// Static metadata describing a schedulable task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// Human-readable task name shown in the scheduler UI
    pub name: String,
    /// Stable identity the scheduler keys stored settings under
    pub key: String,
    /// One-line description of what the task does
    pub description: String,
    /// UI grouping category
    pub category: String,
    /// Whether the task is enabled by default
    pub enabled: bool,
    /// Whether the task is hidden from the scheduler UI
    pub hidden: bool,
    /// Whether runs of the task are recorded in the activity log
    pub logged: bool,
}

/// When a scheduled task should fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskTrigger {
    /// Fire on a fixed repeating interval
    Interval(chrono::Duration),
}

// ============================================================================
// IScheduledTask trait
// ============================================================================

/// A recurring task the host scheduler can describe and run
#[async_trait::async_trait]
pub trait IScheduledTask: Send + Sync {
    /// Returns the task's static metadata
    fn descriptor(&self) -> TaskDescriptor;

    /// Returns the triggers to install when no operator override exists
    fn default_triggers(&self) -> Vec<TaskTrigger>;

    /// Runs the task once
    ///
    /// # Arguments
    /// * `progress` - Sink for percent values; the final send is `100.0`
    /// * `cancel` - Cooperative cancellation for long runs
    async fn execute(
        &self,
        progress: mpsc::UnboundedSender<f64>,
        cancel: CancellationToken,
    ) -> anyhow::Result<()>;
}
