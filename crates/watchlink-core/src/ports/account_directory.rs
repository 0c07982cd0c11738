//! Account directory port (driven/secondary port)
//!
//! This module defines the interface for resolving account identifiers
//! against the host's user directory. The directory is the authority on
//! which accounts exist; configured links may reference accounts that
//! have since been deleted.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because lookup errors are adapter-specific
//!   (host API, database, test fixture) and don't need domain-level
//!   classification.
//! - A missing account is `Ok(None)`, not an error: callers skip the
//!   affected link and keep going.

use crate::domain::{Account, AccountId};

/// Resolves account identifiers to directory records
#[async_trait::async_trait]
pub trait IAccountDirectory: Send + Sync {
    /// Looks up an account by its identifier
    ///
    /// Returns `Ok(None)` when no account with this ID exists.
    async fn resolve(&self, id: &AccountId) -> anyhow::Result<Option<Account>>;
}
