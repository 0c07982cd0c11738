//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including identifier parsing failures and sync-link graph violations.

use thiserror::Error;

use super::newtypes::AccountId;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Errors raised when mutating the sync-link graph
///
/// Every variant leaves the link set unchanged. The variants are
/// distinguishable so callers (config UI, CLI, admin API) can surface
/// the precise rule that was violated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// An account cannot sync to itself
    #[error("Account {0} cannot sync to itself")]
    SelfLink(AccountId),

    /// The exact (from, to) pair is already configured
    #[error("Sync link from {from} to {to} already exists")]
    Duplicate {
        /// Source account of the rejected link
        from: AccountId,
        /// Target account of the rejected link
        to: AccountId,
    },

    /// Adding the link would close a propagation cycle
    #[error("Sync link from {from} to {to} would create a circular dependency")]
    Cycle {
        /// Source account of the rejected link
        from: AccountId,
        /// Target account of the rejected link
        to: AccountId,
    },
}
