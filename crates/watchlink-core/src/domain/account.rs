//! Account domain entity
//!
//! This module defines the Account entity as the propagation core sees
//! it: the resolved directory record for one user. The host owns the
//! full profile; the core only needs identity and a display name for
//! logging.

use serde::{Deserialize, Serialize};

use super::newtypes::AccountId;

/// A resolved user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier for this account
    id: AccountId,
    /// Display name from the host's user directory
    name: String,
}

impl Account {
    /// Creates a new Account
    pub fn new(id: AccountId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Returns the account's unique identifier
    pub fn id(&self) -> &AccountId {
        &self.id
    }

    /// Returns the account's display name
    pub fn name(&self) -> &str {
        &self.name
    }
}
