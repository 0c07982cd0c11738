//! Directed sync-link graph
//!
//! A sync link is a directed edge "changes to account A propagate to
//! account B". The full link set must stay a DAG: self-loops, duplicate
//! edges, and cycles are rejected at insertion time so propagation can
//! never echo a write back to its origin.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::errors::LinkError;
use super::newtypes::AccountId;

// ============================================================================
// SyncLink
// ============================================================================

/// One directed propagation edge between two accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SyncLink {
    /// Account whose watch state is the source of truth for this edge
    pub sync_from: AccountId,
    /// Account that receives the source's watch state
    pub sync_to: AccountId,
}

impl SyncLink {
    /// Create a new link
    #[must_use]
    pub const fn new(sync_from: AccountId, sync_to: AccountId) -> Self {
        Self { sync_from, sync_to }
    }
}

// ============================================================================
// SyncLinkSet
// ============================================================================

/// The complete set of configured sync links
///
/// Insertion order is preserved so that config files and admin UIs show
/// links in the order the operator created them. All mutation goes through
/// [`SyncLinkSet::add`] and [`SyncLinkSet::remove`], which enforce the
/// graph invariants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncLinkSet {
    links: Vec<SyncLink>,
}

impl SyncLinkSet {
    /// Create an empty link set
    #[must_use]
    pub const fn new() -> Self {
        Self { links: Vec::new() }
    }

    /// Add a link, enforcing the graph invariants
    ///
    /// # Errors
    /// - [`LinkError::SelfLink`] if source and target are the same account
    /// - [`LinkError::Duplicate`] if the exact (from, to) pair exists
    /// - [`LinkError::Cycle`] if the new edge would close a propagation loop
    ///
    /// On any error the set is unchanged.
    pub fn add(&mut self, link: SyncLink) -> Result<(), LinkError> {
        if link.sync_from == link.sync_to {
            return Err(LinkError::SelfLink(link.sync_from));
        }

        if self.links.contains(&link) {
            return Err(LinkError::Duplicate {
                from: link.sync_from,
                to: link.sync_to,
            });
        }

        if self.would_create_cycle(&link) {
            return Err(LinkError::Cycle {
                from: link.sync_from,
                to: link.sync_to,
            });
        }

        self.links.push(link);
        Ok(())
    }

    /// Remove a link if present
    ///
    /// Returns `true` if a link was removed, `false` if the pair was not
    /// configured. Removing an absent link is not an error.
    pub fn remove(&mut self, sync_from: AccountId, sync_to: AccountId) -> bool {
        let before = self.links.len();
        self.links
            .retain(|l| !(l.sync_from == sync_from && l.sync_to == sync_to));
        self.links.len() != before
    }

    /// All accounts that receive state from `sync_from`, in insertion order
    #[must_use]
    pub fn targets_from(&self, sync_from: AccountId) -> Vec<AccountId> {
        self.links
            .iter()
            .filter(|l| l.sync_from == sync_from)
            .map(|l| l.sync_to)
            .collect()
    }

    /// Number of configured links
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether no links are configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Iterate over all links in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &SyncLink> {
        self.links.iter()
    }

    /// Check whether adding `new_link` would close a cycle
    ///
    /// Walks existing edges from `new_link.sync_to` with an explicit stack;
    /// if `new_link.sync_from` is reachable, the new edge would complete a
    /// loop. Runs in O(V + E) over the configured graph.
    fn would_create_cycle(&self, new_link: &SyncLink) -> bool {
        let mut visited: HashSet<AccountId> = HashSet::new();
        let mut stack = vec![new_link.sync_to];

        while let Some(current) = stack.pop() {
            if current == new_link.sync_from {
                return true;
            }

            if !visited.insert(current) {
                continue;
            }

            for link in self.links.iter().filter(|l| l.sync_from == current) {
                stack.push(link.sync_to);
            }
        }

        false
    }
}

impl<'a> IntoIterator for &'a SyncLinkSet {
    type Item = &'a SyncLink;
    type IntoIter = std::slice::Iter<'a, SyncLink>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.iter()
    }
}

// ============================================================================
// Tests
// ============================================================================
