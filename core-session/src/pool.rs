//! Identity-keyed, insertion-ordered pool of playable objects.
//!
//! The pool is the session's backing collection. Membership is by `Arc`
//! pointer identity, order is add order, and every traversal works on a
//! snapshot so concurrent add/remove never tears an iteration. State
//! queries traverse most-recently-added first, which is the order focus
//! arbitration and release-all act in.

use crate::playable::{PlayState, Playable};
use parking_lot::RwLock;
use std::sync::Arc;

/// Thread-safe ordered collection with unique membership by identity.
pub struct AudioPool<T> {
    members: RwLock<Vec<Arc<T>>>,
}

impl<T> AudioPool<T> {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            members: RwLock::new(Vec::new()),
        }
    }

    /// Append a member if it is not already present.
    /// Returns whether it was added.
    pub fn add(&self, member: &Arc<T>) -> bool {
        let mut members = self.members.write();
        if members.iter().any(|m| Arc::ptr_eq(m, member)) {
            return false;
        }
        members.push(Arc::clone(member));
        true
    }

    /// Remove a member by identity. Returns whether it was present.
    pub fn remove(&self, member: &Arc<T>) -> bool {
        let mut members = self.members.write();
        let before = members.len();
        members.retain(|m| !Arc::ptr_eq(m, member));
        members.len() != before
    }

    /// Remove the first member matching `predicate`.
    /// Returns whether one was removed.
    pub fn remove_where(&self, mut predicate: impl FnMut(&Arc<T>) -> bool) -> bool {
        let mut members = self.members.write();
        match members.iter().position(|m| predicate(m)) {
            Some(index) => {
                members.remove(index);
                true
            }
            None => false,
        }
    }

    /// Whether the member is present, by identity.
    pub fn contains(&self, member: &Arc<T>) -> bool {
        self.members.read().iter().any(|m| Arc::ptr_eq(m, member))
    }

    /// Snapshot of every member in insertion order.
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.members.read().clone()
    }

    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }
}

impl<T: Playable> AudioPool<T> {
    /// Snapshot of members whose play state is in `states`, traversed
    /// most recently added first.
    pub fn by_state(&self, states: &[PlayState]) -> Vec<Arc<T>> {
        self.members
            .read()
            .iter()
            .rev()
            .filter(|m| states.contains(&m.state()))
            .cloned()
            .collect()
    }
}

impl<T> Default for AudioPool<T> {
    fn default() -> Self {
        Self::new()
    }
}
