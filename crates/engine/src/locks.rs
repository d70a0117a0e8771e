//! Per-user write serialization
//!
//! Ledger updates read and then write the same progression row, so updates for
//! one user run one at a time. Different users never contend.
//!
//! The locks live in this process only. Two engine instances sharing a
//! database do not see each other's locks, and the store takes no row locks.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct UserLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

/// Exclusive access to one user's progression until dropped
#[derive(Debug)]
pub struct UserGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    user_id: Uuid,
    locks: &'a DashMap<Uuid, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a user's progression
    pub async fn acquire(&self, user_id: Uuid) -> UserGuard<'_> {
        let lock = self.locks.entry(user_id).or_default().clone();
        UserGuard {
            guard: Some(lock.lock_owned().await),
            user_id,
            locks: &self.locks,
        }
    }

    /// Number of users with a live lock entry
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for UserGuard<'_> {
    fn drop(&mut self) {
        // Release first so the map's Arc is the only one left when idle
        drop(self.guard.take());
        self.locks
            .remove_if(&self.user_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
