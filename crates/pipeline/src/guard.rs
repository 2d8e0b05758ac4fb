//! In-memory concurrency guard keyed by resource.
//!
//! At most one in-flight task per key. The map lock is only held around
//! map operations and never across an `.await`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use storyforge_core::types::DbId;

/// Resource key -> id of the task currently generating for it.
#[derive(Debug, Default)]
pub struct ConcurrencyGuard {
    entries: Mutex<HashMap<String, DbId>>,
}

impl ConcurrencyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key` for `task_id`. Check and insert happen under one lock.
    ///
    /// Returns the current holder when the key is already taken.
    pub fn try_acquire(&self, key: &str, task_id: DbId) -> Result<(), DbId> {
        let mut entries = self.lock();
        if let Some(holder) = entries.get(key) {
            return Err(*holder);
        }
        entries.insert(key.to_string(), task_id);
        Ok(())
    }

    /// Task currently holding `key`, if any.
    pub fn holder(&self, key: &str) -> Option<DbId> {
        self.lock().get(key).copied()
    }

    /// Release `key` if `task_id` holds it. Returns `true` if released.
    ///
    /// A stale release from a task that no longer owns the key is ignored.
    pub fn release(&self, key: &str, task_id: DbId) -> bool {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(holder) if *holder == task_id => {
                entries.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// A panic while holding the lock cannot leave the map half-updated,
    /// so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, DbId>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
