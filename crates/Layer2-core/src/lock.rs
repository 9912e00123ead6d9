//! Per-task mutual exclusion
//!
//! Runs for the same task name share one workspace and one remote, so they
//! are serialized. GitHub compares repository names case-insensitively, so
//! the key is lowercased. Different task names never contend.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

/// Map of task name to async lock
#[derive(Debug, Default)]
pub struct TaskLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of one run
pub type TaskGuard = OwnedMutexGuard<()>;

impl TaskLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `task`
    ///
    /// Names differing only in ASCII case share a lock.
    pub async fn acquire(&self, task: &str) -> TaskGuard {
        let key = task.to_ascii_lowercase();
        let lock = {
            let mut locks = self.locks.lock();
            // Entries only the map still references are idle
            locks.retain(|name, lock| *name == key || Arc::strong_count(lock) > 1);
            locks
                .entry(key)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        if lock.try_lock().is_err() {
            debug!("Waiting for in-flight run of {}", task);
        }
        lock.lock_owned().await
    }

    /// Number of tracked task names
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
