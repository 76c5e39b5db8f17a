//! Per-key async locks
//!
//! Serializes work that shares a key (one platform user) while work under
//! different keys runs freely. Entries are dropped once nobody holds or
//! waits on them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

/// Held for as long as the key is locked
pub struct KeyedGuard<'a> {
    owner: &'a KeyedLocks,
    key: i64,
    entry: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: i64) -> KeyedGuard<'_> {
        let entry = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.entry(key).or_default().clone()
        };

        let guard = entry.clone().lock_owned().await;
        KeyedGuard {
            owner: self,
            key,
            entry,
            guard: Some(guard),
        }
    }

    /// Keys currently held or waited on
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for KeyedGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();

        let mut locks = self
            .owner
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Map entry plus ours: no other holder or waiter
        if Arc::strong_count(&self.entry) == 2 {
            locks.remove(&self.key);
        }
    }
}
