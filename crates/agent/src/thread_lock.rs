//! Per-thread turn serialization.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use sunnyside_core::message::ThreadId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async lock per thread identifier.
///
/// A turn holds its thread's guard from the first transcript read until the
/// commit, so turns on the same thread run one after another while turns
/// on different threads proceed independently.
#[derive(Default)]
pub struct ThreadLocks {
    locks: Mutex<HashMap<ThreadId, Arc<AsyncMutex<()>>>>,
}

impl ThreadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `thread_id`.
    pub async fn acquire(&self, thread_id: &ThreadId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(thread_id.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }
}
