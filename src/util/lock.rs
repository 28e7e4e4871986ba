use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub(crate) fn rw_read<'a, T>(lock: &'a RwLock<T>, owner: &'static str) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|poisoned| {
        warn!(
            owner,
            lock_kind = "rwlock.read",
            "recovered poisoned lock; state may predate a panic elsewhere"
        );
        poisoned.into_inner()
    })
}

pub(crate) fn rw_write<'a, T>(lock: &'a RwLock<T>, owner: &'static str) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|poisoned| {
        warn!(
            owner,
            lock_kind = "rwlock.write",
            "recovered poisoned lock; state may predate a panic elsewhere"
        );
        poisoned.into_inner()
    })
}

pub(crate) fn mutex_lock<'a, T>(lock: &'a Mutex<T>, owner: &'static str) -> MutexGuard<'a, T> {
    lock.lock().unwrap_or_else(|poisoned| {
        warn!(
            owner,
            lock_kind = "mutex.lock",
            "recovered poisoned lock; state may predate a panic elsewhere"
        );
        poisoned.into_inner()
    })
}
