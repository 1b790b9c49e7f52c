//! Per-session mutual exclusion.
//!
//! # Responsibilities
//! - Hand out one exclusive lock per session key, created on first use
//! - Make get-or-create atomic under concurrent first access
//! - Count holders and waiters so idle locks can be dropped
//!
//! # Design Decisions
//! - Entries live in a `DashMap`; the count changes under the entry's shard lock
//! - An entry is removed only when its count reaches zero, so nobody can be
//!   holding or waiting on a lock that has been evicted
//! - With `evict_idle = false` entries are kept for the process lifetime

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::gateway::SessionKey;
use crate::observability::metrics;

struct LockEntry {
    lock: Arc<Mutex<()>>,
    /// Requests currently holding or waiting on `lock`.
    holders: usize,
}

struct RegistryInner {
    locks: DashMap<SessionKey, LockEntry>,
    evict_idle: bool,
}

/// Registry of per-session exclusive locks.
#[derive(Clone)]
pub struct SessionLockRegistry {
    inner: Arc<RegistryInner>,
}

impl SessionLockRegistry {
    pub fn new(evict_idle: bool) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                locks: DashMap::new(),
                evict_idle,
            }),
        }
    }

    /// Wait for exclusive access to `key`.
    ///
    /// Only the calling task waits; requests for other keys are unaffected.
    /// Dropping the returned future before it resolves gives up the place in
    /// line without leaking the registry entry.
    pub async fn acquire(&self, key: &SessionKey) -> SessionLock {
        let lease = self.lease(key);
        let guard = lease.lock.clone().lock_owned().await;
        SessionLock {
            _guard: guard,
            _lease: lease,
        }
    }

    /// Number of session keys with a live entry.
    pub fn len(&self) -> usize {
        self.inner.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.locks.is_empty()
    }

    /// Requests holding or waiting on `key`'s lock.
    pub fn holders(&self, key: &SessionKey) -> usize {
        self.inner
            .locks
            .get(key)
            .map(|entry| entry.holders)
            .unwrap_or(0)
    }

    fn lease(&self, key: &SessionKey) -> Lease {
        let lock = {
            let mut entry = self
                .inner
                .locks
                .entry(key.clone())
                .or_insert_with(|| LockEntry {
                    lock: Arc::new(Mutex::new(())),
                    holders: 0,
                });
            entry.holders += 1;
            entry.lock.clone()
        };
        metrics::set_session_locks(self.inner.locks.len());

        Lease {
            registry: self.inner.clone(),
            key: key.clone(),
            lock,
        }
    }
}

/// A counted reference to a registry entry.
struct Lease {
    registry: Arc<RegistryInner>,
    key: SessionKey,
    lock: Arc<Mutex<()>>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        if let Entry::Occupied(mut occupied) = self.registry.locks.entry(self.key.clone()) {
            let entry = occupied.get_mut();
            entry.holders = entry.holders.saturating_sub(1);
            if entry.holders == 0 && self.registry.evict_idle {
                occupied.remove();
            }
        }
        metrics::set_session_locks(self.registry.locks.len());
    }
}

/// Exclusive hold on one session.
///
/// Releasing (or dropping) unlocks the session first and then gives back the
/// registry reference.
pub struct SessionLock {
    // Field order is drop order.
    _guard: OwnedMutexGuard<()>,
    _lease: Lease,
}

impl SessionLock {
    pub fn release(self) {
        drop(self);
    }
}

impl std::fmt::Debug for SessionLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLock")
            .field("key", &self._lease.key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn key(id: &str) -> SessionKey {
        SessionKey::new("http", Some(id)).unwrap()
    }

    #[tokio::test]
    async fn sequential_access() {
        let registry = SessionLockRegistry::new(true);

        let first = registry.acquire(&key("s1")).await;
        first.release();

        let second = registry.acquire(&key("s1")).await;
        second.release();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn different_sessions_are_concurrent() {
        let registry = SessionLockRegistry::new(true);

        let a = registry.acquire(&key("s1")).await;
        let b = registry.acquire(&key("s2")).await;
        assert_eq!(registry.len(), 2);

        drop(a);
        drop(b);
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn same_session_waits_for_release() {
        let registry = SessionLockRegistry::new(true);
        let held = registry.acquire(&key("s1")).await;

        let r = registry.clone();
        let waiter = tokio::spawn(async move {
            let _lock = r.acquire(&key("s1")).await;
            42
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());
        assert_eq!(registry.holders(&key("s1")), 2);

        held.release();
        assert_eq!(waiter.await.unwrap(), 42);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn at_most_one_holder_per_key() {
        let registry = SessionLockRegistry::new(true);
        let running = Arc::new(AtomicUsize::new(0));
        let max_running = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            let running = running.clone();
            let max_running = max_running.clone();
            tasks.push(tokio::spawn(async move {
                let _lock = registry.acquire(&key("shared")).await;
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                max_running.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(max_running.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn abandoned_waiter_does_not_leak_entry() {
        let registry = SessionLockRegistry::new(true);
        let held = registry.acquire(&key("s1")).await;

        let r = registry.clone();
        let waiter = tokio::spawn(async move {
            let _lock = r.acquire(&key("s1")).await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        waiter.abort();
        let _ = waiter.await;

        assert_eq!(registry.holders(&key("s1")), 1);
        held.release();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn retained_mode_keeps_entries() {
        let registry = SessionLockRegistry::new(false);
        registry.acquire(&key("s1")).await.release();
        registry.acquire(&key("s2")).await.release();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.holders(&key("s1")), 0);
    }
}
