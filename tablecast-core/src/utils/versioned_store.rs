//! Replace-whole-value store.
//!
//! `VersionedStore<T>` keeps the current value behind an `Arc` and swaps the
//! whole `Arc` on every replace. Readers clone the `Arc` under a short read
//! lock, so they always hold one complete version and never a value that is
//! being written.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// A shared, versioned value.
///
/// Version `0` is the initial value; every [`replace`](Self::replace)
/// increments it by one.
pub struct VersionedStore<T> {
    inner: Arc<VersionedStoreInner<T>>,
}

struct VersionedStoreInner<T> {
    current: RwLock<Versioned<T>>,
    /// Mirror of `current.version` for lock-free reads.
    published: AtomicU64,
}

struct Versioned<T> {
    version: u64,
    value: Arc<T>,
}

impl<T> VersionedStore<T> {
    /// Create a new store holding `initial` at version 0.
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(VersionedStoreInner {
                current: RwLock::new(Versioned {
                    version: 0,
                    value: Arc::new(initial),
                }),
                published: AtomicU64::new(0),
            }),
        }
    }

    /// Replace the stored value.
    ///
    /// The previous value is released once the last reader holding it drops
    /// its `Arc`. Returns the new version.
    pub async fn replace(&self, value: T) -> u64 {
        let mut guard = self.inner.current.write().await;
        guard.version += 1;
        guard.value = Arc::new(value);
        let version = guard.version;
        // Published under the write lock so versions never go backwards.
        self.inner.published.store(version, Ordering::Release);
        version
    }

    /// The current value.
    pub async fn load(&self) -> Arc<T> {
        Arc::clone(&self.inner.current.read().await.value)
    }

    /// The current value together with the version it was stored as.
    pub async fn load_versioned(&self) -> (u64, Arc<T>) {
        let guard = self.inner.current.read().await;
        (guard.version, Arc::clone(&guard.value))
    }

    /// The latest published version.
    pub fn version(&self) -> u64 {
        self.inner.published.load(Ordering::Acquire)
    }
}

impl<T> Clone for VersionedStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replace_bumps_version() {
        let store = VersionedStore::new("a".to_string());
        assert_eq!(store.version(), 0);
        assert_eq!(*store.load().await, "a");

        assert_eq!(store.replace("b".to_string()).await, 1);
        assert_eq!(store.replace("c".to_string()).await, 2);

        let (version, value) = store.load_versioned().await;
        assert_eq!(version, 2);
        assert_eq!(*value, "c");
    }

    #[tokio::test]
    async fn test_old_readers_keep_their_version() {
        let store = VersionedStore::new(vec![1, 2, 3]);
        let before = store.load().await;
        store.replace(vec![4]).await;
        assert_eq!(*before, vec![1, 2, 3]);
        assert_eq!(*store.load().await, vec![4]);
    }
}
