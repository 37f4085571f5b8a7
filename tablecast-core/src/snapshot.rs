//! Snapshot store.
//!
//! Holds the most recent full result set delivered to the ingest endpoint.
//! The snapshot is replaced wholesale, never merged, and readers always get
//! one complete version.

use std::sync::Arc;
use tablecast_sdk::objects::Row;

use crate::utils::versioned_store::VersionedStore;

/// An immutable result set.
pub type Snapshot = Vec<Row>;

/// Process-wide owner of the current snapshot.
///
/// Cheap to clone; all clones share the same snapshot. Created empty.
#[derive(Clone)]
pub struct SnapshotStore {
    store: VersionedStore<Snapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            store: VersionedStore::new(Vec::new()),
        }
    }

    /// Atomically substitute the entire snapshot. Returns the new version.
    pub async fn replace(&self, rows: Snapshot) -> u64 {
        let rows_len = rows.len();
        let version = self.store.replace(rows).await;
        tracing::debug!(version, rows = rows_len, "Snapshot replaced");
        version
    }

    /// The current snapshot, empty if none has been delivered yet.
    pub async fn read(&self) -> Arc<Snapshot> {
        self.store.load().await
    }

    /// Number of replaces since startup; `0` means never set.
    pub fn version(&self) -> u64 {
        self.store.version()
    }

    /// The current snapshot and the version it was stored as, read together.
    pub async fn read_versioned(&self) -> (u64, Arc<Snapshot>) {
        self.store.load_versioned().await
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_starts_empty() {
        let store = SnapshotStore::new();
        assert!(store.read().await.is_empty());
        assert_eq!(store.version(), 0);
    }

    #[tokio::test]
    async fn test_replace_is_wholesale() {
        let store = SnapshotStore::new();
        store
            .replace(vec![json!({"id": 1}), json!({"id": 2})])
            .await;
        store.replace(vec![json!({"id": 3})]).await;
        assert_eq!(*store.read().await, vec![json!({"id": 3})]);
        assert_eq!(store.version(), 2);
    }

    #[tokio::test]
    async fn test_read_versioned_pairs_rows_with_their_version() {
        let store = SnapshotStore::new();
        let (version, rows) = store.read_versioned().await;
        assert_eq!(version, 0);
        assert!(rows.is_empty());

        store.replace(vec![json!("a")]).await;
        store.replace(vec![json!("b"), json!("c")]).await;
        let (version, rows) = store.read_versioned().await;
        assert_eq!(version, 2);
        assert_eq!(*rows, vec![json!("b"), json!("c")]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_never_observe_mixed_rows() {
        let store = SnapshotStore::new();

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for generation in 1..=200u64 {
                    let rows = (0..50).map(|_| json!({ "gen": generation })).collect();
                    store.replace(rows).await;
                    tokio::task::yield_now().await;
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    for _ in 0..500 {
                        let snapshot = store.read().await;
                        if let Some(first) = snapshot.first() {
                            assert_eq!(snapshot.len(), 50);
                            assert!(snapshot.iter().all(|row| row == first));
                        }
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
        assert_eq!(store.version(), 200);
    }
}
