//! Snapshot persistence collaborator
//!
//! Persistence is an external concern: an opaque get/put blob store
//! keyed by room id. The engine only needs "save the latest capture"
//! and "give me the most recent one back", so the trait stays that
//! narrow. Snapshots cross the boundary JSON-serialized, matching the
//! relay-side envelope `{key, value}`.

use crate::errors::{Result, SyncError};
use crate::snapshot::Snapshot;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Opaque key/value snapshot store
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist `snapshot` as the most recent capture under `key`.
    async fn put(&self, key: &str, snapshot: &Snapshot) -> Result<()>;

    /// Fetch the most recent capture under `key`, if any.
    async fn get_latest(&self, key: &str) -> Result<Option<Snapshot>>;
}

/// In-memory store, used by tests and as the default autosave sink
pub struct InMemorySnapshotStore {
    blobs: RwLock<HashMap<String, String>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn put(&self, key: &str, snapshot: &Snapshot) -> Result<()> {
        let value = snapshot.to_json()?;
        self.blobs.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn get_latest(&self, key: &str) -> Result<Option<Snapshot>> {
        let blobs = self.blobs.read().await;
        match blobs.get(key) {
            Some(raw) => Ok(Some(Snapshot::from_json(raw)?)),
            None => Ok(None),
        }
    }
}

/// Convenience wrapper: fail with a storage error when a snapshot is
/// expected to exist.
pub async fn require_latest(store: &dyn SnapshotStore, key: &str) -> Result<Snapshot> {
    store
        .get_latest(key)
        .await?
        .ok_or_else(|| SyncError::Storage(format!("no snapshot stored for {key}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Side;
    use crate::game::{DeckData, GameBoard};
    use crate::snapshot::ActionHistory;

    fn board() -> GameBoard {
        let mut board = GameBoard::new();
        board.exchange_deck_data(Side::Own, "ash".into(), DeckData::default());
        board
    }

    #[tokio::test]
    async fn put_then_get_latest_round_trips() {
        let store = InMemorySnapshotStore::new();
        let snapshot = Snapshot::capture("room-1", &board(), ActionHistory::default()).unwrap();

        store.put("room-1", &snapshot).await.unwrap();
        let loaded = store.get_latest("room-1").await.unwrap().unwrap();
        assert_eq!(loaded.snapshot_id, snapshot.snapshot_id);
        assert!(loaded.verify().is_ok());
    }

    #[tokio::test]
    async fn latest_overwrites_older_capture() {
        let store = InMemorySnapshotStore::new();
        let first = Snapshot::capture("room-1", &board(), ActionHistory::default()).unwrap();
        let second = Snapshot::capture("room-1", &board(), ActionHistory::default()).unwrap();

        store.put("room-1", &first).await.unwrap();
        store.put("room-1", &second).await.unwrap();
        let loaded = store.get_latest("room-1").await.unwrap().unwrap();
        assert_eq!(loaded.snapshot_id, second.snapshot_id);
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let store = InMemorySnapshotStore::new();
        assert!(store.get_latest("absent").await.unwrap().is_none());
        assert!(require_latest(&store, "absent").await.is_err());
    }
}
