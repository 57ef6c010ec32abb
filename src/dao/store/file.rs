//! JSON-file durable store, the desktop analogue of browser local storage.

use std::path::PathBuf;

use futures::future::BoxFuture;
use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

use crate::dao::models::{GameSnapshot, OutboxItemEntity};
use crate::dao::storage::{StorageError, StorageResult};
use crate::dao::store::{DurableStore, HISTORY_CAPACITY};

const CURRENT_KEY: &str = "current-game.json";
const HISTORY_KEY: &str = "games-history.json";
const OUTBOX_KEY: &str = "sync-outbox.json";

/// Durable store keeping one JSON file per logical slot under a data
/// directory. Writes go to a temp file first and are renamed into place, so
/// an interrupted write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StorageError::Write { key: CURRENT_KEY, source })?;
        Ok(Self { dir })
    }

    async fn read_slot<T>(&self, key: &'static str) -> StorageResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let path = self.dir.join(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StorageError::Read { key, source }),
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                // Corrupt content reads as absent; the slot will be
                // overwritten by the next snapshot.
                warn!(key, error = %err, "slot holds unparseable JSON; treating as empty");
                Ok(None)
            }
        }
    }

    async fn write_slot<T>(&self, key: &'static str, value: &T) -> StorageResult<()>
    where
        T: Serialize,
    {
        let bytes =
            serde_json::to_vec(value).map_err(|source| StorageError::Encode { key, source })?;
        let path = self.dir.join(key);
        let tmp = self.dir.join(format!("{key}.tmp"));
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|source| StorageError::Write { key, source })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| StorageError::Write { key, source })
    }

    async fn clear_slot(&self, key: &'static str) -> StorageResult<()> {
        match tokio::fs::remove_file(self.dir.join(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Write { key, source }),
        }
    }
}

impl DurableStore for JsonFileStore {
    fn write_current(&self, snapshot: GameSnapshot) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.write_slot(CURRENT_KEY, &snapshot).await })
    }

    fn read_current(&self) -> BoxFuture<'static, StorageResult<Option<GameSnapshot>>> {
        let store = self.clone();
        Box::pin(async move { store.read_slot(CURRENT_KEY).await })
    }

    fn clear_current(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.clear_slot(CURRENT_KEY).await })
    }

    fn append_history(&self, snapshot: GameSnapshot) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut history: Vec<GameSnapshot> =
                store.read_slot(HISTORY_KEY).await?.unwrap_or_default();
            history.push(snapshot);
            let overflow = history.len().saturating_sub(HISTORY_CAPACITY);
            if overflow > 0 {
                history.drain(..overflow);
            }
            store.write_slot(HISTORY_KEY, &history).await
        })
    }

    fn read_history(&self) -> BoxFuture<'static, StorageResult<Vec<GameSnapshot>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.read_slot(HISTORY_KEY).await?.unwrap_or_default()) })
    }

    fn read_outbox(&self) -> BoxFuture<'static, StorageResult<Vec<OutboxItemEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.read_slot(OUTBOX_KEY).await?.unwrap_or_default()) })
    }

    fn write_outbox(
        &self,
        items: Vec<OutboxItemEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.write_slot(OUTBOX_KEY, &items).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::{GameMode, GameState};

    fn snapshot() -> GameSnapshot {
        let mut game = GameState::new(GameMode::Basic, 10);
        game.home_team = "Hawks".into();
        game.away_team = "Comets".into();
        GameSnapshot::from(&game)
    }

    #[tokio::test]
    async fn current_slot_round_trips_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();

        assert!(store.read_current().await.unwrap().is_none());
        let snap = snapshot();
        store.write_current(snap.clone()).await.unwrap();
        assert_eq!(store.read_current().await.unwrap(), Some(snap));
        store.clear_current().await.unwrap();
        assert!(store.read_current().await.unwrap().is_none());
        // Clearing an absent slot is fine.
        store.clear_current().await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_current_slot_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        tokio::fs::write(dir.path().join(CURRENT_KEY), b"{not json")
            .await
            .unwrap();
        assert!(store.read_current().await.unwrap().is_none());
        // A fresh write replaces the corrupt content.
        store.write_current(snapshot()).await.unwrap();
        assert!(store.read_current().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn history_ring_evicts_oldest_beyond_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();

        let mut ids = Vec::new();
        for _ in 0..(HISTORY_CAPACITY + 3) {
            let snap = snapshot();
            ids.push(snap.id);
            store.append_history(snap).await.unwrap();
        }
        let history = store.read_history().await.unwrap();
        assert_eq!(history.len(), HISTORY_CAPACITY);
        // The three oldest entries were evicted.
        assert_eq!(history[0].id, ids[3]);
        assert_eq!(history.last().unwrap().id, *ids.last().unwrap());
    }

    #[tokio::test]
    async fn outbox_slot_round_trips() {
        use crate::dao::models::{GameRecord, SyncAction};
        use std::time::SystemTime;
        use uuid::Uuid;

        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        assert!(store.read_outbox().await.unwrap().is_empty());

        let game = GameState::new(GameMode::Basic, 10);
        let item = OutboxItemEntity {
            id: Uuid::new_v4(),
            action: SyncAction::CreateGame { game: GameRecord::from_state(&game, None) },
            enqueued_at: SystemTime::now(),
            retry_count: 0,
        };
        store.write_outbox(vec![item.clone()]).await.unwrap();
        assert_eq!(store.read_outbox().await.unwrap(), vec![item]);
    }
}
