//! In-memory durable store for tests and embedded use.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;

use crate::dao::models::{GameSnapshot, OutboxItemEntity};
use crate::dao::storage::StorageResult;
use crate::dao::store::{DurableStore, HISTORY_CAPACITY};

#[derive(Debug, Default)]
struct Slots {
    current: Option<GameSnapshot>,
    history: Vec<GameSnapshot>,
    outbox: Vec<OutboxItemEntity>,
}

/// Durable store backed by process memory. Infallible; useful as a substitute
/// for the file store in tests and for callers that manage persistence
/// themselves.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: Arc<Mutex<Slots>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the current-game slot, bypassing the trait. Test helper.
    pub fn seed_current(&self, snapshot: GameSnapshot) {
        self.lock().current = Some(snapshot);
    }

    /// Peek at the current-game slot without going through the trait.
    pub fn current(&self) -> Option<GameSnapshot> {
        self.lock().current.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DurableStore for MemoryStore {
    fn write_current(&self, snapshot: GameSnapshot) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.lock().current = Some(snapshot);
            Ok(())
        })
    }

    fn read_current(&self) -> BoxFuture<'static, StorageResult<Option<GameSnapshot>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.lock().current.clone()) })
    }

    fn clear_current(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.lock().current = None;
            Ok(())
        })
    }

    fn append_history(&self, snapshot: GameSnapshot) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut slots = store.lock();
            slots.history.push(snapshot);
            let overflow = slots.history.len().saturating_sub(HISTORY_CAPACITY);
            if overflow > 0 {
                slots.history.drain(..overflow);
            }
            Ok(())
        })
    }

    fn read_history(&self) -> BoxFuture<'static, StorageResult<Vec<GameSnapshot>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.lock().history.clone()) })
    }

    fn read_outbox(&self) -> BoxFuture<'static, StorageResult<Vec<OutboxItemEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.lock().outbox.clone()) })
    }

    fn write_outbox(
        &self,
        items: Vec<OutboxItemEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.lock().outbox = items;
            Ok(())
        })
    }
}
