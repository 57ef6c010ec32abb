//! Durable store contract over the device-local persistence slots.

pub mod file;
pub mod memory;

use futures::future::BoxFuture;

use crate::dao::models::{GameSnapshot, OutboxItemEntity};
use crate::dao::storage::StorageResult;

/// Finalized games kept in the local history ring; oldest evicted first.
pub const HISTORY_CAPACITY: usize = 20;

/// Narrow key-value contract over three logical slots: the current game,
/// the finished-game history ring, and the sync outbox.
///
/// All writes are whole-snapshot overwrites; there are no partial-field
/// patches, so a failed write can never leave a half-updated record behind.
/// Backends report unreadable or corrupt content as absent rather than as an
/// error, since a stale snapshot is recoverable and a crash is not.
pub trait DurableStore: Send + Sync {
    /// Overwrite the current-game slot.
    fn write_current(&self, snapshot: GameSnapshot) -> BoxFuture<'static, StorageResult<()>>;
    /// Read the current-game slot; `None` when absent or unparseable.
    fn read_current(&self) -> BoxFuture<'static, StorageResult<Option<GameSnapshot>>>;
    /// Remove the current-game slot.
    fn clear_current(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Append a finalized snapshot to the history ring, evicting the oldest
    /// entries beyond [`HISTORY_CAPACITY`].
    fn append_history(&self, snapshot: GameSnapshot) -> BoxFuture<'static, StorageResult<()>>;
    /// Read the history ring, oldest first.
    fn read_history(&self) -> BoxFuture<'static, StorageResult<Vec<GameSnapshot>>>;
    /// Read the pending sync queue, oldest first.
    fn read_outbox(&self) -> BoxFuture<'static, StorageResult<Vec<OutboxItemEntity>>>;
    /// Overwrite the pending sync queue.
    fn write_outbox(&self, items: Vec<OutboxItemEntity>)
    -> BoxFuture<'static, StorageResult<()>>;
}
