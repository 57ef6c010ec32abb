//! Sync outbox: queued remote-write intents drained with bounded retry.

use std::collections::{HashMap, HashSet};
use std::time::SystemTime;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::dao::models::{GameRecord, OutboxItemEntity, SyncAction};
use crate::dao::storage::StorageResult;
use crate::dao::store::DurableStore;
use crate::services::remote::RemoteApi;
use crate::state::game::GameState;

/// Delivery attempts allowed per item before it is dropped as permanently
/// failed. Bounded retry, not backoff-forever.
pub const RETRY_CAP: u32 = 5;

/// Outcome counts for one drain pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Items acknowledged by the backend and removed.
    pub delivered: usize,
    /// Items that failed and stay queued for a later pass.
    pub retried: usize,
    /// Items dropped after exceeding [`RETRY_CAP`].
    pub dropped: usize,
}

/// Build one outbox item per logical remote write for a finalized game:
/// the game record, each closed quarter, and each recorded event.
pub fn items_for_finished_game(
    state: &GameState,
    location: Option<String>,
) -> Vec<OutboxItemEntity> {
    let enqueued_at = SystemTime::now();
    let new_item = |action: SyncAction| OutboxItemEntity {
        id: Uuid::new_v4(),
        action,
        enqueued_at,
        retry_count: 0,
    };

    let mut items = vec![new_item(SyncAction::CreateGame {
        game: GameRecord::from_state(state, location),
    })];
    items.extend(state.quarter_scores.iter().map(|quarter| {
        new_item(SyncAction::AppendQuarter {
            game_id: state.id,
            quarter: (*quarter).into(),
        })
    }));
    items.extend(state.events.iter().map(|event| {
        new_item(SyncAction::AppendEvent {
            game_id: state.id,
            event: event.clone().into(),
        })
    }));
    items
}

/// Append items to the persisted queue.
pub async fn enqueue(
    store: &dyn DurableStore,
    items: Vec<OutboxItemEntity>,
) -> StorageResult<()> {
    let mut queue = store.read_outbox().await?;
    queue.extend(items);
    store.write_outbox(queue).await
}

/// Drain the queue to exhaustion, sequentially per item.
///
/// A no-op while offline. Each item gets one delivery attempt per pass:
/// success removes it, failure increments its persisted retry count, and an
/// item reaching [`RETRY_CAP`] failures is dropped with a permanent-failure
/// log entry so one unreachable record cannot wedge the queue forever. A
/// failed item does not block delivery of the items behind it.
///
/// The write-back re-reads the persisted queue and removes only the items
/// this pass settled, so a game finalized while a delivery was in flight
/// keeps its queued writes.
pub async fn drain(
    store: &dyn DurableStore,
    remote: &dyn RemoteApi,
    online: bool,
) -> StorageResult<DrainReport> {
    let mut report = DrainReport::default();
    if !online {
        return Ok(report);
    }

    let queue = store.read_outbox().await?;
    if queue.is_empty() {
        return Ok(report);
    }
    info!(pending = queue.len(), "draining sync outbox");

    // Ids removed from the queue (delivered or dropped) and the new retry
    // counts for items staying queued.
    let mut settled = HashSet::new();
    let mut retried = HashMap::new();
    for item in queue {
        match attempt(remote, &item.action).await {
            Ok(()) => {
                settled.insert(item.id);
                report.delivered += 1;
            }
            Err(err) => {
                let retries = item.retry_count + 1;
                if retries >= RETRY_CAP {
                    error!(
                        item_id = %item.id,
                        retries,
                        error = %err,
                        "dropping outbox item after exceeding retry cap"
                    );
                    settled.insert(item.id);
                    report.dropped += 1;
                } else {
                    warn!(
                        item_id = %item.id,
                        retries,
                        error = %err,
                        "outbox delivery failed; item stays queued"
                    );
                    retried.insert(item.id, retries);
                    report.retried += 1;
                }
            }
        }
    }

    // Items enqueued while deliveries were in flight are unknown to this
    // pass and must survive untouched.
    let mut queue = store.read_outbox().await?;
    queue.retain(|item| !settled.contains(&item.id));
    for item in &mut queue {
        if let Some(retries) = retried.get(&item.id) {
            item.retry_count = *retries;
        }
    }
    store.write_outbox(queue).await?;
    Ok(report)
}

async fn attempt(
    remote: &dyn RemoteApi,
    action: &SyncAction,
) -> Result<(), crate::services::remote::SyncError> {
    match action {
        SyncAction::CreateGame { game } => {
            let remote_id = remote.create_game(game.clone()).await?;
            info!(game_id = %game.id, %remote_id, "game record created on backend");
            Ok(())
        }
        SyncAction::AppendQuarter { game_id, quarter } => {
            remote.append_quarter(*game_id, *quarter).await
        }
        SyncAction::AppendEvent { game_id, event } => {
            remote.append_event(*game_id, event.clone()).await
        }
    }
}
