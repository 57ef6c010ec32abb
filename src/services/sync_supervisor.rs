//! Drives outbox drains from connectivity changes and manual triggers.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::dao::store::DurableStore;
use crate::services::outbox;
use crate::services::remote::RemoteApi;

/// Handle used to request an outbox drain outside of connectivity changes
/// (the "sync now" button).
#[derive(Clone)]
pub struct SyncTrigger {
    tx: mpsc::UnboundedSender<()>,
}

impl SyncTrigger {
    /// Request a drain. Ignored if the supervisor has shut down.
    pub fn fire(&self) {
        let _ = self.tx.send(());
    }
}

/// Create the manual trigger handle and its receiving end for [`run`].
pub fn trigger_channel() -> (SyncTrigger, mpsc::UnboundedReceiver<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SyncTrigger { tx }, rx)
}

/// Supervise the sync outbox: drain on every offline-to-online transition
/// and on every manual trigger, sequentially, until both signal sources
/// close. Drains while offline are no-ops.
pub async fn run(
    store: Arc<dyn DurableStore>,
    remote: Arc<dyn RemoteApi>,
    mut online: watch::Receiver<bool>,
    mut manual: mpsc::UnboundedReceiver<()>,
) {
    if *online.borrow() {
        drain(store.as_ref(), remote.as_ref(), true).await;
    }
    loop {
        tokio::select! {
            changed = online.changed() => {
                if changed.is_err() {
                    debug!("connectivity channel closed; stopping sync supervisor");
                    return;
                }
                let is_online = *online.borrow_and_update();
                if is_online {
                    info!("network came back online; draining sync outbox");
                    drain(store.as_ref(), remote.as_ref(), true).await;
                }
            }
            trigger = manual.recv() => {
                match trigger {
                    Some(()) => {
                        let is_online = *online.borrow();
                        drain(store.as_ref(), remote.as_ref(), is_online).await;
                    }
                    None => {
                        debug!("manual trigger channel closed; stopping sync supervisor");
                        return;
                    }
                }
            }
        }
    }
}

async fn drain(store: &dyn DurableStore, remote: &dyn RemoteApi, online: bool) {
    match outbox::drain(store, remote, online).await {
        Ok(report) => {
            if report.delivered + report.retried + report.dropped > 0 {
                info!(
                    delivered = report.delivered,
                    retried = report.retried,
                    dropped = report.dropped,
                    "sync outbox drain finished"
                );
            }
        }
        Err(err) => warn!(error = %err, "sync outbox drain could not touch storage"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::{Duration, SystemTime};

    use futures::future::BoxFuture;
    use uuid::Uuid;

    use crate::dao::models::{
        GameEventEntity, GameRecord, OutboxItemEntity, QuarterScoreEntity, SyncAction,
    };
    use crate::dao::store::memory::MemoryStore;
    use crate::services::remote::SyncResult;
    use crate::state::game::{GameMode, GameState};

    #[derive(Default)]
    struct RecordingRemote {
        delivered: Mutex<Vec<Uuid>>,
    }

    impl RemoteApi for Arc<RecordingRemote> {
        fn create_game(&self, game: GameRecord) -> BoxFuture<'static, SyncResult<String>> {
            let remote = Arc::clone(self);
            Box::pin(async move {
                remote.delivered.lock().unwrap().push(game.id);
                Ok(game.id.to_string())
            })
        }

        fn append_quarter(
            &self,
            game_id: Uuid,
            _quarter: QuarterScoreEntity,
        ) -> BoxFuture<'static, SyncResult<()>> {
            let remote = Arc::clone(self);
            Box::pin(async move {
                remote.delivered.lock().unwrap().push(game_id);
                Ok(())
            })
        }

        fn append_event(
            &self,
            game_id: Uuid,
            _event: GameEventEntity,
        ) -> BoxFuture<'static, SyncResult<()>> {
            let remote = Arc::clone(self);
            Box::pin(async move {
                remote.delivered.lock().unwrap().push(game_id);
                Ok(())
            })
        }
    }

    fn create_item() -> OutboxItemEntity {
        let game = GameState::new(GameMode::Basic, 10);
        OutboxItemEntity {
            id: Uuid::new_v4(),
            action: SyncAction::CreateGame { game: GameRecord::from_state(&game, None) },
            enqueued_at: SystemTime::now(),
            retry_count: 0,
        }
    }

    async fn wait_for_empty_outbox(store: &MemoryStore) {
        tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                if store.read_outbox().await.unwrap().is_empty() {
                    return;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("outbox should drain");
    }

    #[tokio::test]
    async fn online_transition_triggers_drain() {
        let memory = MemoryStore::new();
        memory.write_outbox(vec![create_item()]).await.unwrap();
        let store: Arc<dyn DurableStore> = Arc::new(memory.clone());
        let remote = Arc::new(RecordingRemote::default());

        let (online_tx, online_rx) = watch::channel(false);
        let (_trigger, manual_rx) = trigger_channel();
        let supervisor = tokio::spawn(run(store, Arc::new(remote.clone()), online_rx, manual_rx));

        // Offline: queue untouched.
        tokio::task::yield_now().await;
        assert_eq!(memory.read_outbox().await.unwrap().len(), 1);

        online_tx.send(true).unwrap();
        wait_for_empty_outbox(&memory).await;
        assert_eq!(remote.delivered.lock().unwrap().len(), 1);
        supervisor.abort();
    }

    #[tokio::test]
    async fn manual_trigger_drains_while_online() {
        let memory = MemoryStore::new();
        memory.write_outbox(vec![create_item()]).await.unwrap();
        let store: Arc<dyn DurableStore> = Arc::new(memory.clone());
        let remote = Arc::new(RecordingRemote::default());

        // Starts online, so the initial drain clears the first item.
        let (_online_tx, online_rx) = watch::channel(true);
        let (trigger, manual_rx) = trigger_channel();
        let supervisor = tokio::spawn(run(store, Arc::new(remote.clone()), online_rx, manual_rx));
        wait_for_empty_outbox(&memory).await;

        memory.write_outbox(vec![create_item()]).await.unwrap();
        trigger.fire();
        wait_for_empty_outbox(&memory).await;
        assert_eq!(remote.delivered.lock().unwrap().len(), 2);
        supervisor.abort();
    }
}
