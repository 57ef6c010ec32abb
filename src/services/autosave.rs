//! Periodic snapshot writer for the current-game slot.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::warn;

use crate::state::SharedScoreboard;

/// Snapshot cadence while a game is in progress. Writing on a fixed cadence
/// instead of per mutation bounds write amplification during scoring bursts
/// and bounds recovery loss to one interval.
pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(2);

/// Write the current snapshot every [`AUTOSAVE_INTERVAL`] while the game is
/// `Live` or `Overtime`. Runs until the owning task is aborted; a write
/// failure is logged and gameplay continues, since the durable store is an
/// optimization and not the source of truth for the active session.
///
/// Writes go through [`SharedScoreboard::persist_if_in_progress`] so a game
/// finished mid-write cannot be resurrected into the cleared slot.
pub async fn run(board: SharedScoreboard) {
    let mut interval = tokio::time::interval(AUTOSAVE_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        if let Err(err) = board.persist_if_in_progress().await {
            warn!(error = %err, "autosave failed; keeping previous snapshot");
        }
    }
}
