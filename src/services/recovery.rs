//! Recovery of an interrupted game from the current-game slot.

use std::time::{Duration, SystemTime};

use time::OffsetDateTime;
use time::format_description::well_known::Rfc2822;
use tracing::{info, warn};

use crate::dao::models::GameSnapshot;
use crate::dao::store::DurableStore;
use crate::state::game::GameMode;

/// Snapshots younger than this resume silently.
pub const RESUME_WINDOW: Duration = Duration::from_secs(60 * 60);
/// Snapshots younger than this (but past the resume window) prompt the user;
/// anything older is discarded.
pub const STALE_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Three-way decision for an inspected current-game slot.
///
/// The user-confirmation side effect for [`PromptResume`] belongs to the
/// caller; this module only classifies.
///
/// [`PromptResume`]: RecoveryDecision::PromptResume
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryDecision {
    /// Nothing to resume: slot empty, wrong scoreboard variant, or stale.
    NotRecoverable,
    /// Fresh snapshot; resume silently.
    AutoResume(GameSnapshot),
    /// Aging snapshot; resume only after user confirmation.
    PromptResume(GameSnapshot),
}

/// Classify a snapshot by its age alone. Pure; testable without storage.
///
/// A `last_modified` in the future (clock skew) counts as age zero.
pub fn evaluate(snapshot: GameSnapshot, now: SystemTime) -> RecoveryDecision {
    let age = now
        .duration_since(snapshot.last_modified)
        .unwrap_or(Duration::ZERO);
    if age < RESUME_WINDOW {
        RecoveryDecision::AutoResume(snapshot)
    } else if age < STALE_WINDOW {
        RecoveryDecision::PromptResume(snapshot)
    } else {
        RecoveryDecision::NotRecoverable
    }
}

/// Inspect the current-game slot for the scoreboard variant being opened.
///
/// Stale snapshots are cleared from the slot. A snapshot recorded by the
/// other variant is left in place but never offered (mode isolation).
pub async fn inspect(store: &dyn DurableStore, mode: GameMode) -> RecoveryDecision {
    let snapshot = match store.read_current().await {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => return RecoveryDecision::NotRecoverable,
        Err(err) => {
            warn!(error = %err, "could not read current-game slot; starting fresh");
            return RecoveryDecision::NotRecoverable;
        }
    };

    if snapshot.mode != mode {
        info!(
            saved_mode = ?snapshot.mode,
            opened_mode = ?mode,
            "current-game slot belongs to the other scoreboard variant; leaving it"
        );
        return RecoveryDecision::NotRecoverable;
    }

    let decision = evaluate(snapshot, SystemTime::now());
    if decision == RecoveryDecision::NotRecoverable {
        info!("current-game slot is stale; clearing it");
        if let Err(err) = store.clear_current().await {
            warn!(error = %err, "failed to clear stale current-game slot");
        }
    }
    decision
}

/// Clear the slot after the user declined a prompted resume.
pub async fn discard(store: &dyn DurableStore) {
    if let Err(err) = store.clear_current().await {
        warn!(error = %err, "failed to clear declined current-game slot");
    }
}

/// Human-readable save time for the resume prompt.
pub fn describe_saved_at(snapshot: &GameSnapshot) -> String {
    let saved = OffsetDateTime::from(snapshot.last_modified);
    saved
        .format(&Rfc2822)
        .unwrap_or_else(|_| format!("{saved:?}"))
}
