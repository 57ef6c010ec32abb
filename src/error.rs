//! Error taxonomy for the engine: rule violations, storage failures, sync failures.

use thiserror::Error;

use crate::{dao::storage::StorageError, services::remote::SyncError};

/// Errors raised by the game state machine when a rule would be violated.
///
/// Both variants abort the operation with no partial mutation applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// A state-changing operation requires data that is missing or invalid.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Undo was attempted on an event belonging to an already-closed quarter.
    ///
    /// Closed quarters are an immutable ledger, matching official
    /// scorekeeping practice; the rejection is the intended behavior.
    #[error("cannot undo event from closed quarter {event_quarter} while quarter {live_quarter} is open")]
    LockedQuarter {
        /// Quarter the rejected event was recorded in.
        event_quarter: u32,
        /// Quarter currently open on the scoreboard.
        live_quarter: u32,
    },
}

/// Umbrella error for callers embedding the whole engine.
///
/// Inside the engine, persistence and sync failures are logged and absorbed
/// (the in-memory game is authoritative); this type exists for API surfaces
/// that want to report them anyway.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A game rule rejected the operation.
    #[error(transparent)]
    Game(#[from] GameError),
    /// The durable store failed to read or write a slot.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A remote delivery attempt failed.
    #[error(transparent)]
    Sync(#[from] SyncError),
}
