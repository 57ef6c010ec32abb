//! Service layer: recovery, autosave, and remote synchronization.

pub mod autosave;
pub mod outbox;
pub mod recovery;
pub mod remote;
pub mod sync_supervisor;
