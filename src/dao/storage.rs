//! Errors shared by every durable store backend.

use thiserror::Error;

/// Result alias for durable store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by a durable store backend.
///
/// Callers treat these as degraded-mode conditions: they are logged and the
/// in-memory game state stays authoritative. A failed write leaves the
/// previously persisted snapshot intact.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading a slot failed below the serialization layer.
    #[error("failed to read `{key}`: {source}")]
    Read {
        /// Logical key of the slot.
        key: &'static str,
        #[source]
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// Writing a slot failed (quota, permissions, disk).
    #[error("failed to write `{key}`: {source}")]
    Write {
        /// Logical key of the slot.
        key: &'static str,
        #[source]
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// Serializing a snapshot for a slot failed.
    #[error("failed to encode `{key}`: {source}")]
    Encode {
        /// Logical key of the slot.
        key: &'static str,
        #[source]
        /// Underlying serialization failure.
        source: serde_json::Error,
    },
}
