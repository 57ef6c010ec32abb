//! Persistence layer: durable store contract, backends, and persisted entities.

pub mod models;
pub mod storage;
pub mod store;
