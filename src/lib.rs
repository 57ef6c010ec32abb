//! Live game-state engine for basketball scoreboards: the scoring and
//! quarter state machine, countdown clocks, durable local persistence with
//! recovery, and an outbox-style sync queue toward the remote backend.

pub mod clock;
pub mod config;
pub mod dao;
pub mod error;
pub mod services;
pub mod state;
