//! Core modules for profilectl's store lifecycle.
//!
//! Shared primitives (errors, configuration, layout, the storage backend,
//! events and the work queue) and the coordinator that sequences every
//! store transition live here.

pub mod config;
pub mod coordinator;
pub mod db;
pub mod error;
pub mod events;
pub mod journal;
pub mod profile;
pub mod queue;
pub mod schemas;
pub mod store;
pub mod time;
