//! Stateless subsystems the coordinator calls into.

pub mod archive;
pub mod prefs;
pub mod purge;
pub mod registry;
pub mod secrets;
