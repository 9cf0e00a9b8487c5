//! Command implementations for the football-sync CLI

pub mod backup;
pub mod cleanup;
pub mod restore;
pub mod schedule;
pub mod status;
pub mod sync;
pub mod watchdog;
