//! Football data sync engine
//!
//! Keeps a football data store (leagues, teams, squads, coaches, kit colors)
//! in step with API-Football while rationing a shared daily request quota.
//!
//! ## Features
//!
//! - **Quota-aware sync jobs**: every run checks the remote usage endpoint,
//!   reserves a safety margin and never exceeds its own call budget
//! - **Resumable sweeps**: per-job checkpoints on disk, so an interrupted run
//!   never re-spends quota on finished entities
//! - **Staleness ordering**: missing data first, then the oldest refresh
//! - **Scheduling**: interval, batch and chained modes with one instance per job
//! - **Backup/restore**: dependency-ordered snapshots of every table
//! - **Watchdog**: health-checked supervision of the serving process
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use football_sync::{
//!     checkpoint::FileCheckpointStore,
//!     config::Settings,
//!     sync::{SyncOptions, SyncOrchestrator},
//!     JobKind, Season,
//! };
//!
//! # async fn example() -> football_sync::Result<()> {
//! let settings = Settings::from_env()?;
//! let api = settings.api_client()?;
//! let store = settings.open_store()?;
//! let checkpoints = FileCheckpointStore::new(settings.checkpoint_dir());
//!
//! let mut opts = SyncOptions::new(JobKind::Squads, Season::new(2024));
//! opts.max_calls = 50;
//! let summary = SyncOrchestrator::new(&api, &store, &checkpoints)
//!     .run(&opts)
//!     .await?;
//! println!("synced {} teams", summary.synced);
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Configuration
//!
//! ```bash
//! export API_FOOTBALL_KEY=...
//! export STORE_URL=sqlite:/var/lib/football/store.db
//! ```

pub mod api;
pub mod checkpoint;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod storage;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use cli::types::{JobKind, LeagueId, PlayerId, Season, TeamId};
pub use config::{
    API_KEY_ENV_VAR, API_URL_ENV_VAR, DATA_DIR_ENV_VAR, LEAGUES_ENV_VAR, SEASON_ENV_VAR,
    STORE_KEY_ENV_VAR, STORE_URL_ENV_VAR,
};
pub use error::{Result, SyncError};
