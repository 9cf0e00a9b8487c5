//! Durable per-job sweep progress.
//!
//! A sweep is one full pass over a job's candidate list. The checkpoint
//! records which entities the current sweep already finished so an
//! interrupted run resumes without re-spending quota on them.

pub mod file;
pub mod lock;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{cli::types::JobKind, error::Result};

pub use file::FileCheckpointStore;
pub use lock::JobLock;

/// Progress of the current sweep of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncProgress {
    pub job: JobKind,
    /// Entity IDs (teams, or leagues for the catalog job) finished this sweep.
    pub completed: BTreeSet<u32>,
    /// Number of entities processed so far in this sweep.
    pub cursor: usize,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SyncProgress {
    pub fn new(job: JobKind) -> Self {
        let now = Utc::now();
        Self {
            job,
            completed: BTreeSet::new(),
            cursor: 0,
            started_at: now,
            updated_at: now,
        }
    }

    pub fn is_done(&self, id: u32) -> bool {
        self.completed.contains(&id)
    }

    /// Returns false if `id` was already recorded.
    pub fn record(&mut self, id: u32) -> bool {
        let inserted = self.completed.insert(id);
        if inserted {
            self.cursor += 1;
        }
        self.updated_at = Utc::now();
        inserted
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }
}

/// Storage for sweep progress. Each job owns its own record, so there is
/// no cross-job contention.
pub trait CheckpointStore {
    /// Current progress, or a fresh record if none was persisted.
    fn load(&self, job: JobKind) -> Result<SyncProgress>;

    fn save(&self, progress: &SyncProgress) -> Result<()>;

    /// Forget progress once a sweep completed.
    fn reset(&self, job: JobKind) -> Result<()>;

    /// Record `id` as finished and persist before returning.
    fn mark_done(&self, job: JobKind, id: u32) -> Result<()> {
        let mut progress = self.load(job)?;
        if progress.record(id) {
            self.save(&progress)?;
        }
        Ok(())
    }

    fn is_done(&self, job: JobKind, id: u32) -> Result<bool> {
        Ok(self.load(job)?.is_done(id))
    }
}
