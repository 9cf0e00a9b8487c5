//! JSON-file checkpoint store.
//!
//! Persists one `SyncProgress` document per job at
//! `<dir>/<job>.json`. Writes go to `<job>.json.tmp` and are renamed over
//! the target so a crash mid-write never leaves a truncated checkpoint.

use std::{
    fs,
    path::{Path, PathBuf},
};

use super::{CheckpointStore, SyncProgress};
use crate::{cli::types::JobKind, error::Result};

#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, job: JobKind) -> PathBuf {
        self.dir.join(format!("{}.json", job.as_str()))
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self, job: JobKind) -> Result<SyncProgress> {
        let path = self.path_for(job);
        if !path.exists() {
            return Ok(SyncProgress::new(job));
        }
        let contents = fs::read_to_string(&path)?;
        match serde_json::from_str::<SyncProgress>(&contents) {
            Ok(progress) if progress.job == job => Ok(progress),
            Ok(_) | Err(_) => {
                // A corrupt or foreign file only costs a re-sweep.
                tracing::warn!(path = %path.display(), "Ignoring unreadable checkpoint");
                Ok(SyncProgress::new(job))
            }
        }
    }

    fn save(&self, progress: &SyncProgress) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(progress.job);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(progress)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn reset(&self, job: JobKind) -> Result<()> {
        let path = self.path_for(job);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
