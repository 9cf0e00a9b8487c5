//! `status`: remote quota and per-job sweep progress.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::{
    api::{ApiStatus, SportsApi},
    checkpoint::{CheckpointStore, FileCheckpointStore, JobLock},
    cli::types::JobKind,
    config::Settings,
    error::Result,
};

#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    pub job: JobKind,
    /// Entities finished in the current sweep
    pub completed: usize,
    /// Set only while a sweep is in progress
    pub sweep_started: Option<DateTime<Utc>>,
    pub last_progress: Option<DateTime<Utc>>,
    pub running: bool,
}

/// Quota as far as we could learn it. Never an error: `status` must work
/// without credentials.
#[derive(Debug, Clone, PartialEq)]
pub enum QuotaStatus {
    Known(ApiStatus),
    Unavailable(String),
}

pub fn job_statuses(checkpoints: &FileCheckpointStore, lock_dir: &Path) -> Result<Vec<JobStatus>> {
    JobKind::ALL
        .iter()
        .map(|&job| {
            let progress = checkpoints.load(job)?;
            let in_sweep = !progress.is_empty();
            Ok(JobStatus {
                job,
                completed: progress.completed.len(),
                sweep_started: in_sweep.then_some(progress.started_at),
                last_progress: in_sweep.then_some(progress.updated_at),
                running: JobLock::is_held(lock_dir, job),
            })
        })
        .collect()
}

pub async fn quota_status<A: SportsApi>(api: &A) -> QuotaStatus {
    match api.status().await {
        Ok(status) => QuotaStatus::Known(status),
        Err(e) => QuotaStatus::Unavailable(e.to_string()),
    }
}

pub async fn handle_status(settings: &Settings) -> Result<()> {
    let quota = match settings.api_client() {
        Ok(api) => quota_status(&api).await,
        Err(e) => QuotaStatus::Unavailable(e.to_string()),
    };

    println!("Season {}", settings.season);
    match quota {
        QuotaStatus::Known(s) => println!(
            "Quota: {}/{} used today, {} remaining",
            s.used,
            s.limit,
            s.remaining()
        ),
        QuotaStatus::Unavailable(reason) => println!("Quota: unavailable ({reason})"),
    }

    let checkpoints = FileCheckpointStore::new(settings.checkpoint_dir());
    for status in job_statuses(&checkpoints, &settings.lock_dir())? {
        let state = if status.running { "running" } else { "idle" };
        match status.last_progress {
            Some(at) => println!(
                "  {:<8} {:<8} {:>5} done this sweep, last progress {}",
                status.job,
                state,
                status.completed,
                at.format("%Y-%m-%d %H:%M UTC")
            ),
            None => println!("  {:<8} {:<8} no sweep in progress", status.job, state),
        }
    }
    Ok(())
}
