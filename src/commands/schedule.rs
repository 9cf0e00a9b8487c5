//! Long-running scheduler: interval, batch and chain modes.
//!
//! Every mode drives the same in-process [`run_job`], one job at a time,
//! so jobs sharing the daily quota never race each other. A failing step
//! is logged and the schedule moves on; only Ctrl-C ends an indefinite
//! schedule.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use super::sync::{build_options, run_job};
use crate::{
    api::SportsApi,
    cli::{types::JobKind, RunArgs},
    config::Settings,
    error::{Result, SyncError},
    storage::EntityStore,
    sync::{RunSummary, StopReason},
};

const SECS_PER_HOUR: u64 = 60 * 60;

/// Outcome of one step in a round.
#[derive(Debug)]
pub enum StepResult {
    Completed(RunSummary),
    /// Another instance of the job holds its lock
    Skipped,
    Failed(String),
}

/// Run `jobs` sequentially with `max_calls` each. Step failures are logged
/// and do not stop the round.
pub async fn run_round<A: SportsApi, S: EntityStore>(
    settings: &Settings,
    api: &A,
    store: &S,
    jobs: &[JobKind],
    max_calls: u32,
    run: &RunArgs,
) -> Vec<(JobKind, StepResult)> {
    let mut results = Vec::with_capacity(jobs.len());
    for &job in jobs {
        let opts = build_options(settings, job, max_calls, run);
        let step = match run_job(settings, api, store, &opts).await {
            Ok(summary) => StepResult::Completed(summary),
            Err(SyncError::LockHeld { since, .. }) => {
                tracing::warn!(job = %job, since = %since, "Job already running, skipping");
                StepResult::Skipped
            }
            Err(e) => {
                tracing::error!(job = %job, error = %e, "Job failed, continuing with next step");
                StepResult::Failed(e.to_string())
            }
        };
        results.push((job, step));
    }
    results
}

/// Run a batch sweep: repeated runs of `job` with `batch_size` calls each,
/// pausing between batches, until the sweep finishes, quota runs out or
/// `max_batches` is reached. Returns the number of batches run.
pub async fn run_batches<A: SportsApi, S: EntityStore>(
    settings: &Settings,
    api: &A,
    store: &S,
    job: JobKind,
    batch_size: u32,
    pause: Duration,
    max_batches: Option<u32>,
    run: &RunArgs,
) -> Result<u32> {
    let opts = build_options(settings, job, batch_size, run);
    let mut batches = 0;
    loop {
        batches += 1;
        let summary = run_job(settings, api, store, &opts).await?;
        tracing::info!(
            job = %job,
            batch = batches,
            synced = summary.synced,
            calls = summary.calls,
            "Batch finished"
        );

        // Anything but a spent batch budget means the sweep is over for now.
        if summary.stop != StopReason::BudgetExhausted || summary.calls == 0 {
            break;
        }
        if max_batches.is_some_and(|max| batches >= max) {
            tracing::info!(job = %job, batches, "Batch limit reached");
            break;
        }
        sleep(pause).await;
    }
    Ok(batches)
}

/// Await `fut` unless Ctrl-C arrives first, in which case `None`.
async fn interrupted<F: Future>(fut: F) -> Option<F::Output> {
    tokio::select! {
        out = fut => Some(out),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupt received, stopping scheduler");
            None
        }
    }
}

async fn run_forever<A: SportsApi, S: EntityStore>(
    settings: &Settings,
    api: &A,
    store: &S,
    jobs: Vec<JobKind>,
    every: Duration,
    max_calls: u32,
    once: bool,
    run: &RunArgs,
) -> Result<()> {
    let mut round = 0u64;
    loop {
        round += 1;
        tracing::info!(round, jobs = ?jobs, "Starting scheduled round");
        let Some(results) =
            interrupted(run_round(settings, api, store, &jobs, max_calls, run)).await
        else {
            return Ok(());
        };
        let failed = results
            .iter()
            .filter(|(_, r)| matches!(r, StepResult::Failed(_)))
            .count();
        tracing::info!(round, steps = results.len(), failed, "Round finished");

        if once {
            return Ok(());
        }
        tracing::info!(next_in_secs = every.as_secs(), "Sleeping until next round");
        if interrupted(sleep(every)).await.is_none() {
            return Ok(());
        }
    }
}

pub async fn handle_interval(
    settings: &Settings,
    jobs: Vec<JobKind>,
    every_hours: u64,
    max: u32,
    once: bool,
    run: RunArgs,
) -> Result<()> {
    let api = settings.api_client()?;
    let store = settings.open_store()?;
    store.ping().await?;

    let jobs = if jobs.is_empty() {
        vec![JobKind::Squads]
    } else {
        jobs
    };
    let every = Duration::from_secs(every_hours.max(1) * SECS_PER_HOUR);
    run_forever(settings, &api, &store, jobs, every, max, once, &run).await
}

pub async fn handle_chain(
    settings: &Settings,
    jobs: Vec<JobKind>,
    every_hours: u64,
    max: u32,
    once: bool,
    run: RunArgs,
) -> Result<()> {
    let api = settings.api_client()?;
    let store = settings.open_store()?;
    store.ping().await?;

    let jobs = if jobs.is_empty() {
        JobKind::default_chain()
    } else {
        jobs
    };
    let every = Duration::from_secs(every_hours.max(1) * SECS_PER_HOUR);
    run_forever(settings, &api, &store, jobs, every, max, once, &run).await
}

pub async fn handle_batch(
    settings: &Settings,
    job: JobKind,
    batch_size: u32,
    pause_secs: u64,
    max_batches: Option<u32>,
    run: RunArgs,
) -> Result<()> {
    let api = settings.api_client()?;
    let store = settings.open_store()?;
    store.ping().await?;

    let pause = Duration::from_secs(pause_secs);
    let batches = interrupted(run_batches(
        settings,
        &api,
        &store,
        job,
        batch_size.max(1),
        pause,
        max_batches,
        &run,
    ))
    .await
    .transpose()?;
    if let Some(batches) = batches {
        println!("✓ {job}: {batches} batch(es) run");
    }
    Ok(())
}
