//! `sync <job>`: one guarded orchestrator run.

use std::time::Duration;

use chrono::Duration as ChronoDuration;

use crate::{
    api::SportsApi,
    checkpoint::{lock::DEFAULT_LOCK_TTL, FileCheckpointStore, JobLock},
    cli::{types::JobKind, RunArgs},
    config::Settings,
    error::Result,
    storage::EntityStore,
    sync::{RunSummary, SyncOptions, SyncOrchestrator},
};

/// Turn CLI run arguments into orchestrator options for `job`.
pub fn build_options(
    settings: &Settings,
    job: JobKind,
    max_calls: u32,
    run: &RunArgs,
) -> SyncOptions {
    let mut opts = SyncOptions::new(job, run.season.unwrap_or(settings.season));
    opts.max_calls = max_calls;
    opts.delay = Duration::from_millis(run.delay);
    opts.leagues = if run.leagues.is_empty() {
        settings.leagues.clone()
    } else {
        run.leagues.clone()
    };
    opts.selection.include_fresh = run.include_fresh;
    opts.selection.staleness_window = ChronoDuration::days(run.stale_days.max(0));
    opts.selection.countries = run.countries.clone();
    opts.selection.leagues = run.leagues.clone();
    opts
}

/// Run one job under its lock and write the run report.
///
/// A second concurrent run of the same job fails with `LockHeld` before
/// touching the checkpoint.
pub async fn run_job<A: SportsApi, S: EntityStore>(
    settings: &Settings,
    api: &A,
    store: &S,
    opts: &SyncOptions,
) -> Result<RunSummary> {
    let _lock = JobLock::acquire(&settings.lock_dir(), opts.job, DEFAULT_LOCK_TTL)?;
    let checkpoints = FileCheckpointStore::new(settings.checkpoint_dir());
    let summary = SyncOrchestrator::new(api, store, &checkpoints)
        .run(opts)
        .await?;

    match summary.write_report(&settings.data_dir) {
        Ok(path) => tracing::debug!(path = %path.display(), "Run report written"),
        Err(e) => tracing::warn!(error = %e, "Could not write run report"),
    }
    Ok(summary)
}

pub async fn handle_sync(settings: &Settings, job: JobKind, max: u32, run: RunArgs) -> Result<()> {
    let api = settings.api_client()?;
    let store = settings.open_store()?;
    store.ping().await?;

    let opts = build_options(settings, job, max, &run);
    let summary = run_job(settings, &api, &store, &opts).await?;
    println!(
        "✓ {}: synced={} no_data={} failed={} store_failed={} calls={} ({})",
        summary.job,
        summary.synced,
        summary.no_data,
        summary.failed,
        summary.store_failed,
        summary.calls,
        summary.stop
    );
    Ok(())
}
