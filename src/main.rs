//! Entry point: parse CLI and dispatch to command handlers.

use anyhow::Context;
use clap::Parser;
use football_sync::{
    cli::{Commands, FootballSync, ScheduleCmd},
    commands::{
        backup::handle_backup,
        cleanup::handle_cleanup,
        restore::handle_restore,
        schedule::{handle_batch, handle_chain, handle_interval},
        status::handle_status,
        sync::handle_sync,
        watchdog::handle_watchdog,
    },
    config::Settings,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Run the CLI.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let app = FootballSync::parse();

    // The watchdog supervises a process, not the store, so it never loads settings.
    let settings = || Settings::from_env().context("invalid configuration");

    match app.command {
        Commands::Sync { job, max, run } => handle_sync(&settings()?, job, max, run)
            .await
            .with_context(|| format!("sync {job} failed"))?,

        Commands::Schedule { mode } => match mode {
            ScheduleCmd::Interval {
                jobs,
                every_hours,
                max,
                once,
                run,
            } => handle_interval(&settings()?, jobs, every_hours, max, once, run)
                .await
                .context("interval scheduler failed")?,

            ScheduleCmd::Batch {
                job,
                batch_size,
                pause_secs,
                max_batches,
                run,
            } => handle_batch(&settings()?, job, batch_size, pause_secs, max_batches, run)
                .await
                .with_context(|| format!("batch sweep of {job} failed"))?,

            ScheduleCmd::Chain {
                jobs,
                every_hours,
                max,
                once,
                run,
            } => handle_chain(&settings()?, jobs, every_hours, max, once, run)
                .await
                .context("chained scheduler failed")?,
        },

        Commands::Backup { out, tables } => handle_backup(&settings()?, out, tables)
            .await
            .context("backup failed")?,

        Commands::Restore { dir, tables } => handle_restore(&settings()?, &dir, tables)
            .await
            .with_context(|| format!("restore from {} failed", dir.display()))?,

        Commands::Cleanup {
            keep_seasons,
            confirm,
        } => handle_cleanup(&settings()?, keep_seasons, confirm)
            .await
            .context("cleanup failed")?,

        Commands::Status => handle_status(&settings()?)
            .await
            .context("status failed")?,

        Commands::Watchdog {
            health_url,
            interval_secs,
            cooldown_secs,
            timeout_secs,
            command,
        } => handle_watchdog(health_url, interval_secs, cooldown_secs, timeout_secs, command)
            .await
            .context("watchdog failed")?,
    }

    Ok(())
}
