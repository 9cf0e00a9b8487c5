//! CLI argument definitions and parsing structures.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use super::types::{JobKind, LeagueId, Season};
use crate::sync::DEFAULT_MAX_CALLS;

/// Per-run tuning shared by every command that drives the orchestrator.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Milliseconds between remote calls (never below the quota minimum).
    #[clap(long, default_value_t = 250)]
    pub delay: u64,

    /// Season year, e.g. 2024 for 2024/25 (or set `SYNC_SEASON`).
    #[clap(long, short)]
    pub season: Option<Season>,

    /// Also refresh entities still inside the staleness window.
    #[clap(long)]
    pub include_fresh: bool,

    /// Staleness window in days.
    #[clap(long, default_value_t = 30)]
    pub stale_days: i64,

    /// Only teams from this country (repeatable).
    #[clap(long = "country")]
    pub countries: Vec<String>,

    /// Only teams from this competition (repeatable). For the teams job this
    /// replaces `SYNC_LEAGUES`.
    #[clap(long = "league")]
    pub leagues: Vec<LeagueId>,
}

#[derive(Debug, Subcommand)]
pub enum ScheduleCmd {
    /// Run jobs once per period with a fixed budget each.
    Interval {
        /// Job to run each period (repeatable, default: squads).
        #[clap(long = "job")]
        jobs: Vec<JobKind>,

        /// Hours between rounds.
        #[clap(long, default_value_t = 12)]
        every_hours: u64,

        /// Remote-call budget per job per round.
        #[clap(long, default_value_t = DEFAULT_MAX_CALLS)]
        max: u32,

        /// Run a single round and exit.
        #[clap(long)]
        once: bool,

        #[clap(flatten)]
        run: RunArgs,
    },

    /// Walk one job's sweep in fixed-size batches with a pause in between.
    Batch {
        job: JobKind,

        /// Remote calls per batch.
        #[clap(long, default_value_t = 50)]
        batch_size: u32,

        /// Seconds between batches.
        #[clap(long, default_value_t = 60)]
        pause_secs: u64,

        /// Stop after this many batches even if the sweep is unfinished.
        #[clap(long)]
        max_batches: Option<u32>,

        #[clap(flatten)]
        run: RunArgs,
    },

    /// Run an ordered list of jobs back to back, one at a time.
    Chain {
        /// Jobs in order (repeatable, default: teams, coaches, squads, colors).
        #[clap(long = "job")]
        jobs: Vec<JobKind>,

        /// Hours between chain runs.
        #[clap(long, default_value_t = 24)]
        every_hours: u64,

        /// Remote-call budget per step.
        #[clap(long, default_value_t = DEFAULT_MAX_CALLS)]
        max: u32,

        /// Run the chain once and exit.
        #[clap(long)]
        once: bool,

        #[clap(flatten)]
        run: RunArgs,
    },
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one sync job until its budget or its work list runs out.
    Sync {
        /// teams, squads, coaches or colors
        job: JobKind,

        /// Maximum remote calls for this run.
        #[clap(long, default_value_t = DEFAULT_MAX_CALLS)]
        max: u32,

        #[clap(flatten)]
        run: RunArgs,
    },

    /// Long-running scheduler (interval, batch or chain mode).
    Schedule {
        #[clap(subcommand)]
        mode: ScheduleCmd,
    },

    /// Export every table into a timestamped snapshot directory.
    Backup {
        /// Parent directory for snapshots (default: `<data dir>/backups`).
        #[clap(long)]
        out: Option<PathBuf>,

        /// Restrict to these tables (repeatable).
        #[clap(long = "table")]
        tables: Vec<String>,
    },

    /// Upsert a snapshot back into the store.
    Restore {
        /// Snapshot directory written by `backup`.
        dir: PathBuf,

        /// Restrict to these tables (repeatable).
        #[clap(long = "table")]
        tables: Vec<String>,
    },

    /// Find orphaned and out-of-season squads; deletes only with --confirm.
    Cleanup {
        /// Seasons to keep, counting the current one.
        #[clap(long, default_value_t = 2)]
        keep_seasons: u16,

        /// Actually delete. Without it the command only reports.
        #[clap(long)]
        confirm: bool,
    },

    /// Show remote quota usage and per-job sweep progress.
    Status,

    /// Supervise a serving process through its health endpoint.
    Watchdog {
        /// Health endpoint expected to answer `{"status": "ok"}`.
        #[clap(long)]
        health_url: String,

        /// Seconds between health checks.
        #[clap(long, default_value_t = 15)]
        interval_secs: u64,

        /// Minimum seconds between two restarts.
        #[clap(long, default_value_t = 120)]
        cooldown_secs: u64,

        /// Per-check HTTP timeout in seconds.
        #[clap(long, default_value_t = 5)]
        timeout_secs: u64,

        /// Command that starts the serving process.
        #[clap(last = true, required = true)]
        command: Vec<String>,
    },
}

/// Keeps a football data store in sync with API-Football under a daily quota.
#[derive(Debug, Parser)]
#[clap(name = "football-sync", version, about)]
pub struct FootballSync {
    #[clap(subcommand)]
    pub command: Commands,
}
