//! Run summaries: the closing log line and the JSON report file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    cli::types::{JobKind, Season},
    error::Result,
};

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The remote quota had nothing left above the safety margin
    QuotaUnavailable,
    /// Every candidate was already fresh or finished
    NoCandidates,
    /// The run budget or the remote quota ran out mid-sweep
    BudgetExhausted,
    /// The whole candidate list was processed
    SweepComplete,
    /// A fatal error ended the run early
    Aborted,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::QuotaUnavailable => "quota_unavailable",
            StopReason::NoCandidates => "no_candidates",
            StopReason::BudgetExhausted => "budget_exhausted",
            StopReason::SweepComplete => "sweep_complete",
            StopReason::Aborted => "aborted",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub job: JobKind,
    pub season: Season,
    pub candidates: usize,
    pub synced: u32,
    pub no_data: u32,
    /// Fetch failures
    pub failed: u32,
    /// Store read or write failures, tallied apart from fetch failures
    pub store_failed: u32,
    /// Entities that failed and will be retried next sweep
    pub failed_ids: Vec<u32>,
    pub calls: u32,
    pub remaining: u32,
    pub stop: StopReason,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn new(job: JobKind, season: Season) -> Self {
        let now = Utc::now();
        Self {
            job,
            season,
            candidates: 0,
            synced: 0,
            no_data: 0,
            failed: 0,
            store_failed: 0,
            failed_ids: Vec::new(),
            calls: 0,
            remaining: 0,
            stop: StopReason::NoCandidates,
            started_at: now,
            finished_at: now,
        }
    }

    pub fn finish(&mut self, stop: StopReason, calls: u32, remaining: u32) {
        self.stop = stop;
        self.calls = calls;
        self.remaining = remaining;
        self.finished_at = Utc::now();
    }

    /// One greppable line per run.
    pub fn log(&self) {
        tracing::info!(
            job = %self.job,
            season = %self.season,
            remaining = self.remaining,
            "synced={} no_data={} failed={} store_failed={} calls={} stop={}",
            self.synced,
            self.no_data,
            self.failed,
            self.store_failed,
            self.calls,
            self.stop
        );
    }

    /// Write the summary to `<data_dir>/reports/<job>-<timestamp>.json`.
    pub fn write_report(&self, data_dir: &Path) -> Result<PathBuf> {
        let dir = data_dir.join("reports");
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!(
            "{}-{}.json",
            self.job,
            self.finished_at.format("%Y%m%dT%H%M%SZ")
        ));
        fs::write(&path, serde_json::to_vec_pretty(self)?)?;
        Ok(path)
    }
}
