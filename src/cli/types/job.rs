//! Named sync jobs.

use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named sync job. Each job owns its own checkpoint file and lock, and
/// at most one instance of a given job runs at a time.
///
/// # Examples
///
/// ```rust
/// use football_sync::JobKind;
///
/// let job: JobKind = "squads".parse().unwrap();
/// assert_eq!(job, JobKind::Squads);
/// assert_eq!(job.calls_per_entity(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Refresh the team catalog from the configured leagues.
    Teams,
    /// Refresh the coach name on each team.
    Coaches,
    /// Replace each team's squad for the season.
    Squads,
    /// Refresh kit colors from the team's latest lineup.
    Colors,
}

impl JobKind {
    pub const ALL: [JobKind; 4] = [
        JobKind::Teams,
        JobKind::Coaches,
        JobKind::Squads,
        JobKind::Colors,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Teams => "teams",
            JobKind::Coaches => "coaches",
            JobKind::Squads => "squads",
            JobKind::Colors => "colors",
        }
    }

    /// Remote calls needed to fully process one entity.
    pub fn calls_per_entity(&self) -> u32 {
        match self {
            JobKind::Teams => 2,  // league details, then its teams
            JobKind::Colors => 2, // last fixture, then its lineup
            JobKind::Coaches | JobKind::Squads => 1,
        }
    }

    /// Order used by the chained scheduler: the catalog first, then the
    /// cheap per-team jobs, then the expensive one.
    pub fn default_chain() -> Vec<JobKind> {
        vec![
            JobKind::Teams,
            JobKind::Coaches,
            JobKind::Squads,
            JobKind::Colors,
        ]
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "teams" | "catalog" => Ok(JobKind::Teams),
            "coaches" | "coach" => Ok(JobKind::Coaches),
            "squads" | "squad" | "rosters" => Ok(JobKind::Squads),
            "colors" | "colours" => Ok(JobKind::Colors),
            other => Err(SyncError::UnknownJob {
                name: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_kind_round_trip_names() {
        for job in JobKind::ALL {
            assert_eq!(job.as_str().parse::<JobKind>().unwrap(), job);
        }
    }

    #[test]
    fn test_job_kind_aliases() {
        assert_eq!("Rosters".parse::<JobKind>().unwrap(), JobKind::Squads);
        assert_eq!("colours".parse::<JobKind>().unwrap(), JobKind::Colors);
    }

    #[test]
    fn test_unknown_job() {
        match "fixtures".parse::<JobKind>() {
            Err(SyncError::UnknownJob { name }) => assert_eq!(name, "fixtures"),
            other => panic!("Expected UnknownJob, got {:?}", other),
        }
    }

    #[test]
    fn test_default_chain_starts_with_catalog() {
        let chain = JobKind::default_chain();
        assert_eq!(chain.first(), Some(&JobKind::Teams));
        assert_eq!(chain.len(), 4);
    }
}
