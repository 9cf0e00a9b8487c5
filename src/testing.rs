//! Scripted [`SportsApi`] for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde_json::json;

use crate::{
    api::{
        types::{
            ApiStatus, CoachEntry, FixtureRef, KitColors, LeagueEntry, SquadEntry, TeamEntry,
        },
        SportsApi,
    },
    cli::types::{LeagueId, Season, TeamId},
    error::{Result, SyncError},
};

/// Answers from in-memory maps and records every call it receives.
#[derive(Default)]
pub struct FakeApi {
    pub status: Option<ApiStatus>,
    pub leagues: HashMap<LeagueId, LeagueEntry>,
    pub teams: HashMap<LeagueId, Vec<TeamEntry>>,
    pub squads: HashMap<TeamId, SquadEntry>,
    pub coaches: HashMap<TeamId, CoachEntry>,
    pub fixtures: HashMap<TeamId, u64>,
    pub kits: HashMap<u64, KitColors>,
    /// Teams whose lookups fail with a 503
    pub failing: HashSet<TeamId>,
    /// Teams whose lookups hit the daily request limit
    pub over_limit: HashSet<TeamId>,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn with_quota(used: u32, limit: u32) -> Self {
        Self {
            status: Some(ApiStatus { used, limit }),
            ..Default::default()
        }
    }

    pub fn coach(mut self, team: u32, name: &str) -> Self {
        let entry: CoachEntry = serde_json::from_value(json!({
            "id": team * 10,
            "name": name,
            "career": [{"team": {"id": team}, "start": "2023-07-01", "end": null}]
        }))
        .unwrap();
        self.coaches.insert(TeamId::new(team), entry);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, team: TeamId) -> Result<()> {
        if self.over_limit.contains(&team) {
            return Err(SyncError::QuotaExhausted {
                message: "requests: You have reached the request limit for the day".to_string(),
            });
        }
        if self.failing.contains(&team) {
            return Err(SyncError::Api {
                status: 503,
                message: "upstream unavailable".to_string(),
            });
        }
        Ok(())
    }
}

impl SportsApi for FakeApi {
    async fn status(&self) -> Result<ApiStatus> {
        self.status.ok_or_else(|| SyncError::QuotaUnavailable {
            reason: "status endpoint down".to_string(),
        })
    }

    async fn league(&self, league: LeagueId, _season: Season) -> Result<Option<LeagueEntry>> {
        self.log(format!("league:{league}"));
        Ok(self.leagues.get(&league).cloned())
    }

    async fn teams(&self, league: LeagueId, _season: Season) -> Result<Vec<TeamEntry>> {
        self.log(format!("teams:{league}"));
        Ok(self.teams.get(&league).cloned().unwrap_or_default())
    }

    async fn squad(&self, team: TeamId) -> Result<Option<SquadEntry>> {
        self.log(format!("squad:{team}"));
        self.check(team)?;
        Ok(self.squads.get(&team).cloned())
    }

    async fn coach(&self, team: TeamId) -> Result<Option<CoachEntry>> {
        self.log(format!("coach:{team}"));
        self.check(team)?;
        Ok(self.coaches.get(&team).cloned())
    }

    async fn last_fixture(&self, team: TeamId) -> Result<Option<FixtureRef>> {
        self.log(format!("fixture:{team}"));
        self.check(team)?;
        Ok(self.fixtures.get(&team).map(|&id| FixtureRef { id }))
    }

    async fn lineup_colors(&self, fixture: u64, team: TeamId) -> Result<Option<KitColors>> {
        self.log(format!("lineup:{fixture}:{team}"));
        Ok(self.kits.get(&fixture).cloned())
    }
}
