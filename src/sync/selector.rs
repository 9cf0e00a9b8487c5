//! Work-list selection: which entities deserve a refresh, in what order.
//!
//! Never-synced entities come first, then entities older than the
//! staleness window (oldest first), then, only when asked for, fresh ones.
//! Entities already finished in the current sweep are excluded so a
//! resumed run picks up exactly where the interrupted one stopped.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::{
    checkpoint::SyncProgress,
    cli::types::{JobKind, LeagueId, Season, TeamId},
    storage::{CompetitionTier, Team},
};

pub const DEFAULT_STALENESS_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Staleness {
    /// No stored data and never checked
    Missing,
    /// Older than the window, or stored without a refresh timestamp
    Stale,
    Fresh,
}

#[derive(Debug, Clone)]
pub struct SelectionPolicy {
    pub staleness_window: Duration,
    /// Keep fresh entities at the tail of the list instead of dropping them.
    pub include_fresh: bool,
    /// Case-insensitive country allow-list; empty allows all.
    pub countries: Vec<String>,
    /// Competition allow-list; empty allows all.
    pub leagues: Vec<LeagueId>,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            staleness_window: Duration::days(DEFAULT_STALENESS_DAYS),
            include_fresh: false,
            countries: Vec::new(),
            leagues: Vec::new(),
        }
    }
}

impl SelectionPolicy {
    fn allows(&self, team: &Team) -> bool {
        let country_ok = self.countries.is_empty()
            || team.country.as_deref().is_some_and(|c| {
                self.countries.iter().any(|allowed| allowed.eq_ignore_ascii_case(c))
            });
        let league_ok = self.leagues.is_empty()
            || team.league_id.is_some_and(|l| self.leagues.contains(&l));
        country_ok && league_ok
    }
}

/// A team selected for refresh.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub team: &'a Team,
    pub staleness: Staleness,
    pub last_refreshed: Option<DateTime<Utc>>,
}

/// What the store says about one team for one job: whether the job's data
/// is present, and when the job last looked at the team. `None` for the
/// catalog job, which has no per-team state (see [`select_leagues`]).
fn refresh_state(
    job: JobKind,
    team: &Team,
    squads: &HashMap<TeamId, DateTime<Utc>>,
    season: Season,
) -> Option<(bool, Option<DateTime<Utc>>)> {
    Some(match job {
        JobKind::Coaches => (team.coach.is_some(), team.coach_synced_at),
        JobKind::Colors => (team.has_colors(), team.colors_synced_at),
        JobKind::Squads => match squads.get(&team.id) {
            Some(updated) => (true, Some(*updated)),
            None => (
                false,
                team.squad_checked_at
                    .filter(|_| team.squad_checked_season == Some(season)),
            ),
        },
        JobKind::Teams => return None,
    })
}

pub fn classify(
    has_data: bool,
    last_refreshed: Option<DateTime<Utc>>,
    window: Duration,
    now: DateTime<Utc>,
) -> Staleness {
    match last_refreshed {
        None if !has_data => Staleness::Missing,
        None => Staleness::Stale,
        Some(ts) if now - ts > window => Staleness::Stale,
        Some(_) => Staleness::Fresh,
    }
}

/// Ordered work list for a per-team job.
pub fn select_teams<'a>(
    job: JobKind,
    teams: &'a [Team],
    squads: &HashMap<TeamId, DateTime<Utc>>,
    season: Season,
    progress: &SyncProgress,
    policy: &SelectionPolicy,
    now: DateTime<Utc>,
) -> Vec<Candidate<'a>> {
    let mut candidates: Vec<Candidate<'a>> = teams
        .iter()
        .filter(|t| policy.allows(t))
        .filter(|t| !progress.is_done(t.id.as_u32()))
        .filter_map(|team| {
            let (has_data, last) = refresh_state(job, team, squads, season)?;
            let staleness = classify(has_data, last, policy.staleness_window, now);
            if staleness == Staleness::Fresh && !policy.include_fresh {
                return None;
            }
            Some(Candidate {
                team,
                staleness,
                last_refreshed: last,
            })
        })
        .collect();

    // Missing, then stale, then fresh; oldest first within a tier (no
    // timestamp sorts first), top-flight before the rest, then by id.
    candidates.sort_by(|a, b| {
        a.staleness
            .cmp(&b.staleness)
            .then_with(|| a.last_refreshed.cmp(&b.last_refreshed))
            .then_with(|| tier_rank(a.team.tier).cmp(&tier_rank(b.team.tier)))
            .then_with(|| a.team.id.cmp(&b.team.id))
    });
    candidates
}

fn tier_rank(tier: CompetitionTier) -> u8 {
    match tier {
        CompetitionTier::TopFlight => 0,
        CompetitionTier::Other => 1,
    }
}

/// Ordered work list for the catalog job: configured leagues in priority
/// order, minus those finished this sweep.
pub fn select_leagues(leagues: &[LeagueId], progress: &SyncProgress) -> Vec<LeagueId> {
    let mut seen = Vec::with_capacity(leagues.len());
    for league in leagues {
        if !progress.is_done(league.as_u32()) && !seen.contains(league) {
            seen.push(*league);
        }
    }
    seen
}
