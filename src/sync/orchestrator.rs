//! The per-job sync loop.
//!
//! One invocation: check the quota, load the checkpoint, build the work
//! list, then fetch, transform and upsert entity by entity until the budget
//! or the list runs out. Progress is flushed after every entity, so the
//! future can be dropped at any await point without losing finished work.

use std::time::Duration;

use chrono::Utc;

use super::{
    rating::RatingPolicy,
    report::{RunSummary, StopReason},
    selector::{self, SelectionPolicy},
    transform,
};
use crate::{
    api::{QuotaPolicy, QuotaTracker, SportsApi},
    checkpoint::{CheckpointStore, SyncProgress},
    cli::types::{JobKind, LeagueId, Season},
    config::DEFAULT_LEAGUES,
    error::{Result, SyncError},
    storage::{queries, EntityStore, Team},
};

/// Calls one invocation may issue unless told otherwise.
pub const DEFAULT_MAX_CALLS: u32 = 100;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub job: JobKind,
    pub season: Season,
    /// Upper bound on remote calls for this invocation
    pub max_calls: u32,
    /// Spacing between remote calls; raised to the quota policy minimum
    pub delay: Duration,
    /// Competitions cataloged by the teams job, in priority order
    pub leagues: Vec<LeagueId>,
    pub top_flight: Vec<LeagueId>,
    pub selection: SelectionPolicy,
    pub quota: QuotaPolicy,
    pub rating: RatingPolicy,
}

impl SyncOptions {
    pub fn new(job: JobKind, season: Season) -> Self {
        let quota = QuotaPolicy::default();
        Self {
            job,
            season,
            max_calls: DEFAULT_MAX_CALLS,
            delay: quota.min_delay,
            leagues: DEFAULT_LEAGUES.iter().map(|&id| LeagueId::new(id)).collect(),
            top_flight: transform::DEFAULT_TOP_FLIGHT
                .iter()
                .map(|&id| LeagueId::new(id))
                .collect(),
            selection: SelectionPolicy::default(),
            quota,
            rating: RatingPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Synced,
    /// The remote had nothing for this entity; terminal for the sweep
    NoData,
}

/// A non-fatal per-entity failure, split by the side that failed.
#[derive(Debug)]
enum Failure {
    Fetch(SyncError),
    Store(SyncError),
}

impl Failure {
    fn into_error(self) -> SyncError {
        match self {
            Failure::Fetch(e) | Failure::Store(e) => e,
        }
    }
}

impl From<SyncError> for Failure {
    fn from(e: SyncError) -> Self {
        Failure::Fetch(e)
    }
}

type StepResult = std::result::Result<Outcome, Failure>;

enum WorkItem<'t> {
    League(LeagueId),
    Team(&'t Team),
}

impl WorkItem<'_> {
    fn id(&self) -> u32 {
        match self {
            WorkItem::League(id) => id.as_u32(),
            WorkItem::Team(team) => team.id.as_u32(),
        }
    }

    fn label(&self) -> String {
        match self {
            WorkItem::League(id) => format!("league {id}"),
            WorkItem::Team(team) => team.name.clone(),
        }
    }
}

/// Drives one job against an API, a store and a checkpoint backend.
pub struct SyncOrchestrator<'a, A, S, C> {
    api: &'a A,
    store: &'a S,
    checkpoints: &'a C,
}

impl<'a, A, S, C> SyncOrchestrator<'a, A, S, C>
where
    A: SportsApi,
    S: EntityStore,
    C: CheckpointStore,
{
    pub fn new(api: &'a A, store: &'a S, checkpoints: &'a C) -> Self {
        Self {
            api,
            store,
            checkpoints,
        }
    }

    /// Run one invocation of `opts.job`.
    ///
    /// Quota exhaustion and an empty work list are normal outcomes reported
    /// through the summary. Only fatal errors (quota endpoint unreachable,
    /// store unreachable, checkpoint I/O) are returned as `Err`.
    pub async fn run(&self, opts: &SyncOptions) -> Result<RunSummary> {
        let job = opts.job;
        let mut summary = RunSummary::new(job, opts.season);
        let policy = QuotaPolicy {
            min_delay: opts.quota.min_delay.max(opts.delay),
            ..opts.quota
        };
        let mut quota = QuotaTracker::new(policy, opts.max_calls);

        let availability = quota.check_availability(self.api).await?;
        if !availability.available {
            tracing::warn!(job = %job, "No quota available above the safety margin");
            summary.finish(StopReason::QuotaUnavailable, quota.spent(), 0);
            summary.log();
            return Ok(summary);
        }

        let progress = self.checkpoints.load(job)?;
        if !progress.is_empty() {
            tracing::info!(
                job = %job,
                done = progress.completed.len(),
                "Resuming sweep from checkpoint"
            );
        }

        let result = match job {
            JobKind::Teams => {
                let leagues = selector::select_leagues(&opts.leagues, &progress);
                let items = leagues.into_iter().map(WorkItem::League).collect();
                self.sweep(opts, &progress, items, &mut quota, &mut summary)
                    .await
            }
            _ => {
                let teams = queries::load_teams(self.store).await?;
                let squads = if job == JobKind::Squads {
                    queries::load_squad_timestamps(self.store, opts.season).await?
                } else {
                    Default::default()
                };
                let candidates = selector::select_teams(
                    job,
                    &teams,
                    &squads,
                    opts.season,
                    &progress,
                    &opts.selection,
                    Utc::now(),
                );
                tracing::debug!(job = %job, catalog = teams.len(), "Candidates selected");
                let items = candidates
                    .into_iter()
                    .map(|c| WorkItem::Team(c.team))
                    .collect();
                self.sweep(opts, &progress, items, &mut quota, &mut summary)
                    .await
            }
        };

        match result {
            Ok(stop) => {
                summary.finish(stop, quota.spent(), quota.remaining());
                summary.log();
                Ok(summary)
            }
            Err(e) => {
                summary.finish(StopReason::Aborted, quota.spent(), quota.remaining());
                summary.log();
                Err(e)
            }
        }
    }

    async fn sweep(
        &self,
        opts: &SyncOptions,
        progress: &SyncProgress,
        items: Vec<WorkItem<'_>>,
        quota: &mut QuotaTracker,
        summary: &mut RunSummary,
    ) -> Result<StopReason> {
        let job = opts.job;
        summary.candidates = items.len();

        if items.is_empty() {
            if !progress.is_empty() {
                self.checkpoints.reset(job)?;
            }
            tracing::info!(job = %job, "Nothing to sync");
            return Ok(StopReason::NoCandidates);
        }

        let cost = job.calls_per_entity();
        for item in items {
            if !quota.can_spend(cost) {
                tracing::info!(
                    job = %job,
                    remaining = quota.remaining(),
                    "Budget exhausted, stopping"
                );
                return Ok(StopReason::BudgetExhausted);
            }

            let outcome = match &item {
                WorkItem::League(league) => self.sync_league(opts, *league, quota).await,
                WorkItem::Team(team) => self.sync_team(opts, team, quota).await,
            };

            let failure = match outcome {
                Ok(Outcome::Synced) => {
                    summary.synced += 1;
                    self.checkpoints.mark_done(job, item.id())?;
                    continue;
                }
                Ok(Outcome::NoData) => {
                    summary.no_data += 1;
                    tracing::debug!(job = %job, entity = %item.label(), "No data upstream");
                    self.checkpoints.mark_done(job, item.id())?;
                    continue;
                }
                Err(failure) => failure,
            };

            let store_side = matches!(failure, Failure::Store(_));
            let e = failure.into_error();
            if e.is_fatal() {
                tracing::error!(job = %job, entity = %item.label(), error = %e, "Fatal error");
                return Err(e);
            }
            if let SyncError::QuotaExhausted { message } = &e {
                // The entity is left unmarked; the checkpoint carries the
                // sweep over to the next run.
                tracing::warn!(
                    job = %job,
                    entity = %item.label(),
                    %message,
                    "Remote quota exhausted"
                );
                return Ok(StopReason::BudgetExhausted);
            }
            if store_side {
                summary.store_failed += 1;
            } else {
                summary.failed += 1;
            }
            summary.failed_ids.push(item.id());
            tracing::warn!(
                job = %job,
                entity = %item.label(),
                id = item.id(),
                store = store_side,
                error = %e,
                "Entity failed, will retry next sweep"
            );
        }

        self.checkpoints.reset(job)?;
        tracing::info!(job = %job, "Sweep complete");
        Ok(StopReason::SweepComplete)
    }

    async fn sync_league(
        &self,
        opts: &SyncOptions,
        league: LeagueId,
        quota: &mut QuotaTracker,
    ) -> StepResult {
        quota.spend().await;
        let Some(entry) = self.api.league(league, opts.season).await? else {
            return Ok(Outcome::NoData);
        };
        let now = Utc::now();
        let row = transform::league_row(&entry, &opts.top_flight, now);

        quota.spend().await;
        let teams = self.api.teams(league, opts.season).await?;
        queries::upsert_league(self.store, &row)
            .await
            .map_err(Failure::Store)?;
        if teams.is_empty() {
            return Ok(Outcome::NoData);
        }
        let rows = transform::team_rows(&teams, &row, now);
        let written = queries::upsert_teams(self.store, &rows)
            .await
            .map_err(Failure::Store)?;
        tracing::info!(league = %row.name, teams = written, "Catalog refreshed");
        Ok(Outcome::Synced)
    }

    async fn sync_team(
        &self,
        opts: &SyncOptions,
        team: &Team,
        quota: &mut QuotaTracker,
    ) -> StepResult {
        match opts.job {
            JobKind::Squads => {
                quota.spend().await;
                let entry = self.api.squad(team.id).await?;
                let Some(entry) = entry.filter(|e| !e.players.is_empty()) else {
                    self.stamp_no_data(opts, team).await;
                    return Ok(Outcome::NoData);
                };
                let community = queries::community_ratings(self.store, team.id)
                    .await
                    .map_err(Failure::Store)?;
                let squad = transform::squad_row(
                    entry,
                    team,
                    opts.season,
                    &community,
                    &opts.rating,
                    Utc::now(),
                );
                queries::upsert_squad(self.store, &squad)
                    .await
                    .map_err(Failure::Store)?;
                tracing::debug!(team = %team.name, players = squad.players.len(), "Squad stored");
            }
            JobKind::Coaches => {
                quota.spend().await;
                let Some(coach) = self.api.coach(team.id).await? else {
                    self.stamp_no_data(opts, team).await;
                    return Ok(Outcome::NoData);
                };
                let fields = transform::coach_fields(&coach, Utc::now());
                queries::patch_team(self.store, team, fields)
                    .await
                    .map_err(Failure::Store)?;
            }
            JobKind::Colors => {
                quota.spend().await;
                let Some(fixture) = self.api.last_fixture(team.id).await? else {
                    self.stamp_no_data(opts, team).await;
                    return Ok(Outcome::NoData);
                };
                quota.spend().await;
                let kit = self.api.lineup_colors(fixture.id, team.id).await?;
                let Some(fields) = kit.and_then(|k| transform::color_fields(&k, Utc::now())) else {
                    self.stamp_no_data(opts, team).await;
                    return Ok(Outcome::NoData);
                };
                queries::patch_team(self.store, team, fields)
                    .await
                    .map_err(Failure::Store)?;
            }
            // The catalog job walks leagues, never teams.
            JobKind::Teams => {
                return Err(Failure::Fetch(SyncError::UnknownJob {
                    name: format!("{} (per-team step)", opts.job),
                }))
            }
        }
        Ok(Outcome::Synced)
    }

    /// Best effort: a failed stamp only means the team is retried sooner.
    async fn stamp_no_data(&self, opts: &SyncOptions, team: &Team) {
        let fields = transform::no_data_fields(opts.job, opts.season, Utc::now());
        if let Err(e) = queries::patch_team(self.store, team, fields).await {
            tracing::warn!(team = %team.name, error = %e, "Could not record empty lookup");
        }
    }
}
