//! Typed operations on top of the generic store interface

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::{
    models::*,
    schema::{table_spec, LEAGUES, PLAYER_RATINGS, SQUADS, TEAMS},
    EntityStore, Filter, Page, Row,
};
use crate::{
    cli::types::{PlayerId, Season, TeamId},
    error::{Result, SyncError},
};

/// Page size used when walking whole tables.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Serialize a model into a store row.
pub fn to_row<T: Serialize>(value: &T) -> Result<Row> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(SyncError::Store {
            message: format!("expected an object row, got {other}"),
        }),
    }
}

/// Deserialize rows, skipping (and logging) any that do not fit the model.
pub fn from_rows<T: DeserializeOwned>(table: &str, rows: Vec<Row>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value::<T>(Value::Object(row)) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(table, error = %e, "Skipping malformed row");
                None
            }
        })
        .collect()
}

/// Every row matching `filter`, walking pages until a short page.
pub async fn fetch_all<S: EntityStore>(
    store: &S,
    table: &str,
    filter: &Filter,
    page_size: usize,
) -> Result<Vec<Row>> {
    let mut page = Page::first(page_size.max(1));
    let mut all = Vec::new();
    loop {
        let rows = store.select(table, filter, page).await?;
        let n = rows.len();
        all.extend(rows);
        if n < page.limit {
            break;
        }
        page = page.next();
    }
    Ok(all)
}

pub async fn upsert_rows<S: EntityStore>(store: &S, table: &str, rows: &[Row]) -> Result<usize> {
    let spec = table_spec(table)?;
    store.upsert(table, rows, spec.conflict_key).await
}

/// The full team catalog.
pub async fn load_teams<S: EntityStore>(store: &S) -> Result<Vec<Team>> {
    let rows = fetch_all(store, TEAMS, &Filter::all(), DEFAULT_PAGE_SIZE).await?;
    Ok(from_rows(TEAMS, rows))
}

/// Last squad refresh per team for `season`.
pub async fn load_squad_timestamps<S: EntityStore>(
    store: &S,
    season: Season,
) -> Result<HashMap<TeamId, DateTime<Utc>>> {
    let filter = Filter::all().eq("season", season.as_u16());
    let rows = fetch_all(store, SQUADS, &filter, DEFAULT_PAGE_SIZE).await?;
    Ok(from_rows::<Squad>(SQUADS, rows)
        .into_iter()
        .map(|s| (s.team_id, s.updated_at))
        .collect())
}

pub async fn load_squad<S: EntityStore>(
    store: &S,
    team: TeamId,
    season: Season,
) -> Result<Option<Squad>> {
    let filter = Filter::all()
        .eq("team_id", team.as_u32())
        .eq("season", season.as_u16());
    let rows = store.select(SQUADS, &filter, Page::first(1)).await?;
    Ok(from_rows::<Squad>(SQUADS, rows).into_iter().next())
}

pub async fn upsert_league<S: EntityStore>(store: &S, league: &League) -> Result<()> {
    upsert_rows(store, LEAGUES, &[to_row(league)?]).await?;
    Ok(())
}

pub async fn upsert_teams<S: EntityStore>(store: &S, teams: &[Row]) -> Result<usize> {
    upsert_rows(store, TEAMS, teams).await
}

/// Conflict key (team, season): replaces any previous roster wholesale.
pub async fn upsert_squad<S: EntityStore>(store: &S, squad: &Squad) -> Result<()> {
    upsert_rows(store, SQUADS, &[to_row(squad)?]).await?;
    Ok(())
}

/// Merge `fields` into an existing team row. `id` and `name` are always
/// sent so the row stays valid if it has to be inserted.
pub async fn patch_team<S: EntityStore>(store: &S, team: &Team, mut fields: Row) -> Result<()> {
    fields.insert("id".to_string(), Value::from(team.id.as_u32()));
    fields.insert("name".to_string(), Value::from(team.name.clone()));
    upsert_rows(store, TEAMS, &[fields]).await?;
    Ok(())
}

/// Aggregated community votes for one player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommunityRating {
    pub average: f64,
    pub votes: u32,
}

/// Community vote averages for the players of `team`.
pub async fn community_ratings<S: EntityStore>(
    store: &S,
    team: TeamId,
) -> Result<HashMap<PlayerId, CommunityRating>> {
    let filter = Filter::all().eq("team_id", team.as_u32());
    let rows = fetch_all(store, PLAYER_RATINGS, &filter, DEFAULT_PAGE_SIZE).await?;

    let mut sums: HashMap<PlayerId, (f64, u32)> = HashMap::new();
    for vote in from_rows::<RatingVote>(PLAYER_RATINGS, rows) {
        let entry = sums.entry(vote.player_id).or_insert((0.0, 0));
        entry.0 += vote.rating;
        entry.1 += 1;
    }
    Ok(sums
        .into_iter()
        .map(|(id, (sum, votes))| {
            (
                id,
                CommunityRating {
                    average: sum / votes as f64,
                    votes,
                },
            )
        })
        .collect())
}
