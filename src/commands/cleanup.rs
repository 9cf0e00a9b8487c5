//! Squad housekeeping. Reports by default; deletes only when confirmed.

use std::collections::HashSet;

use serde::Deserialize;

use crate::{
    cli::types::{Season, TeamId},
    config::Settings,
    error::Result,
    storage::{
        queries::{fetch_all, from_rows, load_teams, DEFAULT_PAGE_SIZE},
        schema::SQUADS,
        EntityStore, Filter,
    },
};

/// Just the key columns of a squad row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub struct SquadKey {
    pub team_id: TeamId,
    pub season: Season,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CleanupPlan {
    /// Squads whose team is no longer in the catalog
    pub orphaned: Vec<SquadKey>,
    /// Squads older than the retained seasons
    pub outdated: Vec<SquadKey>,
}

impl CleanupPlan {
    pub fn is_empty(&self) -> bool {
        self.orphaned.is_empty() && self.outdated.is_empty()
    }

    pub fn len(&self) -> usize {
        self.orphaned.len() + self.outdated.len()
    }
}

/// Seasons from `current - keep_seasons + 1` onwards are kept.
pub async fn plan_cleanup<S: EntityStore>(
    store: &S,
    current: Season,
    keep_seasons: u16,
) -> Result<CleanupPlan> {
    let catalog: HashSet<TeamId> = load_teams(store).await?.into_iter().map(|t| t.id).collect();
    let rows = fetch_all(store, SQUADS, &Filter::all(), DEFAULT_PAGE_SIZE).await?;
    let oldest_kept = current
        .as_u16()
        .saturating_sub(keep_seasons.max(1) - 1);

    let mut plan = CleanupPlan::default();
    for key in from_rows::<SquadKey>(SQUADS, rows) {
        if !catalog.contains(&key.team_id) {
            plan.orphaned.push(key);
        } else if key.season.as_u16() < oldest_kept {
            plan.outdated.push(key);
        }
    }
    plan.orphaned.sort();
    plan.outdated.sort();
    Ok(plan)
}

/// Delete every squad in `plan`; returns rows removed.
pub async fn apply_cleanup<S: EntityStore>(store: &S, plan: &CleanupPlan) -> Result<usize> {
    let mut removed = 0;
    for key in plan.orphaned.iter().chain(&plan.outdated) {
        let filter = Filter::all()
            .eq("team_id", key.team_id.as_u32())
            .eq("season", key.season.as_u16());
        removed += store.delete(SQUADS, &filter).await?;
    }
    Ok(removed)
}

pub async fn handle_cleanup(settings: &Settings, keep_seasons: u16, confirm: bool) -> Result<()> {
    let store = settings.open_store()?;
    store.ping().await?;

    let plan = plan_cleanup(&store, settings.season, keep_seasons).await?;
    if plan.is_empty() {
        println!("✓ Nothing to clean up");
        return Ok(());
    }

    for key in &plan.orphaned {
        println!("  orphaned  team {} season {}", key.team_id, key.season);
    }
    for key in &plan.outdated {
        println!("  outdated  team {} season {}", key.team_id, key.season);
    }

    if !confirm {
        println!("{} squad(s) would be deleted. Re-run with --confirm to delete.", plan.len());
        return Ok(());
    }
    let removed = apply_cleanup(&store, &plan).await?;
    tracing::info!(removed, "Cleanup applied");
    println!("✓ Deleted {removed} squad(s)");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{queries::upsert_rows, SqliteStore};
    use serde_json::json;

    async fn seeded() -> SqliteStore {
        let store = SqliteStore::new_in_memory().unwrap();
        let teams = vec![
            json!({"id": 1, "name": "Kept"}).as_object().cloned().unwrap(),
        ];
        upsert_rows(&store, "teams", &teams).await.unwrap();
        let squads: Vec<_> = [(1, 2024), (1, 2023), (1, 2021), (9, 2024)]
            .iter()
            .map(|(team, season)| {
                json!({
                    "team_id": team,
                    "season": season,
                    "team": {"name": "x", "coach": null, "logo": null},
                    "players": [],
                    "updated_at": "2024-08-01T00:00:00Z"
                })
                .as_object()
                .cloned()
                .unwrap()
            })
            .collect();
        upsert_rows(&store, "squads", &squads).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_plan_finds_orphans_and_old_seasons() {
        let store = seeded().await;
        let plan = plan_cleanup(&store, Season::new(2024), 2).await.unwrap();
        assert_eq!(
            plan.orphaned,
            vec![SquadKey { team_id: TeamId::new(9), season: Season::new(2024) }]
        );
        assert_eq!(
            plan.outdated,
            vec![SquadKey { team_id: TeamId::new(1), season: Season::new(2021) }]
        );
    }

    #[tokio::test]
    async fn test_planning_deletes_nothing() {
        let store = seeded().await;
        plan_cleanup(&store, Season::new(2024), 1).await.unwrap();
        assert_eq!(store.count("squads").unwrap(), 4);
    }

    #[tokio::test]
    async fn test_apply_removes_planned_rows_only() {
        let store = seeded().await;
        let plan = plan_cleanup(&store, Season::new(2024), 2).await.unwrap();
        let removed = apply_cleanup(&store, &plan).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.count("squads").unwrap(), 2);
    }
}
