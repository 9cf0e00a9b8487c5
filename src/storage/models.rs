//! Data models for the storage layer

use crate::api::types::SkillAttributes;
use crate::cli::types::{LeagueId, PlayerId, Season, TeamId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionTier {
    TopFlight,
    #[default]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamKind {
    #[default]
    Club,
    National,
}

/// Competition row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct League {
    pub id: LeagueId,
    pub name: String,
    pub country: Option<String>,
    /// "League" or "Cup" as reported upstream
    pub kind: Option<String>,
    pub logo: Option<String>,
    pub tier: CompetitionTier,
    pub updated_at: DateTime<Utc>,
}

/// Team row; the catalog every per-team job walks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub league_id: Option<LeagueId>,
    #[serde(default)]
    pub competition: Option<String>,
    #[serde(default)]
    pub tier: CompetitionTier,
    #[serde(default)]
    pub kind: TeamKind,
    #[serde(default)]
    pub primary_color: Option<String>,
    #[serde(default)]
    pub secondary_color: Option<String>,
    #[serde(default)]
    pub coach: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    /// Last catalog refresh
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub coach_synced_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub colors_synced_at: Option<DateTime<Utc>>,
    /// Last squad lookup that came back empty, and for which season
    #[serde(default)]
    pub squad_checked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub squad_checked_season: Option<Season>,
}

impl Team {
    pub fn new(id: TeamId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            country: None,
            league_id: None,
            competition: None,
            tier: CompetitionTier::Other,
            kind: TeamKind::Club,
            primary_color: None,
            secondary_color: None,
            coach: None,
            logo: None,
            updated_at: None,
            coach_synced_at: None,
            colors_synced_at: None,
            squad_checked_at: None,
            squad_checked_season: None,
        }
    }

    pub fn has_colors(&self) -> bool {
        self.primary_color.is_some()
    }
}

/// Denormalized team header carried inside a squad row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSummary {
    pub name: String,
    pub coach: Option<String>,
    pub logo: Option<String>,
}

/// One player as of the last squad sync. Not a standalone row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub number: Option<u16>,
    pub position: Option<String>,
    pub photo: Option<String>,
    pub attributes: Option<SkillAttributes>,
    /// Rating reported upstream, before blending
    pub api_rating: Option<f64>,
    /// Display rating after the community blend and clamping
    pub rating: f64,
}

/// At most one per (team, season); the player list is replaced wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Squad {
    pub team_id: TeamId,
    pub season: Season,
    pub team: TeamSummary,
    pub players: Vec<PlayerSnapshot>,
    pub updated_at: DateTime<Utc>,
}

/// A single community vote for a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingVote {
    pub player_id: PlayerId,
    pub user_id: String,
    #[serde(default)]
    pub team_id: Option<TeamId>,
    pub rating: f64,
}
