//! Mapping from remote payloads to store rows.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{
    api::types::{CoachEntry, KitColors, LeagueEntry, SquadEntry, TeamEntry},
    cli::types::{JobKind, LeagueId, PlayerId, Season},
    storage::{
        queries::CommunityRating, CompetitionTier, League, PlayerSnapshot, Row, Squad, Team,
        TeamKind, TeamSummary,
    },
    sync::rating::RatingPolicy,
};

/// Premier League, La Liga, Serie A, Bundesliga, Ligue 1.
pub const DEFAULT_TOP_FLIGHT: [u32; 5] = [39, 140, 135, 78, 61];

pub fn tier_for(league: LeagueId, top_flight: &[LeagueId]) -> CompetitionTier {
    if top_flight.contains(&league) {
        CompetitionTier::TopFlight
    } else {
        CompetitionTier::Other
    }
}

pub fn league_row(entry: &LeagueEntry, top_flight: &[LeagueId], now: DateTime<Utc>) -> League {
    League {
        id: entry.league.id,
        name: entry.league.name.clone(),
        country: entry.country.as_ref().and_then(|c| c.name.clone()),
        kind: entry.league.kind.clone(),
        logo: entry.league.logo.clone(),
        tier: tier_for(entry.league.id, top_flight),
        updated_at: now,
    }
}

fn is_cup(league: &League) -> bool {
    league
        .kind
        .as_deref()
        .is_some_and(|k| k.eq_ignore_ascii_case("cup"))
}

/// Partial team rows for a league's participants.
///
/// Only catalog columns are written so that coach and color data from the
/// other jobs survive the merge. Cup participants keep the domestic league
/// they were first cataloged under.
pub fn team_rows(entries: &[TeamEntry], league: &League, now: DateTime<Utc>) -> Vec<Row> {
    entries
        .iter()
        .map(|entry| {
            let team = &entry.team;
            let mut row = Row::new();
            row.insert("id".into(), Value::from(team.id.as_u32()));
            row.insert("name".into(), Value::from(team.name.clone()));
            let country = team.country.clone().or_else(|| league.country.clone());
            if let Some(country) = country {
                row.insert("country".into(), Value::from(country));
            }
            if let Some(logo) = &team.logo {
                row.insert("logo".into(), Value::from(logo.clone()));
            }
            let kind = if team.national {
                TeamKind::National
            } else {
                TeamKind::Club
            };
            row.insert("kind".into(), serde_json::to_value(kind).unwrap_or(Value::Null));
            if !is_cup(league) {
                row.insert("league_id".into(), Value::from(league.id.as_u32()));
                row.insert("competition".into(), Value::from(league.name.clone()));
                row.insert(
                    "tier".into(),
                    serde_json::to_value(league.tier).unwrap_or(Value::Null),
                );
            }
            row.insert("updated_at".into(), Value::from(now.to_rfc3339()));
            row
        })
        .collect()
}

/// Build the squad row for `team`, blending each player's rating with the
/// community votes recorded for the team.
pub fn squad_row(
    entry: SquadEntry,
    team: &Team,
    season: Season,
    community: &HashMap<PlayerId, CommunityRating>,
    policy: &RatingPolicy,
    now: DateTime<Utc>,
) -> Squad {
    let players = entry
        .players
        .into_iter()
        .map(|p| PlayerSnapshot {
            rating: policy.blend(p.rating, community.get(&p.id).copied()),
            id: p.id,
            name: p.name,
            number: p.number,
            position: p.position,
            photo: p.photo,
            attributes: p.attributes,
            api_rating: p.rating,
        })
        .collect();

    Squad {
        team_id: team.id,
        season,
        team: TeamSummary {
            name: entry.team.name,
            coach: team.coach.clone(),
            logo: entry.team.logo.or_else(|| team.logo.clone()),
        },
        players,
        updated_at: now,
    }
}

pub fn coach_fields(coach: &CoachEntry, now: DateTime<Utc>) -> Row {
    let mut row = Row::new();
    row.insert("coach".into(), Value::from(coach.name.clone()));
    row.insert("coach_synced_at".into(), Value::from(now.to_rfc3339()));
    row
}

/// `None` when the kit carries no usable primary color.
pub fn color_fields(colors: &KitColors, now: DateTime<Utc>) -> Option<Row> {
    let primary = colors.primary.as_deref().and_then(normalize_color)?;
    let secondary = colors
        .number
        .as_deref()
        .and_then(normalize_color)
        .or_else(|| colors.border.as_deref().and_then(normalize_color));

    let mut row = Row::new();
    row.insert("primary_color".into(), Value::from(primary));
    if let Some(secondary) = secondary {
        row.insert("secondary_color".into(), Value::from(secondary));
    }
    row.insert("colors_synced_at".into(), Value::from(now.to_rfc3339()));
    Some(row)
}

/// Fields stamped on a team when a job found nothing upstream, so the team
/// is not retried until its check goes stale.
pub fn no_data_fields(job: JobKind, season: Season, now: DateTime<Utc>) -> Row {
    let mut row = Row::new();
    let stamp = Value::from(now.to_rfc3339());
    match job {
        JobKind::Coaches => {
            row.insert("coach_synced_at".into(), stamp);
        }
        JobKind::Colors => {
            row.insert("colors_synced_at".into(), stamp);
        }
        JobKind::Squads => {
            row.insert("squad_checked_at".into(), stamp);
            row.insert("squad_checked_season".into(), Value::from(season.as_u16()));
        }
        JobKind::Teams => {}
    }
    row
}

/// `"e41b17"` or `"#E41B17"` to `"#e41b17"`.
pub fn normalize_color(raw: &str) -> Option<String> {
    let hex = raw.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("#{}", hex.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{SquadPlayer, SquadTeam};
    use crate::cli::types::TeamId;
    use serde_json::json;

    fn league(kind: &str) -> League {
        League {
            id: LeagueId::new(39),
            name: "Premier League".to_string(),
            country: Some("England".to_string()),
            kind: Some(kind.to_string()),
            logo: None,
            tier: CompetitionTier::TopFlight,
            updated_at: Utc::now(),
        }
    }

    fn team_entries() -> Vec<TeamEntry> {
        serde_json::from_value(json!([
            {"team": {"id": 33, "name": "Manchester United", "national": false}},
            {"team": {"id": 10, "name": "England", "country": "England", "national": true}}
        ]))
        .unwrap()
    }

    #[test]
    fn test_tier_for() {
        let top: Vec<LeagueId> = DEFAULT_TOP_FLIGHT.iter().map(|&id| LeagueId::new(id)).collect();
        assert_eq!(tier_for(LeagueId::new(140), &top), CompetitionTier::TopFlight);
        assert_eq!(tier_for(LeagueId::new(40), &top), CompetitionTier::Other);
    }

    #[test]
    fn test_team_rows_carry_league_context() {
        let rows = team_rows(&team_entries(), &league("League"), Utc::now());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["league_id"], 39);
        assert_eq!(rows[0]["competition"], "Premier League");
        assert_eq!(rows[0]["tier"], "top_flight");
        assert_eq!(rows[0]["country"], "England");
        assert_eq!(rows[0]["kind"], "club");
        assert_eq!(rows[1]["kind"], "national");
        assert!(!rows[0].contains_key("coach"));
    }

    #[test]
    fn test_cup_rows_leave_league_alone() {
        let rows = team_rows(&team_entries(), &league("Cup"), Utc::now());
        assert!(!rows[0].contains_key("league_id"));
        assert!(!rows[0].contains_key("competition"));
    }

    #[test]
    fn test_squad_row_blends_ratings() {
        let entry = SquadEntry {
            team: SquadTeam {
                id: TeamId::new(33),
                name: "Manchester United".to_string(),
                logo: None,
            },
            players: vec![
                SquadPlayer {
                    id: PlayerId::new(1),
                    name: "Rated".to_string(),
                    number: Some(7),
                    position: Some("Attacker".to_string()),
                    photo: None,
                    rating: Some(8.0),
                    attributes: None,
                },
                SquadPlayer {
                    id: PlayerId::new(2),
                    name: "Unrated".to_string(),
                    number: None,
                    position: None,
                    photo: None,
                    rating: None,
                    attributes: None,
                },
            ],
        };
        let mut team = Team::new(TeamId::new(33), "Man Utd");
        team.coach = Some("R. Amorim".to_string());
        let mut community = HashMap::new();
        community.insert(PlayerId::new(1), CommunityRating { average: 5.0, votes: 4 });

        let squad = squad_row(
            entry,
            &team,
            Season::new(2024),
            &community,
            &RatingPolicy::default(),
            Utc::now(),
        );
        assert_eq!(squad.team.coach.as_deref(), Some("R. Amorim"));
        assert_eq!(squad.players.len(), 2);
        assert!((squad.players[0].rating - 6.8).abs() < 1e-9);
        assert_eq!(squad.players[0].api_rating, Some(8.0));
        assert_eq!(squad.players[1].rating, 6.0);
    }

    #[test]
    fn test_normalize_color() {
        assert_eq!(normalize_color("E41B17").as_deref(), Some("#e41b17"));
        assert_eq!(normalize_color("#ffffff").as_deref(), Some("#ffffff"));
        assert_eq!(normalize_color("red"), None);
        assert_eq!(normalize_color(""), None);
    }

    #[test]
    fn test_color_fields_need_primary() {
        let now = Utc::now();
        let kit = KitColors {
            primary: None,
            number: Some("ffffff".to_string()),
            border: None,
        };
        assert!(color_fields(&kit, now).is_none());

        let kit = KitColors {
            primary: Some("da291c".to_string()),
            number: None,
            border: Some("000000".to_string()),
        };
        let fields = color_fields(&kit, now).unwrap();
        assert_eq!(fields["primary_color"], "#da291c");
        assert_eq!(fields["secondary_color"], "#000000");
    }
}
