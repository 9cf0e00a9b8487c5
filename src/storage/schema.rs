//! Table registry
//!
//! Tables are listed referenced-first so that walking the list in order
//! (backup, restore) never writes a row before the rows it points at.

use crate::error::{Result, SyncError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub conflict_key: &'static [&'static str],
}

pub const LEAGUES: &str = "leagues";
pub const TEAMS: &str = "teams";
pub const SQUADS: &str = "squads";
pub const MATCHES: &str = "matches";
pub const PLAYER_RATINGS: &str = "player_ratings";

pub const TABLES: &[TableSpec] = &[
    TableSpec {
        name: LEAGUES,
        conflict_key: &["id"],
    },
    TableSpec {
        name: TEAMS,
        conflict_key: &["id"],
    },
    TableSpec {
        name: SQUADS,
        conflict_key: &["team_id", "season"],
    },
    TableSpec {
        name: MATCHES,
        conflict_key: &["id"],
    },
    TableSpec {
        name: PLAYER_RATINGS,
        conflict_key: &["player_id", "user_id"],
    },
];

pub fn table_spec(name: &str) -> Result<&'static TableSpec> {
    TABLES
        .iter()
        .find(|t| t.name == name)
        .ok_or_else(|| SyncError::UnknownTable {
            name: name.to_string(),
        })
}

/// Subset of [`TABLES`] in registry order. Unknown names are an error.
pub fn ordered_subset(names: &[String]) -> Result<Vec<&'static TableSpec>> {
    for name in names {
        table_spec(name)?;
    }
    Ok(TABLES
        .iter()
        .filter(|t| names.is_empty() || names.iter().any(|n| n == t.name))
        .collect())
}
