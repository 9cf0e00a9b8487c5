use crate::cli::types::{LeagueId, PlayerId, TeamId};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Every endpoint wraps its payload in the same envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    /// `[]` when empty, an object of `{field: message}` otherwise.
    #[serde(default)]
    pub errors: Value,
    #[serde(default)]
    pub results: u32,
    pub response: T,
}

impl<T> Envelope<T> {
    /// True when the errors name the daily request limit or the per-minute
    /// rate limit.
    pub fn quota_exceeded(&self) -> bool {
        match &self.errors {
            Value::Object(map) => map.contains_key("requests") || map.contains_key("rateLimit"),
            _ => false,
        }
    }

    /// Flatten the error payload into one message, `None` when clean.
    pub fn error_message(&self) -> Option<String> {
        match &self.errors {
            Value::Null => None,
            Value::Array(items) if items.is_empty() => None,
            Value::Object(map) if map.is_empty() => None,
            Value::Object(map) => Some(
                map.iter()
                    .map(|(k, v)| match v {
                        Value::String(s) => format!("{}: {}", k, s),
                        other => format!("{}: {}", k, other),
                    })
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            other => Some(other.to_string()),
        }
    }
}

/// `/status` payload. Accounts without a subscription get `[]` here.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum StatusPayload {
    Account(StatusResponse),
    Empty(Vec<Value>),
}

#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    pub requests: RequestUsage,
}

#[derive(Debug, Deserialize)]
pub struct RequestUsage {
    pub current: u32,
    pub limit_day: u32,
}

/// Remote-reported daily usage snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApiStatus {
    pub used: u32,
    pub limit: u32,
}

impl ApiStatus {
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }
}

/// `/leagues?id=` entry
#[derive(Debug, Clone, Deserialize)]
pub struct LeagueEntry {
    pub league: LeagueInfo,
    #[serde(default)]
    pub country: Option<CountryInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueInfo {
    pub id: LeagueId,
    pub name: String,
    /// "League" or "Cup"
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountryInfo {
    pub name: Option<String>,
}

/// `/teams?league=&season=` entry
#[derive(Debug, Clone, Deserialize)]
pub struct TeamEntry {
    pub team: TeamInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamInfo {
    pub id: TeamId,
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub national: bool,
    #[serde(default)]
    pub logo: Option<String>,
}

/// `/players/squads?team=` entry
#[derive(Debug, Clone, Deserialize)]
pub struct SquadEntry {
    pub team: SquadTeam,
    #[serde(default)]
    pub players: Vec<SquadPlayer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SquadTeam {
    pub id: TeamId,
    pub name: String,
    #[serde(default)]
    pub logo: Option<String>,
}

/// One roster line. The skill block and rating are only present on
/// enriched plans, so everything past the photo is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct SquadPlayer {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub number: Option<u16>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_f64")]
    pub rating: Option<f64>,
    #[serde(default)]
    pub attributes: Option<SkillAttributes>,
}

/// Six-axis skill profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct SkillAttributes {
    pub pace: Option<u8>,
    pub shooting: Option<u8>,
    pub passing: Option<u8>,
    pub dribbling: Option<u8>,
    pub defending: Option<u8>,
    pub physical: Option<u8>,
}

/// `/coachs?team=` entry
#[derive(Debug, Clone, Deserialize)]
pub struct CoachEntry {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub career: Vec<CareerSpell>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CareerSpell {
    pub team: CareerTeam,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CareerTeam {
    pub id: Option<TeamId>,
}

impl CoachEntry {
    /// True when this coach has an open-ended spell at `team`.
    pub fn is_current_for(&self, team: TeamId) -> bool {
        self.career
            .iter()
            .any(|spell| spell.team.id == Some(team) && spell.end.is_none())
    }
}

/// `/fixtures?team=&last=1` entry (only the id is used)
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureEntry {
    pub fixture: FixtureRef,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FixtureRef {
    pub id: u64,
}

/// `/fixtures/lineups?fixture=&team=` entry
#[derive(Debug, Clone, Deserialize)]
pub struct LineupEntry {
    pub team: LineupTeam,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineupTeam {
    pub id: TeamId,
    #[serde(default)]
    pub colors: Option<LineupColors>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineupColors {
    pub player: Option<KitColors>,
}

/// Hex colors without the leading `#`, as the API sends them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct KitColors {
    pub primary: Option<String>,
    pub number: Option<String>,
    #[serde(default)]
    pub border: Option<String>,
}

/// Ratings arrive as numbers or as strings such as `"7.300000"`.
fn de_lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}
