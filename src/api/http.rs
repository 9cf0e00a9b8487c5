//! HTTP client for the remote football data API

use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT},
    Client, StatusCode,
};
use serde::de::DeserializeOwned;

use super::types::{
    ApiStatus, CoachEntry, Envelope, FixtureEntry, FixtureRef, KitColors, LeagueEntry,
    LineupEntry, SquadEntry, StatusPayload, TeamEntry,
};
use crate::{
    cli::types::{LeagueId, Season, TeamId},
    error::{Result, SyncError},
};

/// Default base URL for the remote API.
pub const DEFAULT_API_URL: &str = "https://v3.football.api-sports.io";

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-apisports-key";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The remote endpoints the sync jobs consume.
///
/// `Ok(None)` / `Ok(vec![])` means the upstream has nothing for this
/// entity, which callers treat as a terminal "no data" state rather than
/// an error.
#[allow(async_fn_in_trait)]
pub trait SportsApi {
    /// Daily usage snapshot. Does not count against the quota.
    async fn status(&self) -> Result<ApiStatus>;

    async fn league(&self, league: LeagueId, season: Season) -> Result<Option<LeagueEntry>>;

    async fn teams(&self, league: LeagueId, season: Season) -> Result<Vec<TeamEntry>>;

    async fn squad(&self, team: TeamId) -> Result<Option<SquadEntry>>;

    async fn coach(&self, team: TeamId) -> Result<Option<CoachEntry>>;

    async fn last_fixture(&self, team: TeamId) -> Result<Option<FixtureRef>>;

    async fn lineup_colors(&self, fixture: u64, team: TeamId) -> Result<Option<KitColors>>;
}

/// reqwest-backed client for the remote API.
#[derive(Debug, Clone)]
pub struct ApiFootballClient {
    client: Client,
    base_url: String,
}

impl ApiFootballClient {
    pub fn new(base_url: impl Into<String>, api_key: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut key = HeaderValue::from_str(api_key)?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);

        let client = Client::builder()
            .user_agent(concat!("football-sync/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        tracing::debug!(%url, ?params, "GET");

        let res = self.client.get(&url).query(params).send().await?;
        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let message = res.text().await.unwrap_or_default();
            return Err(SyncError::QuotaExhausted {
                message: truncate(&message, 200),
            });
        }
        if !status.is_success() {
            let message = res.text().await.unwrap_or_default();
            return Err(SyncError::Api {
                status: status.as_u16(),
                message: truncate(&message, 200),
            });
        }

        let envelope = res.json::<Envelope<T>>().await?;
        if let Some(message) = envelope.error_message() {
            if envelope.quota_exceeded() {
                return Err(SyncError::QuotaExhausted { message });
            }
            return Err(SyncError::Api {
                status: StatusCode::OK.as_u16(),
                message,
            });
        }
        Ok(envelope.response)
    }
}

impl SportsApi for ApiFootballClient {
    async fn status(&self) -> Result<ApiStatus> {
        match self.get::<StatusPayload>("status", &[]).await {
            Ok(StatusPayload::Account(s)) => Ok(ApiStatus {
                used: s.requests.current,
                limit: s.requests.limit_day,
            }),
            Ok(StatusPayload::Empty(_)) => Err(SyncError::QuotaUnavailable {
                reason: "status endpoint returned no subscription".to_string(),
            }),
            Err(e) => Err(SyncError::QuotaUnavailable {
                reason: e.to_string(),
            }),
        }
    }

    async fn league(&self, league: LeagueId, season: Season) -> Result<Option<LeagueEntry>> {
        let params = [("id", league.to_string()), ("season", season.to_string())];
        let entries: Vec<LeagueEntry> = self.get("leagues", &params).await?;
        Ok(entries.into_iter().next())
    }

    async fn teams(&self, league: LeagueId, season: Season) -> Result<Vec<TeamEntry>> {
        let params = [("league", league.to_string()), ("season", season.to_string())];
        self.get("teams", &params).await
    }

    async fn squad(&self, team: TeamId) -> Result<Option<SquadEntry>> {
        let entries: Vec<SquadEntry> = self
            .get("players/squads", &[("team", team.to_string())])
            .await?;
        Ok(entries.into_iter().find(|e| e.team.id == team))
    }

    async fn coach(&self, team: TeamId) -> Result<Option<CoachEntry>> {
        let coaches: Vec<CoachEntry> = self.get("coachs", &[("team", team.to_string())]).await?;
        // Former coaches are listed too; prefer the one with an open spell.
        let current = coaches.iter().position(|c| c.is_current_for(team));
        Ok(match current {
            Some(idx) => coaches.into_iter().nth(idx),
            None => coaches.into_iter().next(),
        })
    }

    async fn last_fixture(&self, team: TeamId) -> Result<Option<FixtureRef>> {
        let params = [("team", team.to_string()), ("last", "1".to_string())];
        let fixtures: Vec<FixtureEntry> = self.get("fixtures", &params).await?;
        Ok(fixtures.into_iter().next().map(|f| f.fixture))
    }

    async fn lineup_colors(&self, fixture: u64, team: TeamId) -> Result<Option<KitColors>> {
        let params = [("fixture", fixture.to_string()), ("team", team.to_string())];
        let lineups: Vec<LineupEntry> = self.get("fixtures/lineups", &params).await?;
        Ok(lineups
            .into_iter()
            .find(|l| l.team.id == team)
            .and_then(|l| l.team.colors)
            .and_then(|c| c.player))
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests;
