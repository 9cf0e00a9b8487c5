//! Environment-driven settings.
//!
//! Credentials never come from the command line; everything else has a
//! default so a bare `football-sync status` works against a local mirror.

use std::path::PathBuf;

use crate::{
    api::{ApiFootballClient, DEFAULT_API_URL},
    cli::types::{LeagueId, Season},
    error::{Result, SyncError},
    storage::{RestStore, SqliteStore, StoreBackend},
};

pub const API_KEY_ENV_VAR: &str = "API_FOOTBALL_KEY";
pub const API_URL_ENV_VAR: &str = "API_FOOTBALL_URL";
pub const STORE_URL_ENV_VAR: &str = "STORE_URL";
pub const STORE_KEY_ENV_VAR: &str = "STORE_KEY";
pub const DATA_DIR_ENV_VAR: &str = "SYNC_DATA_DIR";
pub const LEAGUES_ENV_VAR: &str = "SYNC_LEAGUES";
pub const SEASON_ENV_VAR: &str = "SYNC_SEASON";

/// Top five domestic leagues, then the Champions League and the Euros.
pub const DEFAULT_LEAGUES: [u32; 7] = [39, 140, 135, 78, 61, 1, 4];

const SQLITE_PREFIX: &str = "sqlite:";

/// Where entity rows live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Sqlite(PathBuf),
    Rest(String),
}

impl StoreLocation {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if let Some(path) = raw.strip_prefix(SQLITE_PREFIX) {
            return Ok(StoreLocation::Sqlite(PathBuf::from(path)));
        }
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Ok(StoreLocation::Rest(raw.to_string()));
        }
        Err(SyncError::Store {
            message: format!(
                "{STORE_URL_ENV_VAR} must be sqlite:<path> or an http(s) URL, got {raw:?}"
            ),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    api_key: Option<String>,
    pub api_url: String,
    pub store: StoreLocation,
    store_key: Option<String>,
    pub data_dir: PathBuf,
    pub leagues: Vec<LeagueId>,
    pub season: Season,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable source. Blank values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = get(DATA_DIR_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);
        let store = match get(STORE_URL_ENV_VAR) {
            Some(raw) => StoreLocation::parse(&raw)?,
            None => StoreLocation::Sqlite(data_dir.join("store.db")),
        };
        let leagues = match get(LEAGUES_ENV_VAR) {
            Some(raw) => parse_leagues(&raw)?,
            None => DEFAULT_LEAGUES.iter().map(|&id| LeagueId::new(id)).collect(),
        };
        let season = match get(SEASON_ENV_VAR) {
            Some(raw) => raw.parse()?,
            None => Season::current(),
        };

        Ok(Self {
            api_key: get(API_KEY_ENV_VAR),
            api_url: get(API_URL_ENV_VAR).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            store,
            store_key: get(STORE_KEY_ENV_VAR),
            data_dir,
            leagues,
            season,
        })
    }

    pub fn api_client(&self) -> Result<ApiFootballClient> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SyncError::MissingCredential {
                env_var: API_KEY_ENV_VAR.to_string(),
            })?;
        ApiFootballClient::new(self.api_url.clone(), key)
    }

    pub fn open_store(&self) -> Result<StoreBackend> {
        match &self.store {
            StoreLocation::Sqlite(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                Ok(StoreBackend::Sqlite(SqliteStore::open(path)?))
            }
            StoreLocation::Rest(url) => {
                let key = self
                    .store_key
                    .as_deref()
                    .ok_or_else(|| SyncError::MissingCredential {
                        env_var: STORE_KEY_ENV_VAR.to_string(),
                    })?;
                Ok(StoreBackend::Rest(RestStore::new(url.clone(), key)?))
            }
        }
    }

    pub fn checkpoint_dir(&self) -> PathBuf {
        self.data_dir.join("checkpoints")
    }

    pub fn lock_dir(&self) -> PathBuf {
        self.data_dir.join("locks")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.data_dir.join("backups")
    }
}

/// `~/.local/share/football-sync` on Linux.
pub fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        let mut home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.push(".local");
        home.push("share");
        home
    });
    base.join("football-sync")
}

/// Comma-separated league ids, order preserved.
pub fn parse_leagues(raw: &str) -> Result<Vec<LeagueId>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}
