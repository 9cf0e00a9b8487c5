//! Season type for the remote API.

use crate::error::{Result, SyncError};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Month (1-based) at which a new European season starts.
const SEASON_ROLLOVER_MONTH: u32 = 7;

/// Type-safe wrapper for Season years.
///
/// The remote API identifies a season by its starting year, so the
/// 2024/25 season is `Season(2024)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Season(pub u16);

impl Season {
    pub fn new(year: u16) -> Self {
        Self(year)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// The season running on `date`.
    pub fn containing(date: NaiveDate) -> Self {
        let year = date.year() as u16;
        if date.month() >= SEASON_ROLLOVER_MONTH {
            Self(year)
        } else {
            Self(year.saturating_sub(1))
        }
    }

    pub fn current() -> Self {
        Self::containing(Utc::now().date_naive())
    }
}

impl Default for Season {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Season {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self(s.trim().parse()?))
    }
}
