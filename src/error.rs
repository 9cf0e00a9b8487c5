//! Error types for the football sync engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Failed to parse number: {0}")]
    InvalidNumber(#[from] std::num::ParseIntError),

    #[error("{env_var} environment variable not set")]
    MissingCredential { env_var: String },

    #[error("Quota status unavailable: {reason}")]
    QuotaUnavailable { reason: String },

    #[error("Remote quota exhausted: {message}")]
    QuotaExhausted { message: String },

    #[error("Remote API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Store unreachable: {message}")]
    StoreUnreachable { message: String },

    #[error("Unknown table: {name}")]
    UnknownTable { name: String },

    #[error("Unknown job: {name}")]
    UnknownJob { name: String },

    #[error("Job {job} is already running (lock held since {since})")]
    LockHeld { job: String, since: String },

    #[error("Invalid backup snapshot: {message}")]
    InvalidSnapshot { message: String },

    #[error("Watchdog error: {message}")]
    Watchdog { message: String },
}

impl SyncError {
    /// Setup-time failures that abort a run before any checkpoint mutation.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::MissingCredential { .. }
                | SyncError::QuotaUnavailable { .. }
                | SyncError::StoreUnreachable { .. }
                | SyncError::UnknownJob { .. }
        )
    }
}

#[cfg(test)]
mod tests;
