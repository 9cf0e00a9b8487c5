//! Single-instance guard per job.
//!
//! `<dir>/<job>.lock` holds the owner's pid and an expiry. A second
//! invocation of the same job is refused while an unexpired lock exists;
//! an expired lock (crashed owner) is taken over.
//!
//! A lock file that cannot be parsed may belong to an owner that has created
//! it but not written it yet, so it counts as held until its mtime is older
//! than the TTL.

use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    cli::types::JobKind,
    error::{Result, SyncError},
};

/// How long a lock stays valid without being released.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(6 * 60 * 60);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LockInfo {
    pid: u32,
    acquired_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// What an existing lock file says about its owner.
#[derive(Debug)]
enum Existing {
    Held { since: DateTime<Utc> },
    Expired { previous_pid: Option<u32>, raw: Vec<u8> },
    Gone,
}

fn inspect(path: &Path, ttl: Duration) -> Result<Existing> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Existing::Gone),
        Err(e) => return Err(e.into()),
    };
    if let Ok(info) = serde_json::from_slice::<LockInfo>(&raw) {
        return Ok(if info.expires_at > Utc::now() {
            Existing::Held {
                since: info.acquired_at,
            }
        } else {
            Existing::Expired {
                previous_pid: Some(info.pid),
                raw,
            }
        });
    }

    // Unreadable body: fall back to the file's age.
    let modified = match fs::metadata(path).and_then(|m| m.modified()) {
        Ok(t) => t,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Existing::Gone),
        Err(e) => return Err(e.into()),
    };
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO);
    Ok(if age < ttl {
        Existing::Held {
            since: DateTime::<Utc>::from(modified),
        }
    } else {
        Existing::Expired {
            previous_pid: None,
            raw,
        }
    })
}

/// Held for the duration of one job run; removes the lock file on drop.
#[derive(Debug)]
pub struct JobLock {
    path: PathBuf,
}

impl JobLock {
    pub fn path_for(dir: &Path, job: JobKind) -> PathBuf {
        dir.join(format!("{}.lock", job.as_str()))
    }

    pub fn acquire(dir: &Path, job: JobKind, ttl: Duration) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = Self::path_for(dir, job);
        let now = Utc::now();
        let info = LockInfo {
            pid: std::process::id(),
            acquired_at: now,
            expires_at: now + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::hours(6)),
        };
        let body = serde_json::to_vec_pretty(&info)?;

        // One takeover at most: if the file reappears after we removed a
        // stale one, another process won the race.
        let mut took_over = false;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut f) => {
                    f.write_all(&body)?;
                    f.sync_all()?;
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }

            match inspect(&path, ttl)? {
                Existing::Gone => {}
                Existing::Held { since } => {
                    return Err(SyncError::LockHeld {
                        job: job.to_string(),
                        since: since.to_rfc3339(),
                    })
                }
                Existing::Expired { .. } if took_over => {
                    return Err(SyncError::LockHeld {
                        job: job.to_string(),
                        since: now.to_rfc3339(),
                    })
                }
                Existing::Expired { previous_pid, raw } => {
                    // Only remove the file we judged stale, not a fresh
                    // lock written in the meantime.
                    if fs::read(&path).ok().as_deref() == Some(raw.as_slice()) {
                        tracing::warn!(job = %job, ?previous_pid, "Taking over expired job lock");
                        match fs::remove_file(&path) {
                            Ok(()) => {}
                            Err(e) if e.kind() == ErrorKind::NotFound => {}
                            Err(e) => return Err(e.into()),
                        }
                    }
                    took_over = true;
                }
            }
        }
    }

    /// True if a live lock exists for `job`.
    pub fn is_held(dir: &Path, job: JobKind) -> bool {
        matches!(
            inspect(&Self::path_for(dir, job), DEFAULT_LOCK_TTL),
            Ok(Existing::Held { .. })
        )
    }
}

impl Drop for JobLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
